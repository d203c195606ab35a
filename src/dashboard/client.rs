//! 仪表盘客户端核心实现模块
//!
//! 持有会话、传输层和通知同步器，负责登录、登出和轮询的生命周期。

use crate::dashboard::auth::login_async;
use crate::dashboard::notification::{
    EmptyNotificationListener, NotificationApi, NotificationListener, NotificationPoller,
    NotificationSyncer,
};
use crate::dashboard::session::{
    EmptySessionListener, Session, SessionDao, SessionListener, UserProfile,
};
use crate::dashboard::transport::CredentialedTransport;
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// 未读数诊断轮询的默认周期
pub const NOTIFICATION_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// 客户端配置
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// HTTP API 基础地址
    pub api_base_url: String,
    /// 会话持久化使用的本地 SQLite 数据库 URL
    ///
    /// 例如：`sqlite://evcharge_session.db?mode=rwc`
    pub session_db_url: String,
    /// 未读数轮询周期
    pub poll_interval: Duration,
    /// 单个请求的超时
    pub request_timeout: Duration,
    /// 续期请求的超时
    pub renewal_timeout: Duration,
}

impl ClientConfig {
    /// 创建默认配置
    pub fn new(api_base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: api_base_url.into(),
            session_db_url: "sqlite://evcharge_session.db?mode=rwc".to_string(),
            poll_interval: NOTIFICATION_POLL_INTERVAL,
            request_timeout: Duration::from_secs(15),
            renewal_timeout: Duration::from_secs(10),
        }
    }

    pub fn with_session_db_url(mut self, session_db_url: impl Into<String>) -> Self {
        self.session_db_url = session_db_url.into();
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    pub fn with_renewal_timeout(mut self, renewal_timeout: Duration) -> Self {
        self.renewal_timeout = renewal_timeout;
        self
    }
}

/// 仪表盘客户端
pub struct DashboardClient {
    config: ClientConfig,
    session: Arc<Session>,
    transport: Arc<CredentialedTransport>,
    syncer: Arc<NotificationSyncer>,
    poller: Mutex<Option<NotificationPoller>>,
}

impl DashboardClient {
    /// 打开本地存储、恢复会话并组装传输层和通知同步器
    pub async fn new(
        config: ClientConfig,
        session_listener: Arc<dyn SessionListener>,
        notification_listener: Arc<dyn NotificationListener>,
    ) -> Result<Self> {
        info!("[Client] 🚀 初始化客户端，API 地址: {}", config.api_base_url);

        let dao = SessionDao::connect(&config.session_db_url)
            .await
            .context("打开会话存储失败")?;
        let session = Arc::new(
            Session::load_with_listener(dao, session_listener)
                .await
                .context("恢复会话失败")?,
        );
        let transport = Arc::new(
            CredentialedTransport::new(&config, session.clone()).context("创建传输层失败")?,
        );

        Ok(Self::from_parts(config, transport, notification_listener))
    }

    /// 使用默认空监听器创建客户端
    pub async fn with_defaults(config: ClientConfig) -> Result<Self> {
        Self::new(
            config,
            Arc::new(EmptySessionListener),
            Arc::new(EmptyNotificationListener),
        )
        .await
    }

    /// 用已经组装好的传输层创建客户端
    pub fn from_parts(
        config: ClientConfig,
        transport: Arc<CredentialedTransport>,
        notification_listener: Arc<dyn NotificationListener>,
    ) -> Self {
        let session = transport.session().clone();
        let syncer = Arc::new(NotificationSyncer::with_listener(
            NotificationApi::new(transport.clone()),
            session.clone(),
            notification_listener,
        ));
        Self {
            config,
            session,
            transport,
            syncer,
            poller: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn transport(&self) -> &Arc<CredentialedTransport> {
        &self.transport
    }

    pub fn notifications(&self) -> &Arc<NotificationSyncer> {
        &self.syncer
    }

    /// 登录：建立会话、启动轮询并做首次刷新
    ///
    /// 首次刷新失败只记录日志，登录本身仍然成功
    pub async fn login(&self, email: &str, password: &str) -> Result<UserProfile> {
        let login = login_async(&self.transport, email, password)
            .await
            .context("登录失败")?;

        self.session
            .establish(login.credentials(), login.user.clone())
            .await
            .context("保存会话失败")?;

        self.start_polling().await;
        if let Err(e) = self.syncer.refresh().await {
            warn!("[Client] ⚠️ 登录后首次刷新通知失败: {}", e);
        }
        Ok(login.user)
    }

    /// 恢复本地已有的会话，返回是否处于登录状态
    pub async fn resume(&self) -> bool {
        if !self.session.status().is_authenticated() {
            info!("[Client] 本地没有可用会话");
            return false;
        }

        info!("[Client] 🔁 恢复本地会话");
        self.start_polling().await;
        if let Err(e) = self.syncer.refresh().await {
            warn!("[Client] ⚠️ 恢复会话后刷新通知失败: {}", e);
        }
        self.session.status().is_authenticated()
    }

    /// 登出：停止轮询并清理会话
    pub async fn logout(&self) {
        self.stop_polling().await;
        self.session.teardown("用户登出").await;
        self.syncer.reset().await;
        info!("[Client] 👋 已登出");
    }

    /// 启动未读数轮询（已在运行时不重复启动）
    pub async fn start_polling(&self) {
        let mut slot = self.poller.lock().await;
        if slot.as_ref().is_some_and(|p| !p.is_finished()) {
            return;
        }
        *slot = Some(NotificationPoller::spawn(
            self.syncer.clone(),
            self.config.poll_interval,
        ));
    }

    pub async fn stop_polling(&self) {
        if let Some(poller) = self.poller.lock().await.take() {
            poller.stop().await;
        }
    }

    pub async fn is_polling(&self) -> bool {
        self.poller
            .lock()
            .await
            .as_ref()
            .is_some_and(|p| !p.is_finished())
    }
}
