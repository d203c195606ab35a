//! 凭证续期（single-flight）
//!
//! 同一时刻最多只有一次续期请求在途。并发收到 401 的请求等待同一个共享 future，
//! 拿到结果后各自用新 token 重发。续期在独立的 tokio 任务里执行，
//! 即使所有等待方都被取消也会跑完，不会留下半截状态。
//! 续期绑定发起时的会话代数，登出后重新登录的会话不会被旧续期覆盖或清理。

use crate::dashboard::auth::request_renewal;
use crate::dashboard::error::TransportError;
use crate::dashboard::session::Session;
use futures_util::future::{BoxFuture, FutureExt, Shared};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

type RenewalFuture = Shared<BoxFuture<'static, Result<String, TransportError>>>;

/// 401 之后的处理结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Recovery {
    /// 本次请求触发或加入了一次续期，已拿到新 token
    Renewed,
    /// 请求发出时用的 token 已经被别的请求续期替换，直接重发
    AlreadyRenewed,
}

pub(crate) struct RenewalCoordinator {
    http: reqwest::Client,
    base_url: String,
    session: Arc<Session>,
    timeout: Duration,
    /// 在途续期及其所属的会话代数
    inflight: Mutex<Option<(u64, RenewalFuture)>>,
}

impl RenewalCoordinator {
    pub(crate) fn new(
        http: reqwest::Client,
        base_url: String,
        session: Arc<Session>,
        timeout: Duration,
    ) -> Self {
        Self {
            http,
            base_url,
            session,
            timeout,
            inflight: Mutex::new(None),
        }
    }

    /// 处理一次 401
    ///
    /// `sent_token` 是失败请求实际携带的 access token
    pub(crate) async fn recover(&self, sent_token: Option<&str>) -> Result<Recovery, TransportError> {
        let renewal = {
            let mut slot = self.inflight.lock().await;

            let generation = self.session.generation().await;
            let pending = slot
                .as_ref()
                .filter(|(owner, renewal)| *owner == generation && renewal.peek().is_none())
                .map(|(_, renewal)| renewal.clone());

            match pending {
                Some(pending) => {
                    debug!("[Transport/Renew] 续期进行中，等待同一次续期结果");
                    pending
                }
                None => {
                    let current = self.session.access_token().await;
                    if current.is_some() && current.as_deref() != sent_token {
                        debug!("[Transport/Renew] token 已被其他请求续期，直接重发");
                        return Ok(Recovery::AlreadyRenewed);
                    }

                    let Some((generation, refresh_token)) = self.session.refresh_grant().await
                    else {
                        warn!("[Transport/Renew] ❌ 收到 401 且没有 refresh token，清理会话");
                        self.session
                            .teardown("收到 401 且本地没有 refresh token")
                            .await;
                        return Err(TransportError::NoRefreshToken);
                    };

                    let renewal = self.start(generation, refresh_token);
                    *slot = Some((generation, renewal.clone()));
                    renewal
                }
            }
        };

        renewal.await.map(|_| Recovery::Renewed)
    }

    fn start(&self, generation: u64, refresh_token: String) -> RenewalFuture {
        info!("[Transport/Renew] 🔄 开始续期 access token（会话代数 {}）", generation);
        self.session.mark_renewing();

        let task = tokio::spawn(run_renewal(
            self.http.clone(),
            self.base_url.clone(),
            self.session.clone(),
            generation,
            refresh_token,
            self.timeout,
        ));

        async move {
            task.await.unwrap_or_else(|e| {
                Err(TransportError::RenewalFailed(format!(
                    "续期任务异常退出: {}",
                    e
                )))
            })
        }
        .boxed()
        .shared()
    }
}

async fn run_renewal(
    http: reqwest::Client,
    base_url: String,
    session: Arc<Session>,
    generation: u64,
    refresh_token: String,
    timeout: Duration,
) -> Result<String, TransportError> {
    let renewal = request_renewal(&http, &base_url, &refresh_token);
    let outcome = match tokio::time::timeout(timeout, renewal).await {
        Ok(Ok(resp)) => {
            let access_token = resp.access_token.clone();
            session
                .apply_renewal(generation, resp.access_token, resp.refresh_token)
                .await
                .map(|_| access_token)
                .map_err(|e| TransportError::RenewalFailed(format!("{:#}", e)))
        }
        Ok(Err(e)) => Err(TransportError::RenewalFailed(e.to_string())),
        Err(_) => Err(TransportError::RenewalFailed(format!(
            "续期请求超时（{:?}）",
            timeout
        ))),
    };

    match outcome {
        Ok(access_token) => {
            info!("[Transport/Renew] ✅ 续期成功");
            Ok(access_token)
        }
        Err(e) => {
            error!("[Transport/Renew] ❌ {}", e);
            session.teardown_generation(generation, &e.to_string()).await;
            Err(e)
        }
    }
}
