//! 测试辅助：日志初始化、预置会话、记录型监听器

use crate::dashboard::notification::listener::NotificationListener;
use crate::dashboard::notification::models::Notification;
use crate::dashboard::notification::{NotificationApi, NotificationSyncer};
use crate::dashboard::session::models::keys;
use crate::dashboard::session::{Session, SessionDao, SessionListener, UserProfile};
use crate::dashboard::transport::CredentialedTransport;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

static INIT: Once = Once::new();

/// 初始化测试日志（只执行一次）
pub fn init_test_logger() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "evcharge_dashboard_core=debug".into()),
            )
            .with_test_writer()
            .try_init();
    });
}

pub fn sample_profile() -> UserProfile {
    UserProfile {
        id: "42".to_string(),
        name: "Lan".to_string(),
        email: "lan@example.com".to_string(),
        role: "driver".to_string(),
    }
}

/// 服务器格式的通知 JSON
pub fn notification_json(id: i64, kind: &str, is_read: bool) -> Value {
    json!({
        "id": id,
        "title": format!("通知 {}", id),
        "content": "测试内容",
        "type": kind,
        "sentTime": format!("2024-05-01T10:{:02}:00Z", id % 60),
        "isRead": is_read
    })
}

/// 记录回调的会话监听器
#[derive(Default)]
pub struct RecordingSessionListener {
    expired: Mutex<Vec<String>>,
    renewed: Mutex<usize>,
}

impl RecordingSessionListener {
    pub fn expired_reasons(&self) -> Vec<String> {
        self.expired.lock().unwrap().clone()
    }

    pub fn renewed_count(&self) -> usize {
        *self.renewed.lock().unwrap()
    }
}

#[async_trait]
impl SessionListener for RecordingSessionListener {
    async fn on_session_expired(&self, reason: String) {
        self.expired.lock().unwrap().push(reason);
    }

    async fn on_tokens_renewed(&self) {
        *self.renewed.lock().unwrap() += 1;
    }
}

/// 记录回调的通知监听器
#[derive(Default)]
pub struct RecordingNotificationListener {
    notices: Mutex<Vec<String>>,
    unread_counts: Mutex<Vec<usize>>,
    sync_failures: Mutex<usize>,
}

impl RecordingNotificationListener {
    pub fn notices(&self) -> Vec<String> {
        self.notices.lock().unwrap().clone()
    }

    pub fn unread_counts(&self) -> Vec<usize> {
        self.unread_counts.lock().unwrap().clone()
    }

    pub fn sync_failures(&self) -> usize {
        *self.sync_failures.lock().unwrap()
    }
}

#[async_trait]
impl NotificationListener for RecordingNotificationListener {
    async fn on_sync_start(&self) {}

    async fn on_sync_finish(&self) {}

    async fn on_sync_failed(&self, _error: String) {
        *self.sync_failures.lock().unwrap() += 1;
    }

    async fn on_notification_list_changed(&self, _notifications: Vec<Notification>) {}

    async fn on_unread_count_changed(&self, unread_count: usize) {
        self.unread_counts.lock().unwrap().push(unread_count);
    }

    async fn on_notice(&self, message: String) {
        self.notices.lock().unwrap().push(message);
    }
}

/// 内存库中预置凭证后加载的会话
pub async fn authenticated_session(
    access_token: &str,
    refresh_token: Option<&str>,
) -> (Arc<Session>, Arc<RecordingSessionListener>) {
    let dao = SessionDao::in_memory().await.unwrap();
    let mut entries = vec![(keys::ACCESS_TOKEN, access_token)];
    if let Some(refresh_token) = refresh_token {
        entries.push((keys::REFRESH_TOKEN, refresh_token));
    }
    dao.save_entries(&entries).await.unwrap();

    let listener = Arc::new(RecordingSessionListener::default());
    let session = Session::load_with_listener(dao, listener.clone())
        .await
        .unwrap();
    (Arc::new(session), listener)
}

pub fn test_transport(base_url: &str, session: Arc<Session>) -> CredentialedTransport {
    let http = reqwest::Client::builder()
        .no_proxy()
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap();
    CredentialedTransport::with_client(http, base_url, session, Duration::from_secs(5))
}

pub fn test_syncer(
    base_url: &str,
    session: Arc<Session>,
) -> (NotificationSyncer, Arc<RecordingNotificationListener>) {
    let transport = Arc::new(test_transport(base_url, session.clone()));
    let listener = Arc::new(RecordingNotificationListener::default());
    let syncer = NotificationSyncer::with_listener(
        NotificationApi::new(transport),
        session,
        listener.clone(),
    );
    (syncer, listener)
}
