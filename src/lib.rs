pub mod dashboard;

// 重新导出常用类型和函数，方便外部使用
pub use dashboard::{
    client::{ClientConfig, DashboardClient, NOTIFICATION_POLL_INTERVAL},
    error::{SyncError, TransportError},
    login_async,
    notification::{Notification, NotificationDraft, NotificationSnapshot, NotificationSyncer},
    session::{Session, SessionStatus, UserProfile},
    transport::{ApiRequest, CredentialedTransport},
};
