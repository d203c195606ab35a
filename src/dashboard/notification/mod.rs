//! 通知同步模块
//!
//! 分层：
//! - api：HTTP 请求
//! - service：本地缓存与未读数
//! - poller：未读数诊断轮询

pub mod api;
pub mod listener;
pub mod models;
pub mod poller;
pub mod service;

pub use api::NotificationApi;
pub use listener::{EmptyNotificationListener, NotificationListener};
pub use models::{Notification, NotificationDraft, NotificationSnapshot, NotificationType, UnreadDrift};
pub use poller::NotificationPoller;
pub use service::NotificationSyncer;
