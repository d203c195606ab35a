//! 通知本地模型定义

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 通知类型
///
/// 服务器新增的类型统一归到 `General`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    Booking,
    Payment,
    Issue,
    Penalty,
    Invoice,
    LateArrival,
    ChargingComplete,
    OverstayWarning,
    ReportSuccess,
    BookingConfirmed,
    #[serde(other)]
    General,
}

/// 通知
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    /// 服务器分配的 ID，不可变且唯一
    pub id: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(rename = "type")]
    pub kind: NotificationType,
    #[serde(deserialize_with = "crate::dashboard::serialization::deserialize_timestamp")]
    pub sent_time: DateTime<Utc>,
    #[serde(default)]
    pub is_read: bool,
}

/// 新建通知的草稿（系统内部生成，如预约成功、支付成功）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationDraft {
    pub title: String,
    pub content: String,
    #[serde(rename = "type")]
    pub kind: NotificationType,
}

impl NotificationDraft {
    pub fn new(kind: NotificationType, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            kind,
        }
    }
}

/// 提供给 UI 的只读快照
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NotificationSnapshot {
    pub notifications: Vec<Notification>,
    pub unread_count: usize,
    pub loading: bool,
    pub error: Option<String>,
}

/// 本地未读数与服务器未读数的对比结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnreadDrift {
    pub local: usize,
    pub remote: i64,
}

impl UnreadDrift {
    pub fn is_consistent(&self) -> bool {
        i64::try_from(self.local).map_or(false, |local| local == self.remote)
    }
}
