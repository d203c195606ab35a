//! 通知监听器回调接口

use crate::dashboard::notification::models::Notification;
use async_trait::async_trait;

/// 通知监听器回调接口
#[async_trait]
pub trait NotificationListener: Send + Sync {
    /// 开始从服务器拉取
    async fn on_sync_start(&self);

    /// 拉取完成
    async fn on_sync_finish(&self);

    /// 拉取失败
    async fn on_sync_failed(&self, error: String);

    /// 通知列表变更（刷新、已读、新建、清空）
    async fn on_notification_list_changed(&self, notifications: Vec<Notification>);

    /// 未读数变更
    async fn on_unread_count_changed(&self, unread_count: usize);

    /// 需要展示给用户的临时提示（远程操作失败等非致命错误）
    async fn on_notice(&self, message: String);
}

/// 空实现（默认监听器）
pub struct EmptyNotificationListener;

#[async_trait]
impl NotificationListener for EmptyNotificationListener {
    async fn on_sync_start(&self) {}
    async fn on_sync_finish(&self) {}
    async fn on_sync_failed(&self, _error: String) {}
    async fn on_notification_list_changed(&self, _notifications: Vec<Notification>) {}
    async fn on_unread_count_changed(&self, _unread_count: usize) {}
    async fn on_notice(&self, _message: String) {}
}
