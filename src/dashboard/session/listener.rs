//! 会话监听器回调接口

use async_trait::async_trait;

/// 会话监听器回调接口
///
/// UI 层实现此接口以响应会话失效（跳转回登录页）
#[async_trait]
pub trait SessionListener: Send + Sync {
    /// 会话已被清理，应回到未登录入口
    async fn on_session_expired(&self, reason: String);

    /// 凭证续期成功
    async fn on_tokens_renewed(&self);
}

/// 空实现（默认监听器）
pub struct EmptySessionListener;

#[async_trait]
impl SessionListener for EmptySessionListener {
    async fn on_session_expired(&self, _reason: String) {}
    async fn on_tokens_renewed(&self) {}
}
