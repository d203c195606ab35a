//! 错误分类
//!
//! 传输层错误需要在多个等待同一次续期的请求之间共享，因此全部携带 `String`
//! 载荷并实现 `Clone`。

use thiserror::Error;

/// 传输层错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// 网络层失败（连接被拒、DNS、TLS 等）
    #[error("网络请求失败: {0}")]
    Network(String),

    /// 单次请求超时
    #[error("请求超时: {0}")]
    Timeout(String),

    /// 服务器返回非 2xx（401 除外，401 走续期流程）
    #[error("HTTP 错误 {status}: {body}")]
    Status { status: u16, body: String },

    /// 续期后重试的请求仍然返回 401
    #[error("凭证无效：续期后重试仍返回 401")]
    Unauthorized,

    /// 收到 401 但本地没有 refresh token，会话已被清理
    #[error("会话已失效：本地没有 refresh token")]
    NoRefreshToken,

    /// 续期请求失败（网络错误、超时或 refresh token 被拒），会话已被清理
    #[error("凭证续期失败: {0}")]
    RenewalFailed(String),

    /// 响应体无法解析
    #[error("解析响应失败: {0}")]
    Decode(String),

    /// 本地会话存储读写失败
    #[error("本地存储错误: {0}")]
    Store(String),

    /// 请求本身不合法（例如无法构造的 header）
    #[error("无效请求: {0}")]
    InvalidRequest(String),
}

impl TransportError {
    /// 该错误是否意味着会话已经被清理（调用方应回到未登录状态）
    pub fn is_session_fatal(&self) -> bool {
        matches!(
            self,
            TransportError::NoRefreshToken | TransportError::RenewalFailed(_)
        )
    }

    pub(crate) fn from_reqwest(err: reqwest::Error, operation_name: &str) -> Self {
        if err.is_timeout() {
            TransportError::Timeout(format!("{}: {}", operation_name, err))
        } else {
            TransportError::Network(format!("{}: {}", operation_name, err))
        }
    }
}

/// 通知同步器错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    /// 远程调用失败（已记录日志并通过 `on_notice` 提示用户）
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// 对缓存中不存在的通知执行操作，属于调用方编程错误
    #[error("通知不存在: id={0}")]
    UnknownNotification(i64),
}
