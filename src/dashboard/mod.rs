//! 充电桩仪表盘客户端核心
//!
//! - session：凭证对与用户资料的持久化
//! - transport：带凭证的 HTTP 通道（401 续期、重发一次）
//! - notification：通知缓存、未读数与诊断轮询

pub mod auth;
pub mod client;
pub mod error;
pub mod notification;
pub mod serialization;
pub mod session;
pub mod transport;
pub mod types;

#[cfg(test)]
pub(crate) mod test_utils;

// 重新导出认证相关函数
pub use auth::login_async;
