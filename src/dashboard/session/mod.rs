//! 会话模块
//!
//! 持有凭证对和登录用户资料，由客户端协调者独占并注入传输层和通知同步器

pub mod dao;
pub mod listener;
pub mod models;
pub mod service;

// 重新导出主要类型
pub use dao::SessionDao;
pub use listener::{EmptySessionListener, SessionListener};
pub use models::{CredentialPair, SessionStatus, UserProfile};
pub use service::Session;
