//! 传输层模块
//!
//! 唯一的出站 HTTP 通道：附加凭证、检测会话过期、single-flight 续期并重发

pub mod client;
pub mod renewal;
pub mod request;

pub use client::CredentialedTransport;
pub use request::ApiRequest;
