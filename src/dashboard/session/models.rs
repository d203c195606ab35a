//! 会话本地模型定义

use serde::{Deserialize, Serialize};

/// 持久化存储中的固定 key
pub mod keys {
    pub const ACCESS_TOKEN: &str = "accessToken";
    pub const REFRESH_TOKEN: &str = "refreshToken";
    pub const USER_ID: &str = "userId";
    pub const USER_NAME: &str = "userName";
    pub const USER_EMAIL: &str = "userEmail";
    pub const USER_ROLE: &str = "userRole";

    /// 会话清理时需要一并删除的全部 key
    pub const ALL: [&str; 6] = [
        ACCESS_TOKEN,
        REFRESH_TOKEN,
        USER_ID,
        USER_NAME,
        USER_EMAIL,
        USER_ROLE,
    ];
}

/// 凭证对
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl CredentialPair {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
        }
    }
}

// token 不进日志
impl std::fmt::Debug for CredentialPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialPair")
            .field("access_token", &"***")
            .field("refresh_token", &"***")
            .finish()
    }
}

/// 登录用户的基础资料
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// 用户 ID（服务器可能返回数字）
    #[serde(deserialize_with = "crate::dashboard::serialization::deserialize_string_or_number")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    /// 角色：customer / staff / admin
    #[serde(default)]
    pub role: String,
}

/// 会话状态
///
/// `Authenticated → Renewing → {Authenticated, Unauthenticated}`，
/// `Unauthenticated` 只能通过重新登录离开
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Unauthenticated,
    Authenticated,
    Renewing,
}

impl SessionStatus {
    pub fn is_authenticated(&self) -> bool {
        !matches!(self, SessionStatus::Unauthenticated)
    }
}
