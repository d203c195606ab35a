//! 登录与续期接口
//!
//! 两个接口都不携带 access token：登录时还没有，续期时它已经失效。

use crate::dashboard::error::TransportError;
use crate::dashboard::session::{CredentialPair, UserProfile};
use crate::dashboard::transport::{ApiRequest, CredentialedTransport};
use crate::dashboard::types::handle_json_response;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

pub const LOGIN_PATH: &str = "/auth/login";
pub const REFRESH_PATH: &str = "/auth/refresh";

#[derive(Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &"***")
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user: UserProfile,
}

impl LoginResponse {
    pub fn credentials(&self) -> CredentialPair {
        CredentialPair::new(&self.access_token, &self.refresh_token)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest<'a> {
    pub refresh_token: &'a str,
}

/// 续期响应：refresh token 可能不轮换
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// 调用续期接口（由传输层的续期任务使用，不经过 401 处理流程）
pub async fn request_renewal(
    http: &reqwest::Client,
    base_url: &str,
    refresh_token: &str,
) -> Result<RefreshResponse, TransportError> {
    let operation_id = Uuid::new_v4().to_string();
    let url = format!("{}{}", base_url, REFRESH_PATH);

    info!("[Auth] 📡 请求续期 access token");
    debug!("[Auth]   请求URL: {}, 操作ID: {}", url, operation_id);

    let response = http
        .post(&url)
        .header("operationID", &operation_id)
        .json(&RefreshRequest { refresh_token })
        .send()
        .await
        .map_err(|e| TransportError::from_reqwest(e, "续期"))?;

    handle_json_response::<RefreshResponse>(response, "续期").await
}

/// 账号密码登录
///
/// 登录失败的 401 表示账号或密码错误，不会触发续期或会话清理
pub async fn login_async(
    transport: &CredentialedTransport,
    email: &str,
    password: &str,
) -> Result<LoginResponse, TransportError> {
    info!("[Auth] 🔐 正在登录: {}", email);

    let request = ApiRequest::post(LOGIN_PATH)
        .json(&LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        })?;
    let response = transport.send_anonymous(request).await?;
    let login = handle_json_response::<LoginResponse>(response, "登录").await?;

    info!(
        "[Auth] ✅ 登录成功，用户ID: {}, 角色: {}",
        login.user.id, login.user.role
    );
    Ok(login)
}
