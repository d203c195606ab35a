use crate::dashboard::error::TransportError;
use tracing::{debug, error};

/// 读取响应 body 并检查 HTTP 状态
///
/// 非 2xx 返回 `TransportError::Status`，body 原样带回便于排查
async fn read_checked_body(
    response: reqwest::Response,
    operation_name: &str,
) -> Result<Vec<u8>, TransportError> {
    let status = response.status();

    // 读取 body bytes（只能读取一次）
    let body_bytes = response
        .bytes()
        .await
        .map_err(|e| TransportError::from_reqwest(e, operation_name))?;
    let body_str = String::from_utf8_lossy(&body_bytes);
    debug!("[HTTP] {}响应 Body: {}", operation_name, body_str);

    if !status.is_success() {
        error!(
            "[HTTP] {}请求失败，HTTP状态: {}, 响应: {}",
            operation_name, status, body_str
        );
        return Err(TransportError::Status {
            status: status.as_u16(),
            body: body_str.into_owned(),
        });
    }
    debug!("[HTTP] {}请求成功，HTTP状态: {}", operation_name, status);

    Ok(body_bytes.to_vec())
}

/// 通用 JSON 响应处理：检查状态码后直接反序列化为业务结构体
///
/// 所有返回 JSON 的 API 都共用此方法
pub async fn handle_json_response<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
    operation_name: &str,
) -> Result<T, TransportError> {
    let body = read_checked_body(response, operation_name).await?;

    serde_json::from_slice(&body).map_err(|e| {
        error!(
            "[HTTP] {}反序列化失败: {:?}\n原始响应: {}",
            operation_name,
            e,
            String::from_utf8_lossy(&body)
        );
        TransportError::Decode(format!("{}: {}", operation_name, e))
    })
}

/// 不关心响应体的请求（例如标记已读），只检查状态码
pub async fn handle_empty_response(
    response: reqwest::Response,
    operation_name: &str,
) -> Result<(), TransportError> {
    read_checked_body(response, operation_name).await.map(|_| ())
}
