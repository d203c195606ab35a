//! 通知 HTTP API 客户端
//!
//! 负责所有通知相关的 HTTP 请求，凭证和续期由传输层处理

use crate::dashboard::error::TransportError;
use crate::dashboard::notification::models::{Notification, NotificationDraft};
use crate::dashboard::transport::{ApiRequest, CredentialedTransport};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info};

/// 未读数接口的返回：部分后端版本直接返回整数，部分包一层对象
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum UnreadCountResp {
    Bare(i64),
    Wrapped { count: i64 },
}

impl UnreadCountResp {
    fn value(&self) -> i64 {
        match self {
            UnreadCountResp::Bare(n) | UnreadCountResp::Wrapped { count: n } => *n,
        }
    }
}

/// 通知相关的 HTTP API 客户端
#[derive(Clone)]
pub struct NotificationApi {
    transport: Arc<CredentialedTransport>,
}

impl NotificationApi {
    pub fn new(transport: Arc<CredentialedTransport>) -> Self {
        Self { transport }
    }

    /// 获取全部通知
    pub async fn get_notifications(&self) -> Result<Vec<Notification>, TransportError> {
        info!("[NotifyAPI] 📡 请求通知列表");
        let list: Vec<Notification> = self
            .transport
            .send_json(ApiRequest::get("/notifications"), "通知列表")
            .await?;

        info!("[NotifyAPI] ✅ 通知列表响应，条数: {}", list.len());
        debug!(
            "[NotifyAPI]   通知ID: {:?}",
            list.iter().map(|n| n.id).collect::<Vec<_>>()
        );
        Ok(list)
    }

    /// 获取服务器端未读数（仅用于诊断对比）
    pub async fn get_unread_count(&self) -> Result<i64, TransportError> {
        let resp: UnreadCountResp = self
            .transport
            .send_json(ApiRequest::get("/notifications/unread-count"), "未读数")
            .await?;
        debug!("[NotifyAPI] 服务器未读数: {}", resp.value());
        Ok(resp.value())
    }

    /// 标记单条已读
    pub async fn mark_read(&self, id: i64) -> Result<(), TransportError> {
        info!("[NotifyAPI] 📡 标记已读: id={}", id);
        self.transport
            .send_empty(
                ApiRequest::put(format!("/notifications/{}/read", id)),
                "标记已读",
            )
            .await
    }

    /// 全部标记已读
    pub async fn mark_all_read(&self) -> Result<(), TransportError> {
        info!("[NotifyAPI] 📡 全部标记已读");
        self.transport
            .send_empty(ApiRequest::put("/notifications/read-all"), "全部已读")
            .await
    }

    /// 新建通知，返回服务器分配 ID 后的实体
    pub async fn create(&self, draft: &NotificationDraft) -> Result<Notification, TransportError> {
        info!("[NotifyAPI] 📡 新建通知: type={:?}, title={}", draft.kind, draft.title);
        let created: Notification = self
            .transport
            .send_json(ApiRequest::post("/notifications").json(draft)?, "新建通知")
            .await?;
        info!("[NotifyAPI] ✅ 新建通知成功: id={}", created.id);
        Ok(created)
    }
}
