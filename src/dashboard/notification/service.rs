//! 通知同步服务层
//!
//! 本地缓存是唯一权威：未读数永远由缓存重新计算，服务器返回的未读数只用于诊断日志。
//!
//! 一致性约定：
//! - 已读/全部已读/新建只在远程确认成功后才修改本地缓存
//! - 刷新互斥执行；刷新在途期间确认的本地变更会被记录，
//!   在拉取结果替换缓存前重放，避免旧快照把已读标记“复活”
//! - `reset` 递增 epoch，在途刷新发现 epoch 变化后丢弃结果

use crate::dashboard::error::{SyncError, TransportError};
use crate::dashboard::notification::api::NotificationApi;
use crate::dashboard::notification::listener::{EmptyNotificationListener, NotificationListener};
use crate::dashboard::notification::models::{
    Notification, NotificationDraft, NotificationSnapshot, UnreadDrift,
};
use crate::dashboard::session::Session;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// 刷新在途期间确认的本地变更
#[derive(Debug, Clone)]
enum LocalMutation {
    Read(i64),
    /// 全部已读时缓存中的 ID，缓存外的条目以服务器返回的 `isRead` 为准
    ReadAll(HashSet<i64>),
    Created(Notification),
}

impl LocalMutation {
    fn apply(&self, notifications: &mut Vec<Notification>) {
        match self {
            LocalMutation::Read(id) => {
                if let Some(n) = notifications.iter_mut().find(|n| n.id == *id) {
                    n.is_read = true;
                }
            }
            LocalMutation::ReadAll(ids) => {
                for n in notifications.iter_mut().filter(|n| ids.contains(&n.id)) {
                    n.is_read = true;
                }
            }
            LocalMutation::Created(created) => {
                if !notifications.iter().any(|n| n.id == created.id) {
                    notifications.insert(0, created.clone());
                }
            }
        }
    }
}

#[derive(Default)]
struct SyncState {
    notifications: Vec<Notification>,
    unread_count: usize,
    loading: bool,
    error: Option<String>,
    epoch: u64,
    refresh_in_flight: bool,
    pending: Vec<LocalMutation>,
}

impl SyncState {
    fn recount(&mut self) {
        self.unread_count = self.notifications.iter().filter(|n| !n.is_read).count();
    }

    fn record(&mut self, mutation: LocalMutation) {
        if self.refresh_in_flight {
            self.pending.push(mutation);
        }
    }

    fn snapshot(&self) -> NotificationSnapshot {
        NotificationSnapshot {
            notifications: self.notifications.clone(),
            unread_count: self.unread_count,
            loading: self.loading,
            error: self.error.clone(),
        }
    }
}

/// 通知同步器
pub struct NotificationSyncer {
    /// 通知 API 客户端
    api: NotificationApi,
    session: Arc<Session>,
    state: Mutex<SyncState>,
    /// 保证同一时刻只有一个刷新在途
    refresh_gate: Mutex<()>,
    /// 通知监听器
    listener: Arc<dyn NotificationListener>,
}

impl NotificationSyncer {
    /// 创建新的通知同步器（使用默认空监听器）
    pub fn new(api: NotificationApi, session: Arc<Session>) -> Self {
        Self::with_listener(api, session, Arc::new(EmptyNotificationListener))
    }

    /// 创建新的通知同步器（带自定义监听器）
    pub fn with_listener(
        api: NotificationApi,
        session: Arc<Session>,
        listener: Arc<dyn NotificationListener>,
    ) -> Self {
        Self {
            api,
            session,
            state: Mutex::new(SyncState::default()),
            refresh_gate: Mutex::new(()),
            listener,
        }
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    // ========== 只读访问 ==========

    pub async fn snapshot(&self) -> NotificationSnapshot {
        self.state.lock().await.snapshot()
    }

    pub async fn notifications(&self) -> Vec<Notification> {
        self.state.lock().await.notifications.clone()
    }

    pub async fn unread_count(&self) -> usize {
        self.state.lock().await.unread_count
    }

    pub async fn is_loading(&self) -> bool {
        self.state.lock().await.loading
    }

    pub async fn last_error(&self) -> Option<String> {
        self.state.lock().await.error.clone()
    }

    // ========== 命令 ==========

    /// 从服务器全量刷新
    ///
    /// 未登录时清空缓存并直接返回成功
    pub async fn refresh(&self) -> Result<(), SyncError> {
        let _gate = self.refresh_gate.lock().await;

        if !self.session.has_access_token().await {
            debug!("[NotifySync] 未登录，清空通知缓存");
            self.reset().await;
            return Ok(());
        }

        let epoch = {
            let mut state = self.state.lock().await;
            state.loading = true;
            state.refresh_in_flight = true;
            state.pending.clear();
            state.epoch
        };
        info!("[NotifySync] 🔄 开始刷新通知");
        self.listener.on_sync_start().await;

        let fetched = self.api.get_notifications().await;

        let mut state = self.state.lock().await;
        state.loading = false;
        state.refresh_in_flight = false;
        let pending = std::mem::take(&mut state.pending);

        if state.epoch != epoch {
            info!("[NotifySync] 刷新期间缓存已被重置，丢弃本次结果");
            return Ok(());
        }

        match fetched {
            Ok(mut list) => {
                if !pending.is_empty() {
                    debug!(
                        "[NotifySync] 重放刷新期间的 {} 个本地变更",
                        pending.len()
                    );
                }
                for mutation in &pending {
                    mutation.apply(&mut list);
                }

                let previous_unread = state.unread_count;
                state.notifications = list;
                state.recount();
                state.error = None;
                let notifications = state.notifications.clone();
                let unread = state.unread_count;
                drop(state);

                info!(
                    "[NotifySync] ✅ 刷新完成，通知数: {}, 未读数: {}",
                    notifications.len(),
                    unread
                );
                self.listener.on_sync_finish().await;
                self.notify_changed(notifications, previous_unread, unread)
                    .await;

                // 服务器未读数只做对比，不覆盖本地值
                self.check_unread_drift().await;
                Ok(())
            }
            Err(e) => {
                drop(state);
                self.listener.on_sync_failed(e.to_string()).await;
                Err(self.handle_failure("刷新通知", e).await)
            }
        }
    }

    /// 标记单条通知已读
    pub async fn mark_read(&self, id: i64) -> Result<(), SyncError> {
        {
            let state = self.state.lock().await;
            if !state.notifications.iter().any(|n| n.id == id) {
                warn!("[NotifySync] ⚠️ 标记已读的通知不在缓存中: id={}", id);
                return Err(SyncError::UnknownNotification(id));
            }
        }

        if let Err(e) = self.api.mark_read(id).await {
            return Err(self.handle_failure("标记已读", e).await);
        }

        let mut state = self.state.lock().await;
        let previous_unread = state.unread_count;
        if let Some(n) = state.notifications.iter_mut().find(|n| n.id == id) {
            n.is_read = true;
        }
        state.record(LocalMutation::Read(id));
        state.recount();
        state.error = None;
        let notifications = state.notifications.clone();
        let unread = state.unread_count;
        drop(state);

        debug!("[NotifySync] 已读: id={}, 未读数: {}", id, unread);
        self.notify_changed(notifications, previous_unread, unread)
            .await;
        Ok(())
    }

    /// 全部标记已读
    pub async fn mark_all_read(&self) -> Result<(), SyncError> {
        if let Err(e) = self.api.mark_all_read().await {
            return Err(self.handle_failure("全部已读", e).await);
        }

        let mut state = self.state.lock().await;
        let previous_unread = state.unread_count;
        let ids = state.notifications.iter().map(|n| n.id).collect();
        for n in state.notifications.iter_mut() {
            n.is_read = true;
        }
        state.record(LocalMutation::ReadAll(ids));
        state.recount();
        state.error = None;
        let notifications = state.notifications.clone();
        let unread = state.unread_count;
        drop(state);

        info!("[NotifySync] ✅ 全部已读，共 {} 条", notifications.len());
        self.notify_changed(notifications, previous_unread, unread)
            .await;
        Ok(())
    }

    /// 新建通知（系统内部使用，如预约成功、支付成功）
    pub async fn create(&self, draft: NotificationDraft) -> Result<Notification, SyncError> {
        let created = match self.api.create(&draft).await {
            Ok(created) => created,
            Err(e) => return Err(self.handle_failure("新建通知", e).await),
        };

        let mut state = self.state.lock().await;
        let previous_unread = state.unread_count;
        let mutation = LocalMutation::Created(created.clone());
        mutation.apply(&mut state.notifications);
        state.record(mutation);
        state.recount();
        state.error = None;
        let notifications = state.notifications.clone();
        let unread = state.unread_count;
        drop(state);

        self.notify_changed(notifications, previous_unread, unread)
            .await;
        Ok(created)
    }

    /// 清空缓存（未登录、会话失效时）
    pub async fn reset(&self) {
        let mut state = self.state.lock().await;
        let had_content = !state.notifications.is_empty() || state.error.is_some();
        let previous_unread = state.unread_count;
        let epoch = state.epoch + 1;
        let refresh_in_flight = state.refresh_in_flight;
        *state = SyncState {
            epoch,
            refresh_in_flight,
            ..SyncState::default()
        };
        drop(state);

        if had_content {
            info!("[NotifySync] 🧹 通知缓存已清空");
            self.notify_changed(Vec::new(), previous_unread, 0).await;
        }
    }

    /// 拉取服务器未读数并与本地对比，只记录日志
    pub async fn check_unread_drift(&self) -> Option<UnreadDrift> {
        if !self.session.has_access_token().await {
            debug!("[NotifySync] 未登录，跳过未读数对比");
            return None;
        }

        let remote = match self.api.get_unread_count().await {
            Ok(remote) => remote,
            Err(e) => {
                warn!("[NotifySync] ⚠️ 获取服务器未读数失败: {}", e);
                return None;
            }
        };

        let drift = UnreadDrift {
            local: self.unread_count().await,
            remote,
        };
        if drift.is_consistent() {
            debug!("[NotifySync] 未读数一致: {}", drift.local);
        } else {
            warn!(
                "[NotifySync] ⚠️ 未读数不一致：本地 {}，服务器 {}（以本地为准）",
                drift.local, drift.remote
            );
        }
        Some(drift)
    }

    /// 记录远程失败：写入快照错误并提示用户；会话已失效时清空缓存
    async fn handle_failure(&self, operation: &str, err: TransportError) -> SyncError {
        error!("[NotifySync] ❌ {}失败: {}", operation, err);

        if err.is_session_fatal() {
            self.reset().await;
        }

        let message = format!("{}失败: {}", operation, err);
        self.state.lock().await.error = Some(message.clone());
        self.listener.on_notice(message).await;
        SyncError::Transport(err)
    }

    async fn notify_changed(
        &self,
        notifications: Vec<Notification>,
        previous_unread: usize,
        unread: usize,
    ) {
        self.listener
            .on_notification_list_changed(notifications)
            .await;
        if previous_unread != unread {
            self.listener.on_unread_count_changed(unread).await;
        }
    }
}
