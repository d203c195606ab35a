//! 未读数诊断轮询
//!
//! 已登录期间每个周期对比一次本地与服务器未读数，不修改缓存。
//! 会话变为未登录时清空通知缓存并退出。

use crate::dashboard::notification::service::NotificationSyncer;
use crate::dashboard::session::SessionStatus;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

/// 轮询任务句柄，drop 时自动停止
pub struct NotificationPoller {
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl NotificationPoller {
    /// 启动轮询任务，第一次检查在一个周期之后
    pub fn spawn(syncer: Arc<NotificationSyncer>, period: Duration) -> Self {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let handle = tokio::spawn(run_poll_loop(syncer, period, shutdown_rx));
        Self {
            shutdown: Some(shutdown_tx),
            handle: Some(handle),
        }
    }

    /// 轮询任务是否已退出（被停止或会话失效）
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, |h| h.is_finished())
    }

    /// 停止轮询并等待任务退出
    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for NotificationPoller {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

async fn run_poll_loop(
    syncer: Arc<NotificationSyncer>,
    period: Duration,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    let mut status_rx = syncer.session().subscribe();
    let authenticated = status_rx.borrow_and_update().is_authenticated();
    if !authenticated {
        info!("[NotifyPoll] 未登录，不启动轮询");
        syncer.reset().await;
        return;
    }

    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!("[NotifyPoll] ▶️ 未读数轮询已启动，周期: {:?}", period);

    loop {
        tokio::select! {
            _ = &mut shutdown_rx => {
                info!("[NotifyPoll] ⏹️ 轮询已停止");
                break;
            }
            changed = status_rx.changed() => {
                let status = if changed.is_ok() {
                    *status_rx.borrow_and_update()
                } else {
                    SessionStatus::Unauthenticated
                };
                if status == SessionStatus::Unauthenticated {
                    info!("[NotifyPoll] 会话已结束，清空通知缓存并停止轮询");
                    syncer.reset().await;
                    break;
                }
                debug!("[NotifyPoll] 会话状态变更: {:?}", status);
            }
            _ = ticker.tick() => {
                debug!("[NotifyPoll] ⏰ 检查未读数");
                syncer.check_unread_drift().await;
            }
        }
    }
}
