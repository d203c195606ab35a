//! 会话服务层
//!
//! 凭证对只在这里被修改：登录建立、续期更新、失效清理。
//! 内存状态和 SQLite 持久化在同一把写锁内更新，保证两者一致。

use crate::dashboard::serialization::{mask_token, token_expiry};
use crate::dashboard::session::dao::SessionDao;
use crate::dashboard::session::listener::{EmptySessionListener, SessionListener};
use crate::dashboard::session::models::{keys, CredentialPair, SessionStatus, UserProfile};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::{watch, RwLock};
use tracing::{debug, info, warn};

#[derive(Default)]
struct SessionInner {
    access_token: Option<String>,
    refresh_token: Option<String>,
    profile: Option<UserProfile>,
    /// 每次登录建立或清理会话时递增，续期结果只写回发起时的那一代会话
    generation: u64,
}

/// 登录会话
pub struct Session {
    dao: SessionDao,
    inner: RwLock<SessionInner>,
    status_tx: watch::Sender<SessionStatus>,
    listener: Arc<dyn SessionListener>,
}

impl Session {
    /// 从持久化存储恢复会话（使用默认空监听器）
    pub async fn load(dao: SessionDao) -> Result<Self> {
        Self::load_with_listener(dao, Arc::new(EmptySessionListener)).await
    }

    /// 从持久化存储恢复会话（带自定义监听器）
    pub async fn load_with_listener(
        dao: SessionDao,
        listener: Arc<dyn SessionListener>,
    ) -> Result<Self> {
        let mut stored = dao.load_all().await?;
        let access_token = stored.remove(keys::ACCESS_TOKEN);
        let refresh_token = stored.remove(keys::REFRESH_TOKEN);
        let profile = stored.remove(keys::USER_ID).map(|id| UserProfile {
            id,
            name: stored.remove(keys::USER_NAME).unwrap_or_default(),
            email: stored.remove(keys::USER_EMAIL).unwrap_or_default(),
            role: stored.remove(keys::USER_ROLE).unwrap_or_default(),
        });

        let status = match (&access_token, &refresh_token) {
            (Some(_), Some(_)) => {
                info!("[Session] ✅ 已从本地存储恢复会话");
                SessionStatus::Authenticated
            }
            (Some(_), None) => {
                // 首次 401 时会清理，这里先保留以便仍然有效的 access token 继续使用
                warn!("[Session] ⚠️ 本地只有 access token，没有 refresh token");
                SessionStatus::Authenticated
            }
            (None, Some(_)) => {
                warn!("[Session] ⚠️ 本地只有 refresh token，清理残留会话");
                dao.clear_all().await?;
                let (status_tx, _) = watch::channel(SessionStatus::Unauthenticated);
                return Ok(Self {
                    dao,
                    inner: RwLock::new(SessionInner::default()),
                    status_tx,
                    listener,
                });
            }
            (None, None) => {
                debug!("[Session] 本地没有会话，保持未登录状态");
                SessionStatus::Unauthenticated
            }
        };

        if let Some(exp) = access_token.as_deref().and_then(token_expiry) {
            debug!("[Session] access token 过期时间: {}", exp);
        }

        let (status_tx, _) = watch::channel(status);
        Ok(Self {
            dao,
            inner: RwLock::new(SessionInner {
                access_token,
                refresh_token,
                profile,
                ..Default::default()
            }),
            status_tx,
            listener,
        })
    }

    /// 登录成功后建立会话（原子写入凭证对和用户资料）
    pub async fn establish(&self, credentials: CredentialPair, profile: UserProfile) -> Result<()> {
        let mut inner = self.inner.write().await;
        self.dao
            .save_entries(&[
                (keys::ACCESS_TOKEN, credentials.access_token.as_str()),
                (keys::REFRESH_TOKEN, credentials.refresh_token.as_str()),
                (keys::USER_ID, profile.id.as_str()),
                (keys::USER_NAME, profile.name.as_str()),
                (keys::USER_EMAIL, profile.email.as_str()),
                (keys::USER_ROLE, profile.role.as_str()),
            ])
            .await
            .context("保存会话失败")?;

        info!(
            "[Session] 🔐 会话已建立，用户ID: {}, 角色: {}, access token: {}",
            profile.id,
            profile.role,
            mask_token(&credentials.access_token)
        );
        inner.access_token = Some(credentials.access_token);
        inner.refresh_token = Some(credentials.refresh_token);
        inner.profile = Some(profile);
        inner.generation += 1;
        self.status_tx.send_replace(SessionStatus::Authenticated);
        Ok(())
    }

    /// 当前会话代数
    pub async fn generation(&self) -> u64 {
        self.inner.read().await.generation
    }

    /// 在同一把读锁下取出会话代数和 refresh token，供续期使用
    pub(crate) async fn refresh_grant(&self) -> Option<(u64, String)> {
        let inner = self.inner.read().await;
        inner
            .refresh_token
            .clone()
            .map(|refresh| (inner.generation, refresh))
    }

    /// 写入续期得到的新 token
    ///
    /// 服务器未返回新的 refresh token 时沿用旧值。会话在续期期间已被清理时拒绝写入。
    pub async fn apply_renewal(
        &self,
        generation: u64,
        access_token: String,
        refresh_token: Option<String>,
    ) -> Result<()> {
        {
            let mut inner = self.inner.write().await;
            if inner.generation != generation {
                return Err(anyhow::anyhow!(
                    "续期期间会话已变更（代数 {} → {}），丢弃续期结果",
                    generation,
                    inner.generation
                ));
            }
            if inner.refresh_token.is_none() {
                return Err(anyhow::anyhow!("会话已失效，丢弃续期结果"));
            }

            let mut entries = vec![(keys::ACCESS_TOKEN, access_token.as_str())];
            if let Some(refresh) = refresh_token.as_deref() {
                entries.push((keys::REFRESH_TOKEN, refresh));
            }
            self.dao
                .save_entries(&entries)
                .await
                .context("保存续期 token 失败")?;

            info!(
                "[Session] 🔄 token 已续期: {}{}",
                mask_token(&access_token),
                if refresh_token.is_some() {
                    "（refresh token 已轮换）"
                } else {
                    ""
                }
            );
            inner.access_token = Some(access_token);
            if refresh_token.is_some() {
                inner.refresh_token = refresh_token;
            }
        }

        self.status_tx.send_replace(SessionStatus::Authenticated);
        self.listener.on_tokens_renewed().await;
        Ok(())
    }

    /// 进入续期中状态
    pub(crate) fn mark_renewing(&self) {
        self.status_tx.send_if_modified(|status| {
            if *status == SessionStatus::Authenticated {
                *status = SessionStatus::Renewing;
                true
            } else {
                false
            }
        });
    }

    /// 清理会话：删除全部持久化字段并通知监听器跳转回未登录入口
    ///
    /// 可重复调用，监听器只在已登录 → 未登录时收到一次通知
    pub async fn teardown(&self, reason: &str) {
        self.teardown_inner(None, reason).await;
    }

    /// 只在会话仍是 `generation` 这一代时清理，过期的续期任务不能清掉新登录的会话
    pub(crate) async fn teardown_generation(&self, generation: u64, reason: &str) {
        self.teardown_inner(Some(generation), reason).await;
    }

    async fn teardown_inner(&self, expected_generation: Option<u64>, reason: &str) {
        {
            let mut inner = self.inner.write().await;
            if let Some(expected) = expected_generation {
                if inner.generation != expected {
                    debug!(
                        "[Session] 会话已变更（代数 {} → {}），跳过清理: {}",
                        expected, inner.generation, reason
                    );
                    return;
                }
            }
            if let Err(e) = self.dao.clear_all().await {
                warn!("[Session] ⚠️ 清理本地会话存储失败: {:#}", e);
            }
            let generation = inner.generation + 1;
            *inner = SessionInner {
                generation,
                ..SessionInner::default()
            };
        }

        let previous = self.status_tx.send_replace(SessionStatus::Unauthenticated);
        if previous.is_authenticated() {
            warn!("[Session] 🚪 会话已失效: {}", reason);
            self.listener.on_session_expired(reason.to_string()).await;
        } else {
            debug!("[Session] 会话已处于未登录状态，跳过通知: {}", reason);
        }
    }

    pub async fn access_token(&self) -> Option<String> {
        self.inner.read().await.access_token.clone()
    }

    pub async fn refresh_token(&self) -> Option<String> {
        self.inner.read().await.refresh_token.clone()
    }

    pub async fn has_access_token(&self) -> bool {
        self.inner.read().await.access_token.is_some()
    }

    /// 完整凭证对（两者都存在时才返回）
    pub async fn credentials(&self) -> Option<CredentialPair> {
        let inner = self.inner.read().await;
        match (&inner.access_token, &inner.refresh_token) {
            (Some(access), Some(refresh)) => Some(CredentialPair::new(access, refresh)),
            _ => None,
        }
    }

    pub async fn profile(&self) -> Option<UserProfile> {
        self.inner.read().await.profile.clone()
    }

    /// access token 的过期时间（仅 JWT 格式可解析）
    pub async fn access_token_expires_at(&self) -> Option<DateTime<Utc>> {
        self.inner
            .read()
            .await
            .access_token
            .as_deref()
            .and_then(token_expiry)
    }

    pub fn status(&self) -> SessionStatus {
        *self.status_tx.borrow()
    }

    /// 订阅会话状态变化
    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.status_tx.subscribe()
    }
}
