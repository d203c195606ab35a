//! 会话数据访问层（DAO）
//!
//! 凭证对和用户资料以 key-value 形式保存在 SQLite 中，进程重启后仍可恢复。

use crate::dashboard::session::models::keys;
use anyhow::{Context, Result};
use sqlx::{sqlite::SqlitePoolOptions, Pool, Row, Sqlite};
use std::collections::HashMap;
use tracing::{debug, info};

/// 会话 DAO（基于 sqlx）
#[derive(Clone)]
pub struct SessionDao {
    db: Pool<Sqlite>,
}

impl SessionDao {
    /// 创建新的会话 DAO
    pub fn new(db: Pool<Sqlite>) -> Self {
        Self { db }
    }

    /// 连接 SQLite 并初始化表结构
    ///
    /// `db_url` 例如 `sqlite://evcharge_session.db?mode=rwc`
    pub async fn connect(db_url: &str) -> Result<Self> {
        info!("[SessionDAO/DB] 🔗 连接会话数据库: {}", db_url);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(db_url)
            .await
            .context(format!("连接SQLite数据库失败: {}", db_url))?;
        let dao = Self::new(pool);
        dao.init_db().await?;
        Ok(dao)
    }

    /// 内存数据库（测试和临时会话使用）
    ///
    /// 每个 `:memory:` 连接都是独立的库，所以连接池只能有一个且不能回收
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .context("创建内存数据库失败")?;
        let dao = Self::new(pool);
        dao.init_db().await?;
        Ok(dao)
    }

    /// 初始化数据库表结构
    pub async fn init_db(&self) -> Result<()> {
        info!("[SessionDAO/DB] 初始化会话数据库表结构");

        let sql = r#"
            CREATE TABLE IF NOT EXISTS local_session_kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )
        "#;
        sqlx::query(sql)
            .execute(&self.db)
            .await
            .context("创建会话表失败")?;

        Ok(())
    }

    /// 读取单个 key
    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        let row = sqlx::query("SELECT value FROM local_session_kv WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.db)
            .await
            .context(format!("读取 {} 失败", key))?;
        Ok(row.map(|r| r.get::<String, _>("value")))
    }

    /// 读取全部已知 key
    pub async fn load_all(&self) -> Result<HashMap<String, String>> {
        let rows = sqlx::query("SELECT key, value FROM local_session_kv")
            .fetch_all(&self.db)
            .await
            .context("读取会话数据失败")?;

        let entries: HashMap<String, String> = rows
            .into_iter()
            .map(|r| (r.get::<String, _>("key"), r.get::<String, _>("value")))
            .filter(|(k, _)| keys::ALL.contains(&k.as_str()))
            .collect();
        debug!("[SessionDAO] 读取到 {} 个会话字段", entries.len());
        Ok(entries)
    }

    /// 在一个事务内写入多个 key
    pub async fn save_entries(&self, entries: &[(&str, &str)]) -> Result<()> {
        let mut tx = self.db.begin().await.context("开启事务失败")?;
        for (key, value) in entries {
            sqlx::query(
                r#"
                INSERT INTO local_session_kv (key, value) VALUES (?, ?)
                ON CONFLICT(key) DO UPDATE SET value = excluded.value
                "#,
            )
            .bind(*key)
            .bind(*value)
            .execute(&mut *tx)
            .await
            .context(format!("写入 {} 失败", key))?;
        }
        tx.commit().await.context("提交事务失败")?;
        debug!("[SessionDAO] 写入 {} 个会话字段", entries.len());
        Ok(())
    }

    /// 在一个事务内删除全部会话字段
    pub async fn clear_all(&self) -> Result<()> {
        let mut tx = self.db.begin().await.context("开启事务失败")?;
        for key in keys::ALL {
            sqlx::query("DELETE FROM local_session_kv WHERE key = ?")
                .bind(key)
                .execute(&mut *tx)
                .await
                .context(format!("删除 {} 失败", key))?;
        }
        tx.commit().await.context("提交事务失败")?;
        info!("[SessionDAO] 🧹 会话字段已全部清除");
        Ok(())
    }
}
