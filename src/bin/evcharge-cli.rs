//! 充电桩仪表盘 CLI 客户端（测试版）
//!
//! 非交互式 CLI，用于测试和展示通知同步
//! 启动时通过命令行参数指定账号，自动登录（或恢复本地会话），展示通知并持续轮询

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::Parser;
use evcharge_dashboard_core::dashboard::notification::NotificationListener;
use evcharge_dashboard_core::dashboard::session::SessionListener;
use evcharge_dashboard_core::{ClientConfig, DashboardClient, Notification};
use std::sync::Arc;
use tokio::time::{sleep, Duration};
use tracing::{error, info, warn};

/// 充电桩仪表盘 CLI 客户端
#[derive(Parser, Debug)]
#[command(name = "evcharge-cli")]
#[command(about = "充电桩仪表盘 CLI - 用于测试和展示通知同步", long_about = None)]
struct Args {
    /// API 基础地址
    #[arg(long, default_value = "http://localhost:8080/api")]
    base_url: String,

    /// 会话数据库 URL
    #[arg(long, default_value = "sqlite://evcharge_session.db?mode=rwc")]
    db: String,

    /// 登录邮箱（不传则尝试恢复本地会话）
    #[arg(short, long)]
    email: Option<String>,

    /// 登录密码
    #[arg(short, long, default_value = "")]
    password: String,

    /// 运行时长（秒），0 表示持续运行
    #[arg(short, long, default_value = "0")]
    duration: u64,

    /// 日志级别（默认: info,evcharge_dashboard_core=debug）
    #[arg(long, default_value = "info,evcharge_dashboard_core=debug")]
    log_level: String,

    /// 展示后把全部通知标记为已读
    #[arg(long)]
    mark_all_read: bool,
}

/// 初始化日志（同时输出到 stdout 和文件）
fn init_logger(log_level: &str) -> Result<()> {
    use std::fs::OpenOptions;
    use std::io;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    // 优先使用环境变量 RUST_LOG（如果设置了），否则使用命令行参数
    let filter_layer =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open("debug.log")
        .context("无法创建日志文件 debug.log")?;

    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stdout)
        .with_file(true)
        .with_line_number(true)
        .with_target(false)
        .with_ansi(true);

    // 文件不需要颜色
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(log_file)
        .with_file(true)
        .with_line_number(true)
        .with_target(false)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    info!("[CLI] 📝 日志已同时输出到控制台和文件: debug.log");
    Ok(())
}

struct CliSessionListener;

#[async_trait]
impl SessionListener for CliSessionListener {
    async fn on_session_expired(&self, reason: String) {
        error!("[CLI/Session] 🚪 会话失效，需要重新登录: {}", reason);
    }

    async fn on_tokens_renewed(&self) {
        info!("[CLI/Session] 🔄 token 已续期");
    }
}

struct CliNotificationListener;

#[async_trait]
impl NotificationListener for CliNotificationListener {
    async fn on_sync_start(&self) {
        info!("[CLI/Notify] 🔄 刷新开始");
    }

    async fn on_sync_finish(&self) {
        info!("[CLI/Notify] ✅ 刷新完成");
    }

    async fn on_sync_failed(&self, error: String) {
        error!("[CLI/Notify] ❌ 刷新失败: {}", error);
    }

    async fn on_notification_list_changed(&self, notifications: Vec<Notification>) {
        info!("[CLI/Notify] 📋 通知列表变更，共 {} 条", notifications.len());
    }

    async fn on_unread_count_changed(&self, unread_count: usize) {
        info!("[CLI/Notify] 📬 未读数: {}", unread_count);
    }

    async fn on_notice(&self, message: String) {
        warn!("[CLI/Notify] 💬 {}", message);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logger(&args.log_level)?;

    info!("[CLI] 🚀 充电桩仪表盘 CLI（测试模式）");
    info!("[CLI] 🌐 API 地址: {}", args.base_url);
    info!("[CLI] ⏱️  运行时长: {} 秒（0=持续运行）", args.duration);

    let config = ClientConfig::new(args.base_url.clone()).with_session_db_url(args.db.clone());
    let client = DashboardClient::new(
        config,
        Arc::new(CliSessionListener),
        Arc::new(CliNotificationListener),
    )
    .await?;

    match args.email.as_deref() {
        Some(email) => {
            info!("[CLI] 🔐 正在登录: {}", email);
            let user = client.login(email, &args.password).await?;
            info!("[CLI] ✅ 登录成功！用户: {} ({})", user.name, user.role);
        }
        None => {
            if !client.resume().await {
                return Err(anyhow::anyhow!("本地没有可用会话，请通过 --email 登录"));
            }
            info!("[CLI] ✅ 已恢复本地会话");
        }
    }

    let snapshot = client.notifications().snapshot().await;
    info!(
        "[CLI] 📋 通知列表（共 {} 条，未读 {} 条）:",
        snapshot.notifications.len(),
        snapshot.unread_count
    );
    for n in snapshot.notifications.iter().take(10) {
        info!(
            "[CLI]   {} #{} [{:?}] {} | {}",
            if n.is_read { " " } else { "●" },
            n.id,
            n.kind,
            n.title,
            n.sent_time.format("%Y-%m-%d %H:%M")
        );
    }

    if args.mark_all_read {
        match client.notifications().mark_all_read().await {
            Ok(()) => info!("[CLI] ✅ 已全部标记已读"),
            Err(e) => error!("[CLI] ❌ 全部已读失败: {}", e),
        }
    }

    if args.duration > 0 {
        info!("[CLI] ⏰ {} 秒后自动退出", args.duration);
        sleep(Duration::from_secs(args.duration)).await;
        client.stop_polling().await;
        info!("[CLI] 👋 程序退出");
    } else {
        info!("[CLI] ⏰ 持续运行中，按 Ctrl+C 退出");
        tokio::signal::ctrl_c().await.context("监听 Ctrl+C 失败")?;
        client.stop_polling().await;
        info!("[CLI] 👋 程序退出");
    }

    Ok(())
}
