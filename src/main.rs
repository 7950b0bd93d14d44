//! crmlens - CRM developer tooling companion service
//!
//! Dev-harness entry point: runs the background service against in-memory
//! stand-ins for the browser facilities, scripting a full impersonation
//! session so the routing, rule, and lifecycle paths can be exercised end
//! to end from a terminal.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::info;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crmlens_background::{
    BackgroundService, InMemoryBadge, InMemoryRuleEngine, InMemoryTabHost, LogNotifier,
    StartupKind,
};
use crmlens_impersonation::ImpersonationConfig;
use crmlens_protocols::SenderContext;

/// crmlens CLI.
#[derive(Parser)]
#[command(name = "crmlens")]
#[command(about = "CRM developer tooling companion service")]
#[command(version)]
struct Cli {
    /// Directory for rolling log files (console-only when omitted)
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    /// Override the injected caller-id header name
    #[arg(long, global = true)]
    header_name: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the scripted impersonation scenario (default)
    Demo {
        /// Tab URL the scenario impersonates in
        #[arg(long, default_value = "https://org.crm.dynamics.com/main.aspx")]
        tab_url: String,

        /// Directory object id assigned to the scenario user
        #[arg(long, default_value = "abc-123")]
        object_id: String,

        /// Display name assigned to the scenario user
        #[arg(long, default_value = "Jane Doe")]
        display_name: String,
    },
}

/// Initialize tracing with console output and an optional rolling file.
fn init_tracing(log_dir: Option<&PathBuf>) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let console = fmt::layer().with_target(true).with_ansi(true);

    match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir).context("creating log directory")?;
            let file_appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix("crmlens")
                .filename_suffix("log")
                .max_log_files(14)
                .build(dir)
                .context("building file appender")?;
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

            // Keep the writer guard alive for the program duration.
            static GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
                std::sync::OnceLock::new();
            let _ = GUARD.set(guard);

            tracing_subscriber::registry()
                .with(env_filter)
                .with(console)
                .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
                .init();
        }
        None => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(console)
                .init();
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_dir.as_ref())?;

    let mut config = ImpersonationConfig::default();
    if let Some(header_name) = cli.header_name {
        config.header_name = header_name;
    }

    match cli.command {
        Some(Commands::Demo {
            tab_url,
            object_id,
            display_name,
        }) => run_demo(config, &tab_url, &object_id, &display_name).await,
        None => {
            run_demo(
                config,
                "https://org.crm.dynamics.com/main.aspx",
                "abc-123",
                "Jane Doe",
            )
            .await
        }
    }
}

async fn run_demo(
    config: ImpersonationConfig,
    tab_url: &str,
    object_id: &str,
    display_name: &str,
) -> anyhow::Result<()> {
    let engine = Arc::new(InMemoryRuleEngine::new());
    let tabs = Arc::new(InMemoryTabHost::new());
    let badge = Arc::new(InMemoryBadge::new());

    let service = BackgroundService::new(
        config.clone(),
        engine.clone(),
        tabs.clone(),
        badge.clone(),
        Arc::new(LogNotifier),
    );
    service
        .start(StartupKind::FreshInstall)
        .await
        .context("starting background service")?;

    const TAB: i64 = 7;
    tabs.open_tab(TAB, tab_url);
    info!(tab = TAB, url = tab_url, "opened tab");

    let resp = service
        .router()
        .dispatch(
            "admin:start-impersonation",
            json!({
                "user": {"objectId": object_id, "displayName": display_name},
                "tabId": TAB,
                "tabUrl": tab_url,
            }),
            SenderContext::default(),
        )
        .await;
    anyhow::ensure!(resp.success, "start-impersonation failed: {:?}", resp.error);
    info!(
        rules = engine.len(),
        badge = badge.text_for(TAB).as_deref().unwrap_or(""),
        "impersonation active"
    );

    let resp = service
        .router()
        .dispatch(
            "admin:get-impersonation-status",
            json!({"tabId": TAB}),
            SenderContext::default(),
        )
        .await;
    info!(status = %resp.data.unwrap_or_default(), "impersonation status");

    // Relaunch the service over the same engine: the mid-session restart
    // path rebuilds its state from persisted rules.
    service.shutdown();
    let relaunched = BackgroundService::new(
        config,
        engine.clone(),
        tabs.clone(),
        badge.clone(),
        Arc::new(LogNotifier),
    );
    relaunched
        .start(StartupKind::ServiceRestart)
        .await
        .context("relaunching background service")?;
    info!(
        restored = relaunched.manager().active_len(),
        "service relaunched"
    );

    tabs.close_tab(TAB);
    // Give the lifecycle listener a beat to reap the override.
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    anyhow::ensure!(
        relaunched.manager().status(TAB).is_none(),
        "override survived tab closure"
    );
    info!(rules = engine.len(), "tab closed, override reaped");

    relaunched.shutdown();
    info!("demo complete");
    Ok(())
}
