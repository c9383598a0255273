use anyhow::Result;
use console::style;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use crate::core::config::DashboardConfig;
use crate::core::gateway::GatewayClient;
use crate::core::lifecycle::LifecycleManager;
use crate::core::store::DashboardStore;
use crate::core::sync::{SyncService, attach_sync_poll};
use crate::core::terminal::GuideSection;
use crate::interfaces::web::{ApiServer, ApiServerConfig};
use crate::platform::{NativePlatform, Platform};

pub async fn run_server(data_dir: PathBuf, config: DashboardConfig) -> Result<()> {
    let log_tx = crate::logging::init_tracing(false);
    info!("Starting botdeck (data dir: {})", data_dir.display());

    if !data_dir.exists() {
        tokio::fs::create_dir_all(&data_dir).await?;
        NativePlatform::lock_down_dir(&data_dir);
    }

    let store = Arc::new(DashboardStore::open(config.database_path(&data_dir)).await?);
    let gateway = Arc::new(GatewayClient::new(
        &config.gateway.url,
        &config.gateway.token,
        config.gateway_timeout(),
    )?);
    let sync = Arc::new(SyncService::new(gateway, store.clone(), config.quiet_period()));

    let mut lifecycle = LifecycleManager::new().await?;
    let api = ApiServer::new(ApiServerConfig {
        store,
        sync: sync.clone(),
        log_tx,
        api_host: config.server.host.clone(),
        api_port: config.server.port,
    });
    lifecycle.attach(Arc::new(Mutex::new(api)));
    attach_sync_poll(sync, &config.sync.schedule, &mut lifecycle).await?;
    lifecycle.start().await?;

    let api_url = format!("http://{}:{}/api", config.server.host, config.server.port);
    GuideSection::new("botdeck running")
        .status("API Endpoint", &format!("{}", style(&api_url).underlined().cyan()))
        .status("Gateway", &config.gateway.url)
        .status("Sync schedule", &config.sync.schedule)
        .blank()
        .text(&format!("Press {} to stop.", style("Ctrl+C").bold().yellow()))
        .print();

    tokio::signal::ctrl_c().await?;
    lifecycle.shutdown().await;
    Ok(())
}
