use anyhow::Result;
use chrono::Utc;
use std::path::Path;
use std::sync::Arc;

use crate::core::config::DashboardConfig;
use crate::core::gateway::GatewayClient;
use crate::core::status::BotState;
use crate::core::store::DashboardStore;
use crate::core::sync::SyncService;
use crate::core::terminal::{GuideSection, print_success, print_warn};

async fn open_store(data_dir: &Path, config: &DashboardConfig) -> Result<Arc<DashboardStore>> {
    Ok(Arc::new(
        DashboardStore::open(config.database_path(data_dir)).await?,
    ))
}

pub async fn run_sync(data_dir: &Path, config: &DashboardConfig) -> Result<()> {
    let store = open_store(data_dir, config).await?;
    let gateway = Arc::new(GatewayClient::new(
        &config.gateway.url,
        &config.gateway.token,
        config.gateway_timeout(),
    )?);
    let sync = SyncService::new(gateway.clone(), store, config.quiet_period());
    let report = sync.sync_all().await;
    let next_wake = match gateway.scheduler_summary().await {
        Ok(summary) if summary.enabled => format!(
            "{} ({} jobs)",
            summary
                .next_wake
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| "-".to_string()),
            summary.job_count
        ),
        Ok(_) => "scheduler disabled".to_string(),
        Err(_) => "unknown".to_string(),
    };

    let jobs_line = match &report.jobs.error {
        Some(e) => format!("failed ({})", e),
        None => format!("{} synced", report.jobs.synced),
    };
    let status_line = match (&report.status.error, &report.status.skipped) {
        (Some(e), _) => format!("{} (unchanged: {})", report.status.status, e),
        (None, Some(reason)) => format!("{} (skipped: {:?})", report.status.status, reason),
        (None, None) => report.status.status.to_string(),
    };

    GuideSection::new("Gateway sync")
        .status("Jobs", &jobs_line)
        .status("Bot status", &status_line)
        .status("Next wake", &next_wake)
        .print();

    if report.success {
        print_success("Sync complete.");
    } else {
        print_warn("Sync finished with errors.");
    }
    Ok(())
}

pub async fn show_status(data_dir: &Path, config: &DashboardConfig) -> Result<()> {
    let store = open_store(data_dir, config).await?;
    let now = Utc::now();
    let state = match store.read_status().await? {
        Some(record) => BotState::from_record(record, now),
        None => BotState::offline(now),
    };

    let mut section = GuideSection::new("Bot status")
        .status("Status", state.status.as_str())
        .status(
            "Current task",
            state.current_task.as_deref().unwrap_or("-"),
        )
        .status("Last activity", &state.last_activity)
        .status("Uptime", &format!("{}s", state.uptime));
    for agent in &state.sub_agents {
        section = section.text(&format!(
            "  sub-agent {} ({:?}): {}",
            agent.name, agent.status, agent.task
        ));
    }
    section.print();
    Ok(())
}
