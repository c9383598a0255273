use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::core::gateway::GatewayClient;
use crate::core::jobs::ScheduledJob;
use crate::core::lifecycle::LifecycleManager;
use crate::core::reconcile::{ReconcileOutcome, Reconciler};
use crate::core::status::OperatorUpdate;
use crate::core::store::DashboardStore;

#[derive(Debug, Clone, Serialize)]
pub struct JobSyncResult {
    pub synced: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Serialize)]
pub struct SyncReport {
    pub success: bool,
    pub jobs: JobSyncResult,
    pub status: ReconcileOutcome,
}

/// Mirrors gateway state into the local store.
pub struct SyncService {
    gateway: Arc<GatewayClient>,
    store: Arc<DashboardStore>,
    reconciler: Reconciler,
}

impl SyncService {
    pub fn new(
        gateway: Arc<GatewayClient>,
        store: Arc<DashboardStore>,
        quiet_period: chrono::TimeDelta,
    ) -> Self {
        let reconciler = Reconciler::new(gateway.clone(), store.clone(), quiet_period);
        Self {
            gateway,
            store,
            reconciler,
        }
    }

    pub async fn sync_jobs(&self) -> JobSyncResult {
        self.sync_jobs_at(Utc::now()).await
    }

    async fn sync_jobs_at(&self, now: DateTime<Utc>) -> JobSyncResult {
        let jobs = match self.gateway.list_jobs().await {
            Ok(jobs) => jobs,
            Err(e) => {
                warn!("[Sync] Could not fetch cron jobs: {}", e);
                return JobSyncResult {
                    synced: 0,
                    error: Some(e.to_string()),
                };
            }
        };

        let mut synced = 0;
        for job in &jobs {
            let row = ScheduledJob::from(job);
            if let Err(e) = self.store.upsert_job(&row, now).await {
                warn!("[Sync] Could not store job '{}': {}", row.name, e);
                return JobSyncResult {
                    synced,
                    error: Some(e.to_string()),
                };
            }
            synced += 1;
        }

        info!("[Sync] Synced {} cron jobs", synced);
        JobSyncResult {
            synced,
            error: None,
        }
    }

    pub async fn apply_operator_update(&self, update: OperatorUpdate, at: DateTime<Utc>) -> Result<()> {
        self.reconciler.apply_operator(update, at).await
    }

    pub async fn sync_bot_status(&self) -> ReconcileOutcome {
        self.reconciler.run().await
    }

    pub async fn sync_all(&self) -> SyncReport {
        let (jobs, status) = tokio::join!(self.sync_jobs(), self.sync_bot_status());
        let success = jobs.error.is_none() && status.error.is_none();
        if !success {
            warn!(
                "[Sync] Partial failure (jobs: {}, status: {})",
                jobs.error.as_deref().unwrap_or("ok"),
                status
                    .error
                    .as_ref()
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| "ok".to_string())
            );
        }
        SyncReport {
            success,
            jobs,
            status,
        }
    }
}

/// Registers the periodic gateway poll and fires one sync shortly after boot.
/// An unparsable schedule fails startup.
pub async fn attach_sync_poll(
    sync: Arc<SyncService>,
    schedule: &str,
    lifecycle: &mut LifecycleManager,
) -> Result<()> {
    let poll_sync = sync.clone();
    let job = tokio_cron_scheduler::Job::new_async(schedule, move |_uuid, mut _l| {
        let sync = poll_sync.clone();
        Box::pin(async move {
            sync.sync_all().await;
        })
    })
    .with_context(|| format!("invalid sync schedule '{schedule}'"))?;
    lifecycle.schedule(job).await?;
    info!("[Sync] Gateway poll scheduled ({})", schedule);

    tokio::spawn(async move {
        tokio::time::sleep(tokio::time::Duration::from_secs(2)).await;
        sync.sync_all().await;
    });
    Ok(())
}
