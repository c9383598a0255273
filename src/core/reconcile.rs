//! Folding live gateway state into the cached status record.
//!
//! The bot writes its own status through the operator path and always wins.
//! This module is the advisory writer: on each poll it may replace `status`
//! with a value derived from the gateway, but only when the bot is not in the
//! middle of a foreground task and nobody touched the record within the quiet
//! period. The quiet period is a heuristic; a poll that reads just before an
//! operator write and writes just after it can still clobber fresher data.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::status::{BotStatus, OperatorUpdate, StatusRecord};

pub const DEFAULT_QUIET_PERIOD_SECS: i64 = 10;

/// Status written when the gateway reports live sessions and the bot has not
/// claimed a foreground task.
pub const ACTIVE_SESSION_STATUS: BotStatus = BotStatus::Thinking;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalStatusSnapshot {
    pub active_session_count: u32,
    pub scheduler_enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconcileError {
    #[error("status source unavailable: {0}")]
    SourceUnavailable(String),
    #[error("failed to read cached status: {0}")]
    StoreRead(String),
    #[error("failed to write cached status: {0}")]
    StoreWrite(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    TaskInProgress,
    QuietPeriod,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Unchanged(SkipReason),
    /// No snapshot could be fetched; the record stays as it is.
    SourceUnavailable,
    Write(BotStatus),
}

#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn snapshot(&self) -> Result<ExternalStatusSnapshot>;
}

#[async_trait]
pub trait StatusStore: Send + Sync {
    async fn read(&self) -> Result<Option<StatusRecord>>;

    /// Advisory write. Must leave `current_task` untouched and must not apply
    /// when a foreground task is present at write time. Returns whether the
    /// row was written.
    async fn write_status(&self, status: BotStatus, at: DateTime<Utc>) -> Result<bool>;

    /// Authoritative write from the bot. Always applied.
    async fn write_operator(&self, update: OperatorUpdate, at: DateTime<Utc>) -> Result<()>;
}

/// Returns the guard that forbids an advisory write, if any.
pub fn guard(
    current: Option<&StatusRecord>,
    now: DateTime<Utc>,
    quiet_period: TimeDelta,
) -> Option<SkipReason> {
    let current = current?;
    if current.has_foreground_task() {
        return Some(SkipReason::TaskInProgress);
    }
    if current.status != BotStatus::Offline && now - current.last_updated < quiet_period {
        return Some(SkipReason::QuietPeriod);
    }
    None
}

pub fn derive_status(snapshot: &ExternalStatusSnapshot) -> BotStatus {
    if snapshot.active_session_count > 0 {
        ACTIVE_SESSION_STATUS
    } else if snapshot.scheduler_enabled {
        BotStatus::Idle
    } else {
        BotStatus::Sleeping
    }
}

/// Pure decision rule. Guards are evaluated before the snapshot is looked at,
/// so a guarded record never reports a source failure.
pub fn reconcile(
    current: Option<&StatusRecord>,
    snapshot: Option<&ExternalStatusSnapshot>,
    now: DateTime<Utc>,
    quiet_period: TimeDelta,
) -> Decision {
    if let Some(reason) = guard(current, now, quiet_period) {
        return Decision::Unchanged(reason);
    }
    match snapshot {
        Some(snapshot) => Decision::Write(derive_status(snapshot)),
        None => Decision::SourceUnavailable,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconcileOutcome {
    /// Status the record holds after this poll.
    pub status: BotStatus,
    pub changed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<SkipReason>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_error"
    )]
    pub error: Option<ReconcileError>,
}

fn serialize_error<S: Serializer>(
    error: &Option<ReconcileError>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    match error {
        Some(e) => serializer.serialize_str(&e.to_string()),
        None => serializer.serialize_none(),
    }
}

impl ReconcileOutcome {
    fn unchanged(status: BotStatus, skipped: Option<SkipReason>) -> Self {
        Self {
            status,
            changed: false,
            skipped,
            error: None,
        }
    }

    fn failed(status: BotStatus, error: ReconcileError) -> Self {
        Self {
            status,
            changed: false,
            skipped: None,
            error: Some(error),
        }
    }

    pub fn is_soft_failure(&self) -> bool {
        self.error.is_some()
    }
}

pub struct Reconciler {
    source: Arc<dyn StatusSource>,
    store: Arc<dyn StatusStore>,
    quiet_period: TimeDelta,
}

impl Reconciler {
    pub fn new(
        source: Arc<dyn StatusSource>,
        store: Arc<dyn StatusStore>,
        quiet_period: TimeDelta,
    ) -> Self {
        Self {
            source,
            store,
            quiet_period,
        }
    }

    /// Authoritative write from the bot. Always applied, and restarts the
    /// quiet period for the next poll.
    pub async fn apply_operator(&self, update: OperatorUpdate, at: DateTime<Utc>) -> Result<()> {
        self.store.write_operator(update, at).await
    }

    pub async fn run(&self) -> ReconcileOutcome {
        self.run_at(Utc::now()).await
    }

    /// One poll. Collaborator failures are logged and folded into the outcome;
    /// this never returns an error.
    pub async fn run_at(&self, now: DateTime<Utc>) -> ReconcileOutcome {
        let current = match self.store.read().await {
            Ok(current) => current,
            Err(e) => {
                warn!("[Sync] Could not read cached bot status: {}", e);
                return ReconcileOutcome::failed(
                    BotStatus::Offline,
                    ReconcileError::StoreRead(e.to_string()),
                );
            }
        };
        let previous = current
            .as_ref()
            .map(|r| r.status)
            .unwrap_or(BotStatus::Offline);

        // Guards first: a busy bot costs no gateway round trip.
        if let Some(reason) = guard(current.as_ref(), now, self.quiet_period) {
            match reason {
                SkipReason::TaskInProgress => info!(
                    "[Sync] Bot is working on '{}' - not overriding",
                    current
                        .as_ref()
                        .and_then(|r| r.current_task.as_deref())
                        .unwrap_or_default()
                ),
                SkipReason::QuietPeriod => {
                    debug!("[Sync] Recent status update - not overriding")
                }
            }
            return ReconcileOutcome::unchanged(previous, Some(reason));
        }

        let snapshot = match self.source.snapshot().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("[Sync] Gateway status unavailable: {}", e);
                return ReconcileOutcome::failed(
                    previous,
                    ReconcileError::SourceUnavailable(e.to_string()),
                );
            }
        };

        let derived = match reconcile(current.as_ref(), Some(&snapshot), now, self.quiet_period) {
            Decision::Write(status) => status,
            Decision::Unchanged(reason) => return ReconcileOutcome::unchanged(previous, Some(reason)),
            Decision::SourceUnavailable => {
                return ReconcileOutcome::failed(
                    previous,
                    ReconcileError::SourceUnavailable("no snapshot".to_string()),
                );
            }
        };

        match self.store.write_status(derived, now).await {
            Ok(true) => {
                info!(
                    "[Sync] Bot status: {} (sessions: {}, scheduler: {})",
                    derived, snapshot.active_session_count, snapshot.scheduler_enabled
                );
                ReconcileOutcome {
                    status: derived,
                    changed: true,
                    skipped: None,
                    error: None,
                }
            }
            // A task was claimed between our read and our write.
            Ok(false) => ReconcileOutcome::unchanged(previous, Some(SkipReason::TaskInProgress)),
            Err(e) => {
                warn!("[Sync] Could not write bot status: {}", e);
                ReconcileOutcome::failed(previous, ReconcileError::StoreWrite(e.to_string()))
            }
        }
    }
}
