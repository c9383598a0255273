use axum::{Json, extract::State};

use super::super::AppState;
use crate::core::sync::SyncReport;

/// Runs a full gateway sync on demand. Never fails; see `success`.
pub async fn run_sync(State(state): State<AppState>) -> Json<SyncReport> {
    Json(state.sync.sync_all().await)
}
