use axum::{
    Json,
    extract::State,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::Deserialize;

use super::super::AppState;
use super::{bad_request, internal_error};
use crate::core::status::{BotState, BotStatus, OperatorUpdate, SubAgent};

/// Falls back to `offline` when nothing is cached or the store is unreadable.
pub async fn get_status(State(state): State<AppState>) -> Json<BotState> {
    let now = Utc::now();
    match state.store.read_status().await {
        Ok(Some(record)) => Json(BotState::from_record(record, now)),
        Ok(None) => Json(BotState::offline(now)),
        Err(e) => {
            tracing::warn!("Could not read bot status: {}", e);
            Json(BotState::offline(now))
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdateRequest {
    #[serde(default)]
    status: Option<String>,
    /// Absent keeps the task, `null` clears it.
    #[serde(default, deserialize_with = "explicit_null")]
    current_task: Option<Option<String>>,
    #[serde(default)]
    sub_agents: Option<Vec<SubAgent>>,
}

fn explicit_null<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

/// Operator write. Always applied, whatever the reconciler last derived.
pub async fn update_status(
    State(state): State<AppState>,
    Json(payload): Json<StatusUpdateRequest>,
) -> Response {
    let status = match payload.status.as_deref().map(str::parse::<BotStatus>) {
        Some(Ok(status)) => Some(status),
        Some(Err(e)) => return bad_request(&e.to_string()),
        None => None,
    };
    let update = OperatorUpdate {
        status,
        current_task: payload.current_task,
        sub_agents: payload.sub_agents,
    };

    let now = Utc::now();
    if let Err(e) = state.sync.apply_operator_update(update, now).await {
        return internal_error("Failed to update status", e);
    }
    match state.store.read_status().await {
        Ok(Some(record)) => Json(BotState::from_record(record, now)).into_response(),
        Ok(None) => Json(BotState::offline(now)).into_response(),
        Err(e) => internal_error("Failed to read status", e),
    }
}

pub async fn status_heartbeat(State(state): State<AppState>) -> Response {
    let now = Utc::now();
    match state.store.heartbeat(now).await {
        Ok(()) => Json(serde_json::json!({
            "success": true,
            "timestamp": now.to_rfc3339()
        }))
        .into_response(),
        Err(e) => internal_error("Failed to record heartbeat", e),
    }
}
