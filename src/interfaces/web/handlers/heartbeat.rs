use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::warn;

use super::super::AppState;
use super::internal_error;
use crate::core::status::BotState;
use crate::core::store::types::NewActivity;

const DEFAULT_HEARTBEAT_MESSAGE: &str = "Heartbeat: all systems nominal";

#[derive(Deserialize, Default)]
pub struct HeartbeatRequest {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    details: Option<String>,
    #[serde(default)]
    metadata: Option<Map<String, Value>>,
}

/// Called by the bot on every heartbeat. Marks it alive and hands back the
/// work it should look at: unseen notes, today's events, urgent tasks.
pub async fn post_heartbeat(
    State(state): State<AppState>,
    payload: Option<Json<HeartbeatRequest>>,
) -> Response {
    let body = payload.map(|Json(b)| b).unwrap_or_default();
    let now = Utc::now();
    let today = now.date_naive();
    let timestamp = now.to_rfc3339();

    if let Err(e) = state.store.heartbeat(now).await {
        return internal_error("Failed to process heartbeat", e);
    }

    let mut metadata = Map::new();
    metadata.insert("timestamp".to_string(), json!(timestamp));
    metadata.insert("source".to_string(), json!("bot"));
    metadata.extend(body.metadata.unwrap_or_default());

    let message = body
        .message
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_HEARTBEAT_MESSAGE.to_string());
    let entry = NewActivity {
        kind: "heartbeat".to_string(),
        message,
        details: body.details,
        metadata: Some(Value::Object(metadata)),
        ..Default::default()
    };
    if let Err(e) = state.store.log_activity(entry, now).await {
        return internal_error("Failed to process heartbeat", e);
    }

    let unseen_notes = state.store.list_unseen_notes().await.unwrap_or_else(|e| {
        warn!("Could not fetch notes: {}", e);
        Vec::new()
    });
    let today_events = state.store.today_events(today).await.unwrap_or_else(|e| {
        warn!("Could not fetch today's events: {}", e);
        Vec::new()
    });
    let urgent_tasks = state
        .store
        .urgent_tasks(today, now)
        .await
        .unwrap_or_else(|e| {
            warn!("Could not fetch tasks: {}", e);
            Vec::new()
        });

    Json(json!({
        "success": true,
        "timestamp": timestamp,
        "data": {
            "counts": {
                "unseenNotes": unseen_notes.len(),
                "todayEvents": today_events.len(),
                "urgentTasks": urgent_tasks.len(),
            },
            "unseenNotes": unseen_notes,
            "todayEvents": today_events,
            "urgentTasks": urgent_tasks,
        }
    }))
    .into_response()
}

pub async fn get_heartbeat(State(state): State<AppState>) -> Response {
    let now = Utc::now();
    match state.store.read_status().await {
        Ok(record) => {
            let bot = record
                .map(|r| BotState::from_record(r, now))
                .unwrap_or_else(|| BotState::offline(now));
            Json(json!({
                "healthy": true,
                "botStatus": bot.status,
                "lastHeartbeat": bot.last_activity,
                "uptime": bot.uptime,
            }))
            .into_response()
        }
        Err(e) => {
            warn!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "healthy": false, "error": "Database connection failed" })),
            )
                .into_response()
        }
    }
}
