use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::Value;

use super::super::AppState;
use super::{bad_request, error_response, internal_error};

pub async fn get_jobs(State(state): State<AppState>) -> Response {
    match state.store.list_jobs().await {
        Ok(jobs) => Json(jobs).into_response(),
        Err(e) => internal_error("Failed to fetch jobs", e),
    }
}

/// `{ id, enabled }`. Only the local mirror is toggled.
pub async fn toggle_job(State(state): State<AppState>, Json(payload): Json<Value>) -> Response {
    let id = payload.get("id").and_then(Value::as_str).unwrap_or_default();
    let Some(enabled) = payload.get("enabled").and_then(Value::as_bool) else {
        return bad_request("id and enabled (boolean) are required");
    };
    if id.trim().is_empty() {
        return bad_request("id and enabled (boolean) are required");
    }

    match state.store.set_job_enabled(id, enabled).await {
        Ok(true) => Json(serde_json::json!({ "success": true, "id": id, "enabled": enabled }))
            .into_response(),
        Ok(false) => error_response(StatusCode::NOT_FOUND, "Job not found"),
        Err(e) => internal_error("Failed to update job", e),
    }
}
