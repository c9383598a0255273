use axum::{
    Json,
    extract::State,
    response::{IntoResponse, Response},
};
use chrono::Utc;

use super::super::AppState;
use super::internal_error;
use crate::core::store::TaskBoard;
use crate::core::store::types::TaskInput;

pub async fn get_tasks(State(state): State<AppState>) -> Response {
    match state.store.list_tasks(Utc::now()).await {
        Ok(tasks) => Json(tasks).into_response(),
        Err(e) => internal_error("Failed to fetch tasks", e),
    }
}

pub async fn get_board(State(state): State<AppState>) -> Response {
    let now = Utc::now();
    match state.store.list_tasks(now).await {
        Ok(tasks) => Json(TaskBoard::group(tasks, now.date_naive())).into_response(),
        Err(e) => internal_error("Failed to fetch tasks", e),
    }
}

pub async fn upsert_tasks(
    State(state): State<AppState>,
    Json(tasks): Json<Vec<TaskInput>>,
) -> Response {
    match state.store.upsert_tasks(tasks, Utc::now()).await {
        Ok(count) => Json(serde_json::json!({ "success": true, "upserted": count })).into_response(),
        Err(e) => internal_error("Failed to store tasks", e),
    }
}
