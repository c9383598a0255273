use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::Deserialize;

use super::super::AppState;
use super::{bad_request, error_response, internal_error};
use crate::core::store::types::NOTE_DASHBOARD_TAG;

pub async fn get_notes(State(state): State<AppState>) -> Response {
    match state.store.list_notes().await {
        Ok(notes) => Json(notes).into_response(),
        Err(e) => internal_error("Failed to fetch notes", e),
    }
}

#[derive(Deserialize)]
pub struct CreateNoteRequest {
    #[serde(default)]
    content: String,
}

pub async fn create_note(
    State(state): State<AppState>,
    Json(payload): Json<CreateNoteRequest>,
) -> Response {
    let content = payload.content.trim();
    if content.is_empty() {
        return bad_request("content is required");
    }

    let tags = vec![NOTE_DASHBOARD_TAG.to_string()];
    match state.store.create_note(content, None, &tags, Utc::now()).await {
        Ok(note) => (StatusCode::CREATED, Json(note)).into_response(),
        Err(e) => internal_error("Failed to create note", e),
    }
}

#[derive(Deserialize)]
pub struct MarkSeenRequest {
    #[serde(default)]
    id: String,
    #[serde(default)]
    response: Option<String>,
}

pub async fn mark_note_seen(
    State(state): State<AppState>,
    Json(payload): Json<MarkSeenRequest>,
) -> Response {
    if payload.id.trim().is_empty() {
        return bad_request("id is required");
    }

    match state
        .store
        .mark_note_seen(&payload.id, payload.response.as_deref(), Utc::now())
        .await
    {
        Ok(true) => Json(serde_json::json!({ "success": true })).into_response(),
        Ok(false) => error_response(StatusCode::NOT_FOUND, "Note not found"),
        Err(e) => internal_error("Failed to update note", e),
    }
}
