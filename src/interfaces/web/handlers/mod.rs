pub(super) mod activity;
pub(super) mod calendar;
pub(super) mod heartbeat;
pub(super) mod jobs;
pub(super) mod notes;
pub(super) mod status;
pub(super) mod sync;
pub(super) mod tasks;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

pub(super) fn error_response(code: StatusCode, message: impl std::fmt::Display) -> Response {
    (code, Json(serde_json::json!({ "error": message.to_string() }))).into_response()
}

pub(super) fn bad_request(message: &str) -> Response {
    error_response(StatusCode::BAD_REQUEST, message)
}

/// Logs the cause and hides it behind a generic message.
pub(super) fn internal_error(context: &str, e: anyhow::Error) -> Response {
    tracing::error!("{}: {}", context, e);
    error_response(StatusCode::INTERNAL_SERVER_ERROR, context)
}
