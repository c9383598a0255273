use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, NaiveDate, Utc};
use rand::Rng;
use serde::Deserialize;

use super::super::AppState;
use super::{bad_request, internal_error};
use crate::core::store::types::{ActivityQuery, NewActivity};

const DEFAULT_PAGE_SIZE: i64 = 50;
const DEFAULT_SESSION_PAGE_SIZE: i64 = 20;

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ActivityParams {
    limit: Option<i64>,
    offset: Option<i64>,
    #[serde(rename = "type")]
    kind: Option<String>,
    session_id: Option<String>,
    /// `YYYY-MM-DD`
    date: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

pub async fn get_activity(
    State(state): State<AppState>,
    Query(params): Query<ActivityParams>,
) -> Response {
    let date = match non_empty(params.date) {
        Some(raw) => match NaiveDate::parse_from_str(&raw, "%Y-%m-%d") {
            Ok(d) => Some(d),
            Err(_) => return bad_request("date must be YYYY-MM-DD"),
        },
        None => None,
    };
    let query = ActivityQuery {
        limit: params.limit.unwrap_or(DEFAULT_PAGE_SIZE).max(0),
        offset: params.offset.unwrap_or(0).max(0),
        kind: non_empty(params.kind),
        session_id: non_empty(params.session_id),
        date,
    };

    match state.store.list_activity(&query).await {
        Ok((entries, total)) => Json(serde_json::json!({
            "entries": entries,
            "total": total,
            "limit": query.limit,
            "offset": query.offset,
        }))
        .into_response(),
        Err(e) => internal_error("Failed to fetch activity log", e),
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewActivityRequest {
    #[serde(default, rename = "type")]
    kind: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    details: Option<String>,
    #[serde(default)]
    metadata: Option<serde_json::Value>,
    #[serde(default)]
    session_id: Option<String>,
    #[serde(default)]
    job_name: Option<String>,
}

/// `session_<epoch millis>_<9 base36 chars>`
pub(crate) fn generate_session_id(now: DateTime<Utc>) -> String {
    const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut rng = rand::thread_rng();
    let suffix: String = (0..9)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect();
    format!("session_{}_{}", now.timestamp_millis(), suffix)
}

pub async fn post_activity(
    State(state): State<AppState>,
    Json(payload): Json<NewActivityRequest>,
) -> Response {
    if payload.kind.trim().is_empty() || payload.message.trim().is_empty() {
        return bad_request("type and message are required");
    }

    let now = Utc::now();
    let mut session_id = non_empty(payload.session_id);
    if payload.kind == "job_start" && session_id.is_none() {
        session_id = Some(generate_session_id(now));
    }

    let entry = NewActivity {
        kind: payload.kind,
        message: payload.message,
        details: payload.details,
        metadata: payload.metadata,
        session_id,
        job_name: payload.job_name,
    };
    match state.store.log_activity(entry, now).await {
        Ok(created) => (StatusCode::CREATED, Json(created)).into_response(),
        Err(e) => internal_error("Failed to create activity log entry", e),
    }
}

#[derive(Deserialize, Default)]
pub struct PageParams {
    limit: Option<i64>,
    offset: Option<i64>,
}

pub async fn get_sessions(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> Response {
    let limit = params.limit.unwrap_or(DEFAULT_SESSION_PAGE_SIZE).max(0);
    let offset = params.offset.unwrap_or(0).max(0);
    match state.store.list_activity_sessions(limit, offset).await {
        Ok((sessions, total)) => Json(serde_json::json!({
            "sessions": sessions,
            "total": total,
            "limit": limit,
            "offset": offset,
        }))
        .into_response(),
        Err(e) => internal_error("Failed to fetch activity sessions", e),
    }
}
