use axum::{
    Json,
    extract::{Query, State},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::Deserialize;

use super::super::AppState;
use super::internal_error;
use crate::core::store::types::EventInput;

const DEFAULT_WINDOW_DAYS: i64 = 14;

#[derive(Deserialize, Default)]
pub struct CalendarParams {
    days: Option<i64>,
    today: Option<bool>,
}

pub async fn get_calendar(
    State(state): State<AppState>,
    Query(params): Query<CalendarParams>,
) -> Response {
    let today = Utc::now().date_naive();
    let result = if params.today.unwrap_or(false) {
        state.store.today_events(today).await
    } else {
        let days = params.days.unwrap_or(DEFAULT_WINDOW_DAYS);
        state.store.upcoming_events(today, days).await
    };

    match result {
        Ok(events) => Json(events).into_response(),
        Err(e) => internal_error("Failed to fetch calendar events", e),
    }
}

pub async fn upsert_events(
    State(state): State<AppState>,
    Json(events): Json<Vec<EventInput>>,
) -> Response {
    match state.store.upsert_events(events).await {
        Ok(count) => Json(serde_json::json!({ "success": true, "upserted": count })).into_response(),
        Err(e) => internal_error("Failed to store calendar events", e),
    }
}
