use axum::{
    Router,
    body::Body,
    http::{HeaderValue, Method, Request, header},
    middleware,
    middleware::Next,
    routing::get,
};
use tower_http::cors::CorsLayer;

use super::AppState;
use super::handlers::{activity, calendar, heartbeat, jobs, notes, status, sync, tasks};

fn build_localhost_cors(api_port: u16) -> CorsLayer {
    let origins: Vec<HeaderValue> = [
        format!("http://127.0.0.1:{}", api_port),
        format!("http://localhost:{}", api_port),
        "http://127.0.0.1:3000".to_string(),
        "http://localhost:3000".to_string(),
    ]
    .iter()
    .filter_map(|o| o.parse().ok())
    .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::OPTIONS,
        ])
        .allow_headers(tower_http::cors::Any)
}

pub fn build_api_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/status",
            get(status::get_status)
                .post(status::update_status)
                .put(status::status_heartbeat),
        )
        .route(
            "/api/heartbeat",
            get(heartbeat::get_heartbeat).post(heartbeat::post_heartbeat),
        )
        .route(
            "/api/activity",
            get(activity::get_activity).post(activity::post_activity),
        )
        .route("/api/activity/sessions", get(activity::get_sessions))
        .route(
            "/api/notes",
            get(notes::get_notes)
                .post(notes::create_note)
                .put(notes::mark_note_seen),
        )
        .route("/api/jobs", get(jobs::get_jobs).put(jobs::toggle_job))
        .route("/api/tasks", get(tasks::get_tasks).put(tasks::upsert_tasks))
        .route("/api/tasks/board", get(tasks::get_board))
        .route(
            "/api/calendar",
            get(calendar::get_calendar).put(calendar::upsert_events),
        )
        .route("/api/sync", get(sync::run_sync).post(sync::run_sync))
        .route("/api/logs", get(super::sse_logs_endpoint))
        .layer(middleware::from_fn(security_headers))
        .layer(build_localhost_cors(state.api_port))
        .with_state(state)
}

async fn security_headers(req: Request<Body>, next: Next) -> axum::response::Response {
    let mut response = next.run(req).await;
    let headers = response.headers_mut();
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::gateway::GatewayClient;
    use crate::core::store::DashboardStore;
    use crate::core::sync::SyncService;
    use axum::http::StatusCode;
    use serde_json::{Value, json};
    use std::sync::Arc;
    use std::time::Duration;
    use tower::util::ServiceExt;

    fn test_state() -> AppState {
        let store = Arc::new(DashboardStore::open_in_memory().unwrap());
        // Nothing listens on port 1, so every gateway call fails fast.
        let gateway =
            Arc::new(GatewayClient::new("http://127.0.0.1:1", "", Duration::from_secs(1)).unwrap());
        let sync = Arc::new(SyncService::new(
            gateway,
            store.clone(),
            chrono::TimeDelta::seconds(10),
        ));
        let (log_tx, _) = tokio::sync::broadcast::channel(16);
        AppState {
            store,
            sync,
            log_tx,
            api_port: 17900,
        }
    }

    async fn json_request(
        app: Router,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let body = match body {
            Some(json) => Body::from(serde_json::to_string(&json).unwrap()),
            None => Body::empty(),
        };

        let req = Request::builder()
            .method(method)
            .uri(path)
            .header("content-type", "application/json")
            .body(body)
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        let status = resp.status();
        let body_bytes = axum::body::to_bytes(resp.into_body(), 1024 * 1024)
            .await
            .unwrap();
        let json: Value = serde_json::from_slice(&body_bytes).unwrap_or(json!({}));
        (status, json)
    }

    #[tokio::test]
    async fn security_headers_present_on_responses() {
        let app = build_api_router(test_state());
        let req = Request::builder()
            .method(Method::GET)
            .uri("/api/status")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();

        assert_eq!(
            resp.headers().get("x-content-type-options").unwrap(),
            "nosniff"
        );
        assert_eq!(resp.headers().get("x-frame-options").unwrap(), "DENY");
    }

    #[tokio::test]
    async fn status_is_offline_before_first_write() {
        let app = build_api_router(test_state());
        let (status, json) = json_request(app, Method::GET, "/api/status", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "offline");
        assert_eq!(json["uptime"], 0);
        assert_eq!(json["subAgents"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn operator_status_write_is_served_back() {
        let state = test_state();
        let (status, json) = json_request(
            build_api_router(state.clone()),
            Method::POST,
            "/api/status",
            Some(json!({
                "status": "working",
                "currentTask": "Drafting the weekly report",
                "subAgents": [
                    { "id": "a1", "name": "research", "task": "sources", "status": "running" }
                ]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "working");

        let (_, json) = json_request(build_api_router(state.clone()), Method::GET, "/api/status", None).await;
        assert_eq!(json["currentTask"], "Drafting the weekly report");
        assert_eq!(json["subAgents"][0]["name"], "research");

        // Explicit null clears the task; absent status keeps it.
        let (_, json) = json_request(
            build_api_router(state),
            Method::POST,
            "/api/status",
            Some(json!({ "currentTask": null })),
        )
        .await;
        assert_eq!(json["status"], "working");
        assert_eq!(json["currentTask"], Value::Null);
    }

    #[tokio::test]
    async fn unknown_status_is_rejected() {
        let app = build_api_router(test_state());
        let (status, json) = json_request(
            app,
            Method::POST,
            "/api/status",
            Some(json!({ "status": "napping" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].as_str().unwrap().contains("napping"));
    }

    #[tokio::test]
    async fn status_put_records_heartbeat() {
        let state = test_state();
        let (status, json) =
            json_request(build_api_router(state.clone()), Method::PUT, "/api/status", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);

        let (_, json) = json_request(build_api_router(state), Method::GET, "/api/status", None).await;
        assert_eq!(json["status"], "idle");
    }

    #[tokio::test]
    async fn heartbeat_returns_pending_work() {
        let state = test_state();
        let today = chrono::Utc::now().date_naive();
        state
            .store
            .create_note("water the plants", None, &["Buddy".to_string()], chrono::Utc::now())
            .await
            .unwrap();
        json_request(
            build_api_router(state.clone()),
            Method::PUT,
            "/api/calendar",
            Some(json!([{ "id": "e1", "name": "Dentist", "date": today.format("%Y-%m-%d").to_string() }])),
        )
        .await;
        json_request(
            build_api_router(state.clone()),
            Method::PUT,
            "/api/tasks",
            Some(json!([
                { "id": "t1", "title": "Pay rent", "status": "todo", "important": true, "urgent": true },
                { "id": "t2", "title": "Someday", "status": "inbox" }
            ])),
        )
        .await;

        let (status, json) = json_request(
            build_api_router(state.clone()),
            Method::POST,
            "/api/heartbeat",
            Some(json!({ "metadata": { "model": "local" } })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
        assert_eq!(json["data"]["counts"]["unseenNotes"], 1);
        assert_eq!(json["data"]["counts"]["todayEvents"], 1);
        assert_eq!(json["data"]["counts"]["urgentTasks"], 1);
        assert_eq!(json["data"]["urgentTasks"][0]["id"], "t1");

        let (_, json) = json_request(
            build_api_router(state.clone()),
            Method::GET,
            "/api/activity?type=heartbeat",
            None,
        )
        .await;
        assert_eq!(json["total"], 1);
        assert_eq!(json["entries"][0]["message"], "Heartbeat: all systems nominal");

        let (status, json) =
            json_request(build_api_router(state), Method::GET, "/api/heartbeat", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["healthy"], true);
        assert_eq!(json["botStatus"], "idle");
    }

    #[tokio::test]
    async fn activity_requires_type_and_message() {
        let app = build_api_router(test_state());
        let (status, json) = json_request(
            app,
            Method::POST,
            "/api/activity",
            Some(json!({ "type": "job_start" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "type and message are required");
    }

    #[tokio::test]
    async fn job_start_gets_generated_session() {
        let state = test_state();
        let (status, json) = json_request(
            build_api_router(state.clone()),
            Method::POST,
            "/api/activity",
            Some(json!({ "type": "job_start", "message": "Nightly digest", "jobName": "digest" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let session = json["sessionId"].as_str().unwrap().to_string();
        assert!(session.starts_with("session_"));

        json_request(
            build_api_router(state.clone()),
            Method::POST,
            "/api/activity",
            Some(json!({ "type": "task_completed", "message": "done", "sessionId": session })),
        )
        .await;

        let (_, json) = json_request(
            build_api_router(state),
            Method::GET,
            "/api/activity/sessions",
            None,
        )
        .await;
        assert_eq!(json["total"], 1);
        assert_eq!(json["sessions"][0]["entryCount"], 2);
        assert_eq!(json["sessions"][0]["jobName"], "digest");
        assert_eq!(json["limit"], 20);
    }

    #[tokio::test]
    async fn activity_rejects_malformed_date() {
        let app = build_api_router(test_state());
        let (status, _) =
            json_request(app, Method::GET, "/api/activity?date=30.01.2026", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn notes_create_list_and_mark_seen() {
        let state = test_state();
        let (status, _) = json_request(
            build_api_router(state.clone()),
            Method::POST,
            "/api/notes",
            Some(json!({ "content": "  " })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, created) = json_request(
            build_api_router(state.clone()),
            Method::POST,
            "/api/notes",
            Some(json!({ "content": "Book flights" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["tags"], json!(["Buddy"]));
        assert_eq!(created["seenByBot"], false);

        let (status, _) = json_request(
            build_api_router(state.clone()),
            Method::PUT,
            "/api/notes",
            Some(json!({ "id": created["id"], "response": "Booked" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (_, notes) = json_request(build_api_router(state.clone()), Method::GET, "/api/notes", None).await;
        assert_eq!(notes[0]["seenByBot"], true);
        assert_eq!(notes[0]["response"], "Booked");

        let (status, _) = json_request(
            build_api_router(state),
            Method::PUT,
            "/api/notes",
            Some(json!({ "response": "?" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn job_toggle_validates_payload() {
        let state = test_state();
        let (status, _) = json_request(
            build_api_router(state.clone()),
            Method::PUT,
            "/api/jobs",
            Some(json!({ "id": "j1", "enabled": "yes" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = json_request(
            build_api_router(state.clone()),
            Method::PUT,
            "/api/jobs",
            Some(json!({ "id": "j1", "enabled": false })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, json) = json_request(build_api_router(state), Method::GET, "/api/jobs", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json.as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn task_board_groups_pushed_tasks() {
        let state = test_state();
        let (status, json) = json_request(
            build_api_router(state.clone()),
            Method::PUT,
            "/api/tasks",
            Some(json!([
                { "id": "a", "title": "File taxes", "status": "In Progress", "wichtig": true, "dringend": true },
                { "id": "b", "title": "Learn Rust", "status": "todo", "important": true },
                { "id": "c", "title": "Old", "status": "done" },
                { "id": "d", "title": "Late", "status": "todo", "dueDate": "2020-01-01" }
            ])),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["upserted"], 4);

        let (_, board) = json_request(
            build_api_router(state.clone()),
            Method::GET,
            "/api/tasks/board",
            None,
        )
        .await;
        assert_eq!(board["do-now"][0]["id"], "a");
        assert_eq!(board["deep-work"][0]["id"], "b");
        assert_eq!(board["overdue"][0]["id"], "d");
        assert_eq!(board["low"].as_array().unwrap().len(), 0);

        let (_, tasks) = json_request(build_api_router(state), Method::GET, "/api/tasks", None).await;
        assert_eq!(tasks.as_array().unwrap().len(), 4);
        assert_eq!(tasks[0]["priority"], "urgent");
    }

    #[tokio::test]
    async fn calendar_window_and_today_filter() {
        let state = test_state();
        let today = chrono::Utc::now().date_naive();
        let fmt = |d: chrono::NaiveDate| d.format("%Y-%m-%d").to_string();
        json_request(
            build_api_router(state.clone()),
            Method::PUT,
            "/api/calendar",
            Some(json!([
                { "id": "e1", "name": "Standup", "date": fmt(today), "time": "09:00" },
                { "id": "e2", "name": "Trip", "date": fmt(today + chrono::TimeDelta::days(3)), "type": "Travel" }
            ])),
        )
        .await;

        let (_, events) = json_request(build_api_router(state.clone()), Method::GET, "/api/calendar", None).await;
        assert_eq!(events.as_array().unwrap().len(), 2);
        assert_eq!(events[0]["isToday"], true);
        assert_eq!(events[1]["upcomingInDays"], 3);
        assert_eq!(events[1]["type"], "Travel");

        let (_, events) = json_request(
            build_api_router(state.clone()),
            Method::GET,
            "/api/calendar?today=true",
            None,
        )
        .await;
        assert_eq!(events.as_array().unwrap().len(), 1);

        let (_, events) = json_request(
            build_api_router(state),
            Method::GET,
            "/api/calendar?days=1",
            None,
        )
        .await;
        assert_eq!(events.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn calendar_with_huge_days_still_answers() {
        let state = test_state();
        let today = chrono::Utc::now().date_naive();
        json_request(
            build_api_router(state.clone()),
            Method::PUT,
            "/api/calendar",
            Some(json!([{ "id": "e1", "name": "Standup", "date": today.format("%Y-%m-%d").to_string() }])),
        )
        .await;

        let (status, events) = json_request(
            build_api_router(state),
            Method::GET,
            &format!("/api/calendar?days={}", i64::MAX),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(events.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn sync_against_unreachable_gateway_reports_failure() {
        let app = build_api_router(test_state());
        let (status, json) = json_request(app, Method::POST, "/api/sync", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], false);
        assert_eq!(json["jobs"]["synced"], 0);
        assert_eq!(json["status"]["status"], "offline");
    }
}
