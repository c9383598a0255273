use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::core::reconcile::{ExternalStatusSnapshot, StatusSource};

// ── /tools/invoke request/response ──

#[derive(Serialize)]
struct InvokeRequest<'a> {
    tool: &'a str,
    args: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct InvokeResponse {
    #[serde(default)]
    ok: bool,
    #[serde(default)]
    result: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<InvokeError>,
}

#[derive(Deserialize)]
struct InvokeError {
    message: Option<String>,
}

// ── cron / sessions payloads ──

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayJob {
    pub id: String,
    #[serde(default)]
    pub agent_id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub enabled: bool,
    pub schedule: GatewaySchedule,
    #[serde(default)]
    pub wake_mode: Option<String>,
    #[serde(default)]
    pub payload: Option<GatewayPayload>,
    #[serde(default)]
    pub state: Option<GatewayJobState>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GatewaySchedule {
    #[serde(default)]
    pub kind: Option<String>,
    pub expr: String,
    #[serde(default)]
    pub tz: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GatewayPayload {
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayJobState {
    pub next_run_at_ms: Option<i64>,
    pub last_run_at_ms: Option<i64>,
    pub last_status: Option<String>,
    pub last_duration_ms: Option<i64>,
}

impl GatewayJob {
    pub fn next_run(&self) -> Option<DateTime<Utc>> {
        self.state
            .as_ref()
            .and_then(|s| s.next_run_at_ms)
            .and_then(DateTime::from_timestamp_millis)
    }

    pub fn last_run(&self) -> Option<DateTime<Utc>> {
        self.state
            .as_ref()
            .and_then(|s| s.last_run_at_ms)
            .and_then(DateTime::from_timestamp_millis)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewaySession {
    pub key: String,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub updated_at: Option<i64>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Deserialize)]
struct CronListResult {
    #[serde(default)]
    jobs: Vec<GatewayJob>,
}

#[derive(Deserialize)]
struct SessionsListResult {
    #[serde(default)]
    sessions: Vec<GatewaySession>,
}

/// Scheduler overview derived from the job list.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerSummary {
    pub enabled: bool,
    pub job_count: usize,
    pub next_wake: Option<DateTime<Utc>>,
}

impl SchedulerSummary {
    pub fn from_jobs(jobs: &[GatewayJob]) -> Self {
        Self {
            enabled: jobs.iter().any(|j| j.enabled),
            job_count: jobs.len(),
            next_wake: jobs
                .iter()
                .filter(|j| j.enabled)
                .filter_map(GatewayJob::next_run)
                .min(),
        }
    }
}

// ── Client ──

pub struct GatewayClient {
    base_url: String,
    token: String,
    client: Client,
}

impl GatewayClient {
    pub fn new(base_url: &str, token: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            client,
        })
    }

    async fn invoke<T: DeserializeOwned>(
        &self,
        tool: &str,
        args: Option<serde_json::Value>,
    ) -> Result<T> {
        let mut request = self
            .client
            .post(format!("{}/tools/invoke", self.base_url))
            .json(&InvokeRequest { tool, args });
        if !self.token.is_empty() {
            request = request.header("Authorization", format!("Bearer {}", self.token));
        }

        let res = request.send().await?;
        let status = res.status();
        let parsed: InvokeResponse = res
            .json()
            .await
            .map_err(|e| anyhow!("Gateway returned unreadable response ({}): {}", status, e))?;

        if !parsed.ok {
            return Err(anyhow!(
                "{}",
                parsed
                    .error
                    .and_then(|e| e.message)
                    .unwrap_or_else(|| "Tool invocation failed".to_string())
            ));
        }

        let mut result = parsed.result.unwrap_or(serde_json::Value::Null);
        let payload = match result.get_mut("details") {
            Some(details) if !details.is_null() => details.take(),
            _ => result,
        };
        Ok(serde_json::from_value(payload)?)
    }

    pub async fn list_jobs(&self) -> Result<Vec<GatewayJob>> {
        let result: CronListResult = self
            .invoke("cron", Some(serde_json::json!({ "action": "list" })))
            .await?;
        Ok(result.jobs)
    }

    pub async fn list_sessions(&self) -> Result<Vec<GatewaySession>> {
        let result: SessionsListResult = self.invoke("sessions_list", None).await?;
        Ok(result.sessions)
    }

    pub async fn scheduler_summary(&self) -> Result<SchedulerSummary> {
        let jobs = self.list_jobs().await?;
        Ok(SchedulerSummary::from_jobs(&jobs))
    }
}

#[async_trait]
impl StatusSource for GatewayClient {
    async fn snapshot(&self) -> Result<ExternalStatusSnapshot> {
        let (jobs, sessions) = tokio::try_join!(self.list_jobs(), self.list_sessions())?;
        let summary = SchedulerSummary::from_jobs(&jobs);
        Ok(ExternalStatusSnapshot {
            active_session_count: u32::try_from(sessions.len()).unwrap_or(u32::MAX),
            scheduler_enabled: summary.enabled,
        })
    }
}
