use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::gateway::GatewayJob;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobFrequency {
    Minutely,
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Custom,
}

impl JobFrequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobFrequency::Minutely => "minutely",
            JobFrequency::Hourly => "hourly",
            JobFrequency::Daily => "daily",
            JobFrequency::Weekly => "weekly",
            JobFrequency::Monthly => "monthly",
            JobFrequency::Custom => "custom",
        }
    }

    /// Lenient inverse of `as_str`; unknown labels read back as `Custom`.
    pub fn from_label(label: &str) -> Self {
        match label {
            "minutely" => JobFrequency::Minutely,
            "hourly" => JobFrequency::Hourly,
            "daily" => JobFrequency::Daily,
            "weekly" => JobFrequency::Weekly,
            "monthly" => JobFrequency::Monthly,
            _ => JobFrequency::Custom,
        }
    }
}

/// Coarse label for a five-field cron expression, for display only.
pub fn parse_frequency(cron: &str) -> JobFrequency {
    let parts: Vec<&str> = cron.split_whitespace().collect();

    if cron.contains("*/") {
        if parts.first().is_some_and(|p| p.starts_with("*/")) {
            return JobFrequency::Minutely;
        }
        if parts.get(1).is_some_and(|p| p.starts_with("*/")) {
            return JobFrequency::Hourly;
        }
        return JobFrequency::Custom;
    }

    let [_, _, day_of_month, month, day_of_week] = parts.as_slice() else {
        return JobFrequency::Custom;
    };

    match (*day_of_month == "*", *month == "*", *day_of_week == "*") {
        (true, true, true) => JobFrequency::Daily,
        (true, true, false) => JobFrequency::Weekly,
        (false, true, true) => JobFrequency::Monthly,
        _ => JobFrequency::Custom,
    }
}

/// Row shape of `scheduled_jobs`, also served by `GET /api/jobs`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledJob {
    pub id: String,
    pub name: String,
    pub description: String,
    pub frequency: JobFrequency,
    pub cron_expression: String,
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_run: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_run: Option<DateTime<Utc>>,
    pub last_status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_folder: Option<String>,
}

impl From<&GatewayJob> for ScheduledJob {
    fn from(job: &GatewayJob) -> Self {
        Self {
            id: job.id.clone(),
            name: job.name.clone(),
            description: job
                .payload
                .as_ref()
                .and_then(|p| p.text.clone())
                .unwrap_or_default(),
            frequency: parse_frequency(&job.schedule.expr),
            cron_expression: job.schedule.expr.clone(),
            enabled: job.enabled,
            last_run: job.last_run(),
            next_run: job.next_run(),
            last_status: job
                .state
                .as_ref()
                .and_then(|s| s.last_status.clone())
                .unwrap_or_else(|| "pending".to_string()),
            output_folder: None,
        }
    }
}
