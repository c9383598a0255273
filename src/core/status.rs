use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BotStatus {
    Idle,
    Thinking,
    Working,
    Sleeping,
    Error,
    Offline,
}

impl BotStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BotStatus::Idle => "idle",
            BotStatus::Thinking => "thinking",
            BotStatus::Working => "working",
            BotStatus::Sleeping => "sleeping",
            BotStatus::Error => "error",
            BotStatus::Offline => "offline",
        }
    }
}

impl fmt::Display for BotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BotStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "idle" => Ok(BotStatus::Idle),
            "thinking" => Ok(BotStatus::Thinking),
            "working" => Ok(BotStatus::Working),
            "sleeping" => Ok(BotStatus::Sleeping),
            "error" => Ok(BotStatus::Error),
            "offline" => Ok(BotStatus::Offline),
            other => Err(anyhow::anyhow!("unknown bot status '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubAgentStatus {
    Running,
    Completed,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubAgent {
    pub id: String,
    pub name: String,
    pub task: String,
    pub status: SubAgentStatus,
}

/// The cached singleton row describing what the bot is doing right now.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusRecord {
    pub status: BotStatus,
    pub current_task: Option<String>,
    pub sub_agents: Vec<SubAgent>,
    pub last_updated: DateTime<Utc>,
    pub last_heartbeat: DateTime<Utc>,
    pub uptime_start: DateTime<Utc>,
}

impl StatusRecord {
    /// True while the bot owns a foreground task. Blank labels do not count.
    pub fn has_foreground_task(&self) -> bool {
        self.current_task
            .as_deref()
            .is_some_and(|task| !task.trim().is_empty())
    }
}

/// Authoritative write issued by the bot itself. `None` fields are left alone;
/// `current_task: Some(None)` clears the task.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OperatorUpdate {
    pub status: Option<BotStatus>,
    pub current_task: Option<Option<String>>,
    pub sub_agents: Option<Vec<SubAgent>>,
}

/// Wire shape served to the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BotState {
    pub status: BotStatus,
    pub current_task: Option<String>,
    pub sub_agents: Vec<SubAgent>,
    pub last_activity: String,
    pub uptime: i64,
}

impl BotState {
    pub fn offline(now: DateTime<Utc>) -> Self {
        Self {
            status: BotStatus::Offline,
            current_task: None,
            sub_agents: Vec::new(),
            last_activity: now.to_rfc3339(),
            uptime: 0,
        }
    }

    pub fn from_record(record: StatusRecord, now: DateTime<Utc>) -> Self {
        let uptime = (now - record.uptime_start).num_seconds().max(0);
        Self {
            status: record.status,
            current_task: record.current_task,
            sub_agents: record.sub_agents,
            last_activity: record.last_heartbeat.to_rfc3339(),
            uptime,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn record(task: Option<&str>) -> StatusRecord {
        let t0 = Utc::now();
        StatusRecord {
            status: BotStatus::Working,
            current_task: task.map(str::to_string),
            sub_agents: Vec::new(),
            last_updated: t0,
            last_heartbeat: t0,
            uptime_start: t0,
        }
    }

    #[test]
    fn bot_status_parses_case_insensitively() {
        assert_eq!("Thinking".parse::<BotStatus>().unwrap(), BotStatus::Thinking);
        assert_eq!(" offline ".parse::<BotStatus>().unwrap(), BotStatus::Offline);
        assert!("napping".parse::<BotStatus>().is_err());
    }

    #[test]
    fn bot_status_serializes_lowercase() {
        let json = serde_json::to_string(&BotStatus::Sleeping).unwrap();
        assert_eq!(json, "\"sleeping\"");
    }

    #[test]
    fn blank_task_is_not_a_foreground_task() {
        assert!(!record(None).has_foreground_task());
        assert!(!record(Some("   ")).has_foreground_task());
        assert!(record(Some("audit")).has_foreground_task());
    }

    #[test]
    fn bot_state_reports_uptime_from_uptime_start() {
        let mut rec = record(None);
        let now = rec.uptime_start + Duration::seconds(90);
        rec.last_heartbeat = now;
        let state = BotState::from_record(rec, now);
        assert_eq!(state.uptime, 90);
        assert_eq!(state.last_activity, now.to_rfc3339());
    }

    #[test]
    fn bot_state_uses_camel_case_keys() {
        let state = BotState::offline(Utc::now());
        let value = serde_json::to_value(&state).unwrap();
        assert_eq!(value["status"], "offline");
        assert!(value.get("currentTask").is_some());
        assert!(value.get("subAgents").is_some());
        assert!(value.get("lastActivity").is_some());
    }
}
