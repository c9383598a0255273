mod activity;
mod events;
mod jobs;
mod notes;
mod status;
mod tasks;
pub mod types;

pub use tasks::TaskBoard;

use anyhow::{Result, anyhow};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::Connection;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use crate::platform::{NativePlatform, Platform};

/// Local SQLite cache behind every dashboard endpoint.
pub struct DashboardStore {
    db: Arc<Mutex<Connection>>,
}

impl DashboardStore {
    pub async fn open<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let db_path = db_path.as_ref();
        if let Some(parent) = db_path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            tokio::fs::create_dir_all(parent).await?;
            NativePlatform::lock_down_dir(parent);
        }

        let db = Connection::open(db_path)?;
        NativePlatform::lock_down_file(db_path);
        init_schema(&db)?;
        info!("Dashboard database ready at {}", db_path.display());

        Ok(Self {
            db: Arc::new(Mutex::new(db)),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let db = Connection::open_in_memory()?;
        init_schema(&db)?;
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
        })
    }
}

fn init_schema(db: &Connection) -> Result<()> {
    db.execute_batch("PRAGMA journal_mode = WAL; PRAGMA busy_timeout = 2000;")?;

    db.execute(
        "CREATE TABLE IF NOT EXISTS bot_status (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            status TEXT NOT NULL,
            current_task TEXT,
            sub_agents TEXT NOT NULL DEFAULT '[]',
            last_heartbeat TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            uptime_start TEXT NOT NULL
        )",
        [],
    )?;

    db.execute(
        "CREATE TABLE IF NOT EXISTS activity_log (
            id TEXT PRIMARY KEY,
            type TEXT NOT NULL,
            message TEXT NOT NULL,
            details TEXT,
            metadata TEXT,
            session_id TEXT,
            job_name TEXT,
            timestamp TEXT NOT NULL
        )",
        [],
    )?;

    db.execute(
        "CREATE INDEX IF NOT EXISTS idx_activity_log_timestamp ON activity_log(timestamp)",
        [],
    )?;
    db.execute(
        "CREATE INDEX IF NOT EXISTS idx_activity_log_session ON activity_log(session_id)",
        [],
    )?;

    db.execute(
        "CREATE TABLE IF NOT EXISTS dashboard_notes (
            id TEXT PRIMARY KEY,
            notion_id TEXT,
            content TEXT NOT NULL,
            tags TEXT NOT NULL DEFAULT '[]',
            created_at TEXT NOT NULL,
            seen_at TEXT,
            seen_by_bot INTEGER NOT NULL DEFAULT 0,
            bot_response TEXT
        )",
        [],
    )?;

    db.execute(
        "CREATE TABLE IF NOT EXISTS scheduled_jobs (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            cron_expression TEXT NOT NULL,
            frequency TEXT NOT NULL,
            enabled INTEGER NOT NULL DEFAULT 1,
            description TEXT NOT NULL DEFAULT '',
            next_run TEXT,
            last_run TEXT,
            last_status TEXT NOT NULL DEFAULT 'pending',
            last_error TEXT,
            output_folder TEXT,
            updated_at TEXT NOT NULL
        )",
        [],
    )?;

    db.execute(
        "CREATE TABLE IF NOT EXISTS kanban_tasks (
            id TEXT PRIMARY KEY,
            notion_id TEXT,
            title TEXT NOT NULL,
            description TEXT,
            status TEXT NOT NULL,
            priority TEXT NOT NULL,
            important INTEGER NOT NULL DEFAULT 0,
            urgent INTEGER NOT NULL DEFAULT 0,
            due_date TEXT,
            area TEXT,
            project TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            completed_at TEXT
        )",
        [],
    )?;

    db.execute(
        "CREATE TABLE IF NOT EXISTS calendar_events (
            id TEXT PRIMARY KEY,
            notion_id TEXT,
            name TEXT NOT NULL,
            event_date TEXT NOT NULL,
            event_time TEXT,
            priority TEXT NOT NULL DEFAULT 'Medium',
            event_type TEXT NOT NULL DEFAULT 'Other',
            meeting_place TEXT,
            meeting_link TEXT,
            main_topic TEXT
        )",
        [],
    )?;

    db.execute(
        "CREATE INDEX IF NOT EXISTS idx_calendar_events_date ON calendar_events(event_date)",
        [],
    )?;

    Ok(())
}

/// Fixed-width UTC timestamps, so text comparison in SQL orders correctly.
pub(crate) fn fmt_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub(crate) fn parse_ts(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| anyhow!("invalid timestamp '{}': {}", raw, e))
}

pub(crate) fn parse_opt_ts(raw: Option<String>) -> Result<Option<DateTime<Utc>>> {
    raw.as_deref().map(parse_ts).transpose()
}
