use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::params;

use super::types::{ActivityEntry, ActivityQuery, ActivitySession, NewActivity};
use super::{DashboardStore, fmt_ts, parse_ts};

/// Raw row before timestamp parsing.
type ActivityRow = (
    String,
    String,
    String,
    Option<String>,
    Option<String>,
    Option<String>,
    String,
);

fn into_entry(row: ActivityRow) -> Result<ActivityEntry> {
    let (id, kind, message, details, session_id, job_name, timestamp) = row;
    Ok(ActivityEntry {
        id,
        kind,
        message,
        details,
        session_id,
        job_name,
        timestamp: parse_ts(&timestamp)?,
    })
}

impl DashboardStore {
    pub async fn log_activity(&self, entry: NewActivity, at: DateTime<Utc>) -> Result<ActivityEntry> {
        let id = uuid::Uuid::new_v4().to_string();
        let metadata = entry.metadata.as_ref().map(|m| m.to_string());
        let db = self.db.lock().await;
        db.execute(
            "INSERT INTO activity_log (id, type, message, details, metadata, session_id, job_name, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                id,
                entry.kind,
                entry.message,
                entry.details,
                metadata,
                entry.session_id,
                entry.job_name,
                fmt_ts(at)
            ],
        )?;

        Ok(ActivityEntry {
            id,
            kind: entry.kind,
            message: entry.message,
            details: entry.details,
            session_id: entry.session_id,
            job_name: entry.job_name,
            timestamp: parse_ts(&fmt_ts(at))?,
        })
    }

    /// Newest first. Returns the page and the total matching the filters.
    pub async fn list_activity(&self, query: &ActivityQuery) -> Result<(Vec<ActivityEntry>, i64)> {
        let date = query.date.map(|d| d.format("%Y-%m-%d").to_string());
        let db = self.db.lock().await;

        // NULL filters match everything.
        let filter = "(?1 IS NULL OR type = ?1)
             AND (?2 IS NULL OR session_id = ?2)
             AND (?3 IS NULL OR substr(timestamp, 1, 10) = ?3)";

        let total: i64 = db.query_row(
            &format!("SELECT COUNT(*) FROM activity_log WHERE {}", filter),
            params![query.kind, query.session_id, date],
            |row| row.get(0),
        )?;

        let mut stmt = db.prepare(&format!(
            "SELECT id, type, message, details, session_id, job_name, timestamp
             FROM activity_log WHERE {}
             ORDER BY timestamp DESC
             LIMIT ?4 OFFSET ?5",
            filter
        ))?;
        let rows = stmt.query_map(
            params![
                query.kind,
                query.session_id,
                date,
                query.limit,
                query.offset
            ],
            |row| -> rusqlite::Result<ActivityRow> {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                    row.get(6)?,
                ))
            },
        )?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(into_entry(row?)?);
        }
        Ok((entries, total))
    }

    /// Activity grouped by session, most recently active first.
    pub async fn list_activity_sessions(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<ActivitySession>, i64)> {
        let db = self.db.lock().await;
        let total: i64 = db.query_row(
            "SELECT COUNT(DISTINCT session_id) FROM activity_log WHERE session_id IS NOT NULL",
            [],
            |row| row.get(0),
        )?;

        let mut stmt = db.prepare(
            "SELECT session_id, MAX(job_name), COUNT(*), MIN(timestamp), MAX(timestamp)
             FROM activity_log
             WHERE session_id IS NOT NULL
             GROUP BY session_id
             ORDER BY MAX(timestamp) DESC
             LIMIT ?1 OFFSET ?2",
        )?;
        let rows = stmt.query_map(params![limit, offset], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, Option<String>>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;

        let mut sessions = Vec::new();
        for row in rows {
            let (session_id, job_name, entry_count, started_at, last_activity_at) = row?;
            sessions.push(ActivitySession {
                session_id,
                job_name,
                entry_count,
                started_at: parse_ts(&started_at)?,
                last_activity_at: parse_ts(&last_activity_at)?,
            });
        }
        Ok((sessions, total))
    }
}
