use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};

use super::{DashboardStore, fmt_ts, parse_ts};
use crate::core::reconcile::StatusStore;
use crate::core::status::{BotStatus, OperatorUpdate, StatusRecord, SubAgent};

/// Creates the singleton row in its initial `offline` state if it is missing.
fn ensure_status_row(db: &Connection, at: DateTime<Utc>) -> Result<()> {
    db.execute(
        "INSERT OR IGNORE INTO bot_status
            (id, status, current_task, sub_agents, last_heartbeat, updated_at, uptime_start)
         VALUES (1, 'offline', NULL, '[]', ?1, ?1, ?1)",
        params![fmt_ts(at)],
    )?;
    Ok(())
}

impl DashboardStore {
    pub async fn read_status(&self) -> Result<Option<StatusRecord>> {
        let db = self.db.lock().await;
        let row = db
            .query_row(
                "SELECT status, current_task, sub_agents, last_heartbeat, updated_at, uptime_start
                 FROM bot_status WHERE id = 1",
                [],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, Option<String>>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, String>(5)?,
                    ))
                },
            )
            .optional()?;

        let Some((status, current_task, sub_agents, last_heartbeat, updated_at, uptime_start)) =
            row
        else {
            return Ok(None);
        };

        let sub_agents: Vec<SubAgent> = match serde_json::from_str(&sub_agents) {
            Ok(list) => list,
            Err(e) => {
                tracing::warn!("Ignoring unreadable sub_agents column: {}", e);
                Vec::new()
            }
        };

        Ok(Some(StatusRecord {
            status: status.parse()?,
            current_task,
            sub_agents,
            last_updated: parse_ts(&updated_at)?,
            last_heartbeat: parse_ts(&last_heartbeat)?,
            uptime_start: parse_ts(&uptime_start)?,
        }))
    }

    /// Advisory write used by reconciliation. Skipped while a task is set.
    pub async fn write_derived_status(&self, status: BotStatus, at: DateTime<Utc>) -> Result<bool> {
        let db = self.db.lock().await;
        let ts = fmt_ts(at);
        let changed = db.execute(
            "INSERT INTO bot_status
                (id, status, current_task, sub_agents, last_heartbeat, updated_at, uptime_start)
             VALUES (1, ?1, NULL, '[]', ?2, ?2, ?2)
             ON CONFLICT(id) DO UPDATE SET
                status = excluded.status,
                last_heartbeat = excluded.last_heartbeat,
                updated_at = excluded.updated_at
             WHERE bot_status.current_task IS NULL OR trim(bot_status.current_task) = ''",
            params![status.as_str(), ts],
        )?;
        Ok(changed > 0)
    }

    pub async fn write_operator_status(
        &self,
        update: OperatorUpdate,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let db = self.db.lock().await;
        ensure_status_row(&db, at)?;

        let sub_agents = update
            .sub_agents
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let (set_task, task) = match update.current_task {
            Some(task) => (true, task),
            None => (false, None),
        };

        db.execute(
            "UPDATE bot_status SET
                status = COALESCE(?1, status),
                current_task = CASE WHEN ?2 THEN ?3 ELSE current_task END,
                sub_agents = COALESCE(?4, sub_agents),
                last_heartbeat = ?5,
                updated_at = ?5
             WHERE id = 1",
            params![
                update.status.map(|s| s.as_str()),
                set_task,
                task,
                sub_agents,
                fmt_ts(at)
            ],
        )?;
        Ok(())
    }

    /// Bot heartbeat: marks the bot alive and idle. Leaves the task alone.
    pub async fn heartbeat(&self, at: DateTime<Utc>) -> Result<()> {
        let db = self.db.lock().await;
        ensure_status_row(&db, at)?;
        db.execute(
            "UPDATE bot_status SET status = 'idle', last_heartbeat = ?1, updated_at = ?1 WHERE id = 1",
            params![fmt_ts(at)],
        )?;
        Ok(())
    }
}

#[async_trait]
impl StatusStore for DashboardStore {
    async fn read(&self) -> Result<Option<StatusRecord>> {
        self.read_status().await
    }

    async fn write_status(&self, status: BotStatus, at: DateTime<Utc>) -> Result<bool> {
        self.write_derived_status(status, at).await
    }

    async fn write_operator(&self, update: OperatorUpdate, at: DateTime<Utc>) -> Result<()> {
        self.write_operator_status(update, at).await
    }
}
