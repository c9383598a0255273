use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::params;

use super::{DashboardStore, fmt_ts, parse_opt_ts};
use crate::core::jobs::{JobFrequency, ScheduledJob};

impl DashboardStore {
    pub async fn list_jobs(&self) -> Result<Vec<ScheduledJob>> {
        let db = self.db.lock().await;
        let mut stmt = db.prepare(
            "SELECT id, name, description, frequency, cron_expression, enabled,
                    last_run, next_run, last_status, output_folder
             FROM scheduled_jobs ORDER BY name",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, bool>(5)?,
                row.get::<_, Option<String>>(6)?,
                row.get::<_, Option<String>>(7)?,
                row.get::<_, String>(8)?,
                row.get::<_, Option<String>>(9)?,
            ))
        })?;

        let mut jobs = Vec::new();
        for row in rows {
            let (
                id,
                name,
                description,
                frequency,
                cron_expression,
                enabled,
                last_run,
                next_run,
                last_status,
                output_folder,
            ) = row?;
            jobs.push(ScheduledJob {
                id,
                name,
                description,
                frequency: JobFrequency::from_label(&frequency),
                cron_expression,
                enabled,
                last_run: parse_opt_ts(last_run)?,
                next_run: parse_opt_ts(next_run)?,
                last_status,
                output_folder,
            });
        }
        Ok(jobs)
    }

    /// Insert or refresh a job mirrored from the gateway. `output_folder` is
    /// local-only and survives the refresh.
    pub async fn upsert_job(&self, job: &ScheduledJob, at: DateTime<Utc>) -> Result<()> {
        let db = self.db.lock().await;
        db.execute(
            "INSERT INTO scheduled_jobs
                (id, name, cron_expression, frequency, enabled, description,
                 next_run, last_run, last_status, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                cron_expression = excluded.cron_expression,
                frequency = excluded.frequency,
                enabled = excluded.enabled,
                description = excluded.description,
                next_run = excluded.next_run,
                last_run = excluded.last_run,
                last_status = excluded.last_status,
                updated_at = excluded.updated_at",
            params![
                job.id,
                job.name,
                job.cron_expression,
                job.frequency.as_str(),
                job.enabled,
                job.description,
                job.next_run.map(fmt_ts),
                job.last_run.map(fmt_ts),
                job.last_status,
                fmt_ts(at)
            ],
        )?;
        Ok(())
    }

    /// Returns whether a job with this id exists.
    pub async fn set_job_enabled(&self, id: &str, enabled: bool) -> Result<bool> {
        let db = self.db.lock().await;
        let changed = db.execute(
            "UPDATE scheduled_jobs SET enabled = ?2 WHERE id = ?1",
            params![id, enabled],
        )?;
        Ok(changed > 0)
    }
}
