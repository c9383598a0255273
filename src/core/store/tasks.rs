use anyhow::Result;
use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use rusqlite::params;
use serde::Serialize;

use super::types::{KanbanTask, TaskInput, TaskPriority, TaskStatus};
use super::{DashboardStore, fmt_ts, parse_opt_ts, parse_ts};

/// Done tasks stay visible for this long after their last update.
const DONE_VISIBLE_DAYS: i64 = 7;

type TaskRow = (
    String,
    Option<String>,
    String,
    Option<String>,
    String,
    String,
    bool,
    bool,
    Option<String>,
    Option<String>,
    Option<String>,
    String,
    String,
    Option<String>,
);

const TASK_COLUMNS: &str = "id, notion_id, title, description, status, priority, important, urgent,
    due_date, area, project, created_at, updated_at, completed_at";

fn into_task(row: TaskRow) -> Result<KanbanTask> {
    let (
        id,
        notion_id,
        title,
        description,
        status,
        priority,
        important,
        urgent,
        due_date,
        area,
        project,
        created_at,
        updated_at,
        completed_at,
    ) = row;
    Ok(KanbanTask {
        id,
        notion_id,
        title,
        description,
        status: TaskStatus::from_label(&status),
        priority: TaskPriority::from_label(&priority),
        due_date: due_date
            .as_deref()
            .map(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d"))
            .transpose()?,
        important,
        urgent,
        project,
        area,
        created_at: parse_ts(&created_at)?,
        updated_at: parse_ts(&updated_at)?,
        completed_at: parse_opt_ts(completed_at)?,
    })
}

/// Eisenhower board. A task lands in exactly one column.
#[derive(Debug, Default, Serialize)]
pub struct TaskBoard {
    pub overdue: Vec<KanbanTask>,
    #[serde(rename = "do-now")]
    pub do_now: Vec<KanbanTask>,
    #[serde(rename = "deep-work")]
    pub deep_work: Vec<KanbanTask>,
    pub low: Vec<KanbanTask>,
}

impl TaskBoard {
    pub fn group(tasks: Vec<KanbanTask>, today: NaiveDate) -> Self {
        let mut board = TaskBoard::default();
        for task in tasks {
            if task.status == TaskStatus::Done {
                continue;
            }
            if task.is_overdue(today) {
                board.overdue.push(task);
            } else if task.important && task.urgent {
                board.do_now.push(task);
            } else if task.important {
                board.deep_work.push(task);
            } else {
                board.low.push(task);
            }
        }
        board
    }
}

impl DashboardStore {
    /// Open tasks plus recently finished ones, by priority then due date.
    pub async fn list_tasks(&self, now: DateTime<Utc>) -> Result<Vec<KanbanTask>> {
        let cutoff = fmt_ts(now - TimeDelta::days(DONE_VISIBLE_DAYS));
        let db = self.db.lock().await;
        let mut stmt = db.prepare(&format!(
            "SELECT {} FROM kanban_tasks
             WHERE status != 'done' OR updated_at >= ?1
             ORDER BY
                CASE priority
                    WHEN 'urgent' THEN 0
                    WHEN 'high' THEN 1
                    WHEN 'medium' THEN 2
                    ELSE 3
                END,
                due_date IS NULL,
                due_date ASC",
            TASK_COLUMNS
        ))?;
        let rows = stmt.query_map(params![cutoff], |row| -> rusqlite::Result<TaskRow> {
            Ok((
                row.get(0)?,
                row.get(1)?,
                row.get(2)?,
                row.get(3)?,
                row.get(4)?,
                row.get(5)?,
                row.get(6)?,
                row.get(7)?,
                row.get(8)?,
                row.get(9)?,
                row.get(10)?,
                row.get(11)?,
                row.get(12)?,
                row.get(13)?,
            ))
        })?;

        let mut tasks = Vec::new();
        for row in rows {
            tasks.push(into_task(row?)?);
        }
        Ok(tasks)
    }

    /// Tasks that need attention today: urgent, or due and not done.
    pub async fn urgent_tasks(&self, today: NaiveDate, now: DateTime<Utc>) -> Result<Vec<KanbanTask>> {
        let tasks = self.list_tasks(now).await?;
        Ok(tasks
            .into_iter()
            .filter(|t| {
                t.status != TaskStatus::Done
                    && (t.priority == TaskPriority::Urgent
                        || t.due_date.is_some_and(|due| due <= today))
            })
            .collect())
    }

    /// Returns the number of tasks written.
    pub async fn upsert_tasks(&self, tasks: Vec<TaskInput>, at: DateTime<Utc>) -> Result<usize> {
        let ts = fmt_ts(at);
        let mut db = self.db.lock().await;
        let tx = db.transaction()?;
        for task in &tasks {
            let priority = task
                .priority
                .unwrap_or_else(|| TaskPriority::from_flags(task.important, task.urgent));
            let completed_at = match (task.status, task.completed_at) {
                (_, Some(done)) => Some(fmt_ts(done)),
                (TaskStatus::Done, None) => Some(ts.clone()),
                _ => None,
            };
            tx.execute(
                "INSERT INTO kanban_tasks
                    (id, notion_id, title, description, status, priority, important, urgent,
                     due_date, area, project, created_at, updated_at, completed_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?12, ?13)
                 ON CONFLICT(id) DO UPDATE SET
                    notion_id = excluded.notion_id,
                    title = excluded.title,
                    description = excluded.description,
                    status = excluded.status,
                    priority = excluded.priority,
                    important = excluded.important,
                    urgent = excluded.urgent,
                    due_date = excluded.due_date,
                    area = excluded.area,
                    project = excluded.project,
                    updated_at = excluded.updated_at,
                    completed_at = COALESCE(kanban_tasks.completed_at, excluded.completed_at)",
                params![
                    task.id,
                    task.notion_id,
                    task.title,
                    task.description,
                    task.status.as_str(),
                    priority.as_str(),
                    task.important,
                    task.urgent,
                    task.due_date.map(|d| d.format("%Y-%m-%d").to_string()),
                    task.area,
                    task.project,
                    ts,
                    completed_at
                ],
            )?;
        }
        tx.commit()?;
        Ok(tasks.len())
    }
}
