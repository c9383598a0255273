use anyhow::{Result, anyhow};
use chrono::{NaiveDate, TimeDelta};
use rusqlite::params;

use super::DashboardStore;
use super::types::{CalendarEvent, EventInput};

const DATE_FORMAT: &str = "%Y-%m-%d";

type EventRow = (
    String,
    Option<String>,
    String,
    String,
    Option<String>,
    String,
    String,
    Option<String>,
    Option<String>,
    Option<String>,
);

fn into_event(row: EventRow, today: NaiveDate) -> Result<CalendarEvent> {
    let (id, notion_id, name, date, time, priority, event_type, place, link, topic) = row;
    let date = NaiveDate::parse_from_str(&date, DATE_FORMAT)?;
    Ok(CalendarEvent {
        id,
        notion_id,
        name,
        date,
        time,
        priority,
        event_type,
        meeting_place: place,
        meeting_link: link,
        main_topic: topic,
        is_today: date == today,
        upcoming_in_days: (date - today).num_days(),
    })
}

/// Ten years; wider windows only risk overflowing the date range.
pub const MAX_WINDOW_DAYS: i64 = 3650;

impl DashboardStore {
    /// Events dated from `today` through `today + days`, by date then time.
    /// `days` is clamped to `0..=MAX_WINDOW_DAYS`.
    pub async fn upcoming_events(&self, today: NaiveDate, days: i64) -> Result<Vec<CalendarEvent>> {
        let span = TimeDelta::days(days.clamp(0, MAX_WINDOW_DAYS));
        let until = today
            .checked_add_signed(span)
            .ok_or_else(|| anyhow!("calendar window past {today} is out of range"))?;
        let db = self.db.lock().await;
        let mut stmt = db.prepare(
            "SELECT id, notion_id, name, event_date, event_time, priority, event_type,
                    meeting_place, meeting_link, main_topic
             FROM calendar_events
             WHERE event_date >= ?1 AND event_date <= ?2
             ORDER BY event_date ASC, event_time IS NULL, event_time ASC",
        )?;
        let rows = stmt.query_map(
            params![
                today.format(DATE_FORMAT).to_string(),
                until.format(DATE_FORMAT).to_string()
            ],
            |row| -> rusqlite::Result<EventRow> {
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
                ))
            },
        )?;

        let mut events = Vec::new();
        for row in rows {
            events.push(into_event(row?, today)?);
        }
        Ok(events)
    }

    pub async fn today_events(&self, today: NaiveDate) -> Result<Vec<CalendarEvent>> {
        self.upcoming_events(today, 0).await
    }

    pub async fn upsert_events(&self, events: Vec<EventInput>) -> Result<usize> {
        let mut db = self.db.lock().await;
        let tx = db.transaction()?;
        for event in &events {
            tx.execute(
                "INSERT INTO calendar_events
                    (id, notion_id, name, event_date, event_time, priority, event_type,
                     meeting_place, meeting_link, main_topic)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                 ON CONFLICT(id) DO UPDATE SET
                    notion_id = excluded.notion_id,
                    name = excluded.name,
                    event_date = excluded.event_date,
                    event_time = excluded.event_time,
                    priority = excluded.priority,
                    event_type = excluded.event_type,
                    meeting_place = excluded.meeting_place,
                    meeting_link = excluded.meeting_link,
                    main_topic = excluded.main_topic",
                params![
                    event.id,
                    event.notion_id,
                    event.name,
                    event.date.format(DATE_FORMAT).to_string(),
                    event.time,
                    event.priority,
                    event.event_type,
                    event.meeting_place,
                    event.meeting_link,
                    event.main_topic
                ],
            )?;
        }
        tx.commit()?;
        Ok(events.len())
    }
}
