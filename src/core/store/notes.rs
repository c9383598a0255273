use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::params;

use super::types::{DashboardNote, NOTE_DASHBOARD_TAG};
use super::{DashboardStore, fmt_ts, parse_opt_ts, parse_ts};

impl DashboardStore {
    /// Notes carrying the dashboard tag, newest first.
    pub async fn list_notes(&self) -> Result<Vec<DashboardNote>> {
        let db = self.db.lock().await;
        let mut stmt = db.prepare(
            "SELECT id, notion_id, content, tags, created_at, seen_at, seen_by_bot, bot_response
             FROM dashboard_notes
             WHERE EXISTS (SELECT 1 FROM json_each(dashboard_notes.tags) WHERE value = ?1)
             ORDER BY created_at DESC",
        )?;
        let rows = stmt.query_map(params![NOTE_DASHBOARD_TAG], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, Option<String>>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, Option<String>>(5)?,
                row.get::<_, bool>(6)?,
                row.get::<_, Option<String>>(7)?,
            ))
        })?;

        let mut notes = Vec::new();
        for row in rows {
            let (id, notion_id, content, tags, created_at, seen_at, seen_by_bot, response) = row?;
            notes.push(DashboardNote {
                id,
                notion_id,
                content,
                tags: serde_json::from_str(&tags)?,
                created_at: parse_ts(&created_at)?,
                seen_at: parse_opt_ts(seen_at)?,
                seen_by_bot,
                response,
            });
        }
        Ok(notes)
    }

    pub async fn list_unseen_notes(&self) -> Result<Vec<DashboardNote>> {
        let notes = self.list_notes().await?;
        Ok(notes.into_iter().filter(|n| !n.seen_by_bot).collect())
    }

    pub async fn create_note(
        &self,
        content: &str,
        notion_id: Option<&str>,
        tags: &[String],
        at: DateTime<Utc>,
    ) -> Result<DashboardNote> {
        let id = uuid::Uuid::new_v4().to_string();
        let db = self.db.lock().await;
        db.execute(
            "INSERT INTO dashboard_notes (id, notion_id, content, tags, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![id, notion_id, content, serde_json::to_string(tags)?, fmt_ts(at)],
        )?;

        Ok(DashboardNote {
            id,
            notion_id: notion_id.map(str::to_string),
            content: content.to_string(),
            tags: tags.to_vec(),
            created_at: parse_ts(&fmt_ts(at))?,
            seen_at: None,
            seen_by_bot: false,
            response: None,
        })
    }

    /// Marks a note as handled by the bot. `id` may be the local id or the
    /// external one. Returns whether a note matched.
    pub async fn mark_note_seen(
        &self,
        id: &str,
        response: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<bool> {
        let db = self.db.lock().await;
        let changed = db.execute(
            "UPDATE dashboard_notes
             SET seen_by_bot = 1, seen_at = ?3, bot_response = ?2
             WHERE id = ?1 OR notion_id = ?1",
            params![id, response, fmt_ts(at)],
        )?;
        Ok(changed > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    fn t0() -> DateTime<Utc> {
        parse_ts("2026-01-30T08:00:00Z").unwrap()
    }

    fn dashboard_tags() -> Vec<String> {
        vec![NOTE_DASHBOARD_TAG.to_string()]
    }

    #[tokio::test]
    async fn only_tagged_notes_are_listed_newest_first() {
        let store = DashboardStore::open_in_memory().unwrap();
        store
            .create_note("buy milk", None, &dashboard_tags(), t0())
            .await
            .unwrap();
        store
            .create_note("private", None, &["Journal".to_string()], t0())
            .await
            .unwrap();
        store
            .create_note(
                "call the bank",
                Some("n-2"),
                &dashboard_tags(),
                t0() + TimeDelta::minutes(1),
            )
            .await
            .unwrap();

        let notes = store.list_notes().await.unwrap();
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[0].content, "call the bank");
        assert_eq!(notes[0].notion_id.as_deref(), Some("n-2"));
        assert_eq!(notes[1].content, "buy milk");
    }

    #[tokio::test]
    async fn mark_seen_matches_local_or_external_id() {
        let store = DashboardStore::open_in_memory().unwrap();
        let local = store
            .create_note("first", None, &dashboard_tags(), t0())
            .await
            .unwrap();
        store
            .create_note("second", Some("n-9"), &dashboard_tags(), t0())
            .await
            .unwrap();

        let seen_at = t0() + TimeDelta::minutes(10);
        assert!(store.mark_note_seen(&local.id, Some("on it"), seen_at).await.unwrap());
        assert!(store.mark_note_seen("n-9", None, seen_at).await.unwrap());
        assert!(!store.mark_note_seen("missing", None, seen_at).await.unwrap());

        let notes = store.list_notes().await.unwrap();
        assert!(notes.iter().all(|n| n.seen_by_bot));
        let first = notes.iter().find(|n| n.id == local.id).unwrap();
        assert_eq!(first.response.as_deref(), Some("on it"));
        assert_eq!(first.seen_at, Some(seen_at));
        assert!(store.list_unseen_notes().await.unwrap().is_empty());
    }
}
