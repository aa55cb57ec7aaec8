use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{inbox::insert_inbox_row, reminders::insert_reminder_row};
use crate::db::{
    connection::Database,
    helpers::{parse_datetime, parse_optional_datetime, to_i64, to_u64},
    models::{FocusDumpItem, FocusSession, FocusSourceKind, InboxItem, Reminder},
};

const SESSION_COLUMNS: &str = "id, focus_title, focus_start_step, duration_seconds, created_at, started_at, ended_at, is_active, source_kind, source_id, completed_logged_at";

fn row_to_focus_session(row: &Row) -> Result<FocusSession> {
    let duration_seconds: i64 = row.get("duration_seconds")?;
    let created_at: String = row.get("created_at")?;
    let started_at: Option<String> = row.get("started_at")?;
    let ended_at: Option<String> = row.get("ended_at")?;
    let source_kind: Option<String> = row.get("source_kind")?;
    let completed_logged_at: Option<String> = row.get("completed_logged_at")?;

    Ok(FocusSession {
        id: row.get("id")?,
        focus_title: row.get("focus_title")?,
        focus_start_step: row.get("focus_start_step")?,
        duration_seconds: to_u64(duration_seconds, "duration_seconds")?,
        created_at: parse_datetime(&created_at, "created_at")?,
        started_at: parse_optional_datetime(started_at, "started_at")?,
        ended_at: parse_optional_datetime(ended_at, "ended_at")?,
        is_active: row.get("is_active")?,
        source_kind: source_kind
            .as_deref()
            .map(FocusSourceKind::parse)
            .transpose()?,
        source_id: row.get("source_id")?,
        completed_logged_at: parse_optional_datetime(completed_logged_at, "completed_logged_at")?,
    })
}

fn row_to_focus_dump(row: &Row) -> Result<FocusDumpItem> {
    let created_at: String = row.get("created_at")?;
    Ok(FocusDumpItem {
        id: row.get("id")?,
        session_id: row.get("session_id")?,
        text: row.get("text")?,
        created_at: parse_datetime(&created_at, "created_at")?,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionWrite {
    AlreadyLogged,
    /// `source_found` is false when the inbox item or reminder was already gone.
    Recorded { source_found: bool },
}

fn insert_session_row(conn: &Connection, record: &FocusSession) -> Result<()> {
    conn.execute(
        "INSERT INTO focus_sessions (id, focus_title, focus_start_step, duration_seconds, created_at, started_at, ended_at, is_active, source_kind, source_id, completed_logged_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            record.id,
            record.focus_title,
            record.focus_start_step,
            to_i64(record.duration_seconds)?,
            record.created_at.to_rfc3339(),
            record.started_at.map(|dt| dt.to_rfc3339()),
            record.ended_at.map(|dt| dt.to_rfc3339()),
            record.is_active,
            record.source_kind.map(|kind| kind.as_str()),
            record.source_id,
            record.completed_logged_at.map(|dt| dt.to_rfc3339()),
        ],
    )?;
    Ok(())
}

fn update_session_row(conn: &Connection, record: &FocusSession) -> Result<usize> {
    let updated = conn.execute(
        "UPDATE focus_sessions
         SET focus_title = ?1,
             focus_start_step = ?2,
             duration_seconds = ?3,
             started_at = ?4,
             ended_at = ?5,
             is_active = ?6,
             source_kind = ?7,
             source_id = ?8,
             completed_logged_at = ?9
         WHERE id = ?10",
        params![
            record.focus_title,
            record.focus_start_step,
            to_i64(record.duration_seconds)?,
            record.started_at.map(|dt| dt.to_rfc3339()),
            record.ended_at.map(|dt| dt.to_rfc3339()),
            record.is_active,
            record.source_kind.map(|kind| kind.as_str()),
            record.source_id,
            record.completed_logged_at.map(|dt| dt.to_rfc3339()),
            record.id,
        ],
    )?;
    Ok(updated)
}

fn delete_dump_row(conn: &Connection, dump_id: &str) -> Result<()> {
    let deleted = conn.execute("DELETE FROM focus_dump_items WHERE id = ?1", params![dump_id])?;
    if deleted == 0 {
        return Err(anyhow!("focus dump item {dump_id} not found"));
    }
    Ok(())
}

impl Database {
    pub async fn insert_focus_session(&self, session: &FocusSession) -> Result<()> {
        let record = session.clone();
        self.execute(move |conn| insert_session_row(conn, &record)).await
    }

    /// Starts a session, ending any session that is still marked active.
    pub async fn start_focus_session(&self, session: &FocusSession) -> Result<()> {
        let record = session.clone();
        self.execute(move |conn| {
            let tx = conn.transaction()?;
            let now = record.created_at.to_rfc3339();
            tx.execute(
                "UPDATE focus_sessions
                 SET is_active = 0,
                     ended_at = COALESCE(ended_at, ?1)
                 WHERE is_active = 1",
                params![now],
            )?;
            tx.execute(
                "INSERT INTO focus_sessions (id, focus_title, focus_start_step, duration_seconds, created_at, started_at, ended_at, is_active, source_kind, source_id, completed_logged_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, NULL, 1, ?7, ?8, NULL)",
                params![
                    record.id,
                    record.focus_title,
                    record.focus_start_step,
                    to_i64(record.duration_seconds)?,
                    record.created_at.to_rfc3339(),
                    record.started_at.map(|dt| dt.to_rfc3339()),
                    record.source_kind.map(|kind| kind.as_str()),
                    record.source_id,
                ],
            )?;
            tx.commit()?;
            Ok(())
        })
        .await
    }

    pub async fn update_focus_session(&self, session: &FocusSession) -> Result<()> {
        let record = session.clone();
        self.execute(move |conn| {
            if update_session_row(conn, &record)? == 0 {
                return Err(anyhow!("focus session {} not found", record.id));
            }
            Ok(())
        })
        .await
    }

    /// Writes a completed session and completes its source task in one
    /// transaction. A session already marked complete is left untouched.
    pub async fn record_completion(&self, session: &FocusSession) -> Result<CompletionWrite> {
        let record = session.clone();
        self.execute(move |conn| {
            let tx = conn.transaction()?;

            let existing: Option<Option<String>> = tx
                .query_row(
                    "SELECT completed_logged_at FROM focus_sessions WHERE id = ?1",
                    params![record.id],
                    |row| row.get(0),
                )
                .optional()?;

            match existing {
                Some(Some(_)) => return Ok(CompletionWrite::AlreadyLogged),
                Some(None) => {
                    update_session_row(&tx, &record)?;
                }
                None => insert_session_row(&tx, &record)?,
            }

            let source_found = match (record.source_kind, record.source_id.as_deref()) {
                (Some(FocusSourceKind::Inbox), Some(id)) => {
                    tx.execute("DELETE FROM inbox_items WHERE id = ?1", params![id])? > 0
                }
                (Some(FocusSourceKind::Reminder), Some(id)) => {
                    tx.execute("UPDATE reminders SET is_done = 1 WHERE id = ?1", params![id])? > 0
                }
                _ => true,
            };

            tx.commit()?;
            Ok(CompletionWrite::Recorded { source_found })
        })
        .await
    }

    pub async fn end_focus_session(&self, session_id: &str, ended_at: DateTime<Utc>) -> Result<()> {
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            let updated = conn.execute(
                "UPDATE focus_sessions
                 SET is_active = 0,
                     ended_at = COALESCE(ended_at, ?1)
                 WHERE id = ?2",
                params![ended_at.to_rfc3339(), session_id],
            )?;
            if updated == 0 {
                return Err(anyhow!("focus session {session_id} not found"));
            }
            Ok(())
        })
        .await
    }

    pub async fn get_focus_session(&self, session_id: &str) -> Result<Option<FocusSession>> {
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SESSION_COLUMNS} FROM focus_sessions WHERE id = ?1"
            ))?;
            let mut rows = stmt.query(params![session_id])?;
            match rows.next()? {
                Some(row) => Ok(Some(row_to_focus_session(row)?)),
                None => Ok(None),
            }
        })
        .await
    }

    /// The running session, if any (active and not ended).
    pub async fn active_focus_session(&self) -> Result<Option<FocusSession>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SESSION_COLUMNS}
                 FROM focus_sessions
                 WHERE is_active = 1 AND ended_at IS NULL
                 ORDER BY created_at DESC
                 LIMIT 1"
            ))?;
            let mut rows = stmt.query([])?;
            match rows.next()? {
                Some(row) => Ok(Some(row_to_focus_session(row)?)),
                None => Ok(None),
            }
        })
        .await
    }

    /// Newest first.
    pub async fn list_focus_sessions(&self) -> Result<Vec<FocusSession>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SESSION_COLUMNS} FROM focus_sessions ORDER BY created_at DESC"
            ))?;
            let mut rows = stmt.query([])?;
            let mut sessions = Vec::new();
            while let Some(row) = rows.next()? {
                sessions.push(row_to_focus_session(row)?);
            }
            Ok(sessions)
        })
        .await
    }

    pub async fn insert_focus_dump(&self, item: &FocusDumpItem) -> Result<()> {
        let record = item.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO focus_dump_items (id, session_id, text, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    record.id,
                    record.session_id,
                    record.text,
                    record.created_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
        .await
    }

    pub async fn focus_dump_for_session(&self, session_id: &str) -> Result<Vec<FocusDumpItem>> {
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, session_id, text, created_at
                 FROM focus_dump_items
                 WHERE session_id = ?1
                 ORDER BY created_at ASC",
            )?;
            let mut rows = stmt.query(params![session_id])?;
            let mut items = Vec::new();
            while let Some(row) = rows.next()? {
                items.push(row_to_focus_dump(row)?);
            }
            Ok(items)
        })
        .await
    }

    pub async fn get_focus_dump(&self, item_id: &str) -> Result<Option<FocusDumpItem>> {
        let item_id = item_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, session_id, text, created_at FROM focus_dump_items WHERE id = ?1",
            )?;
            let mut rows = stmt.query(params![item_id])?;
            match rows.next()? {
                Some(row) => Ok(Some(row_to_focus_dump(row)?)),
                None => Ok(None),
            }
        })
        .await
    }

    pub async fn delete_focus_dump(&self, item_id: &str) -> Result<bool> {
        let item_id = item_id.to_string();
        self.execute(move |conn| {
            let deleted =
                conn.execute("DELETE FROM focus_dump_items WHERE id = ?1", params![item_id])?;
            Ok(deleted > 0)
        })
        .await
    }

    /// Replaces a dump item with an inbox item.
    pub async fn move_focus_dump_to_inbox(&self, dump_id: &str, item: &InboxItem) -> Result<()> {
        let dump_id = dump_id.to_string();
        let record = item.clone();
        self.execute(move |conn| {
            let tx = conn.transaction()?;
            delete_dump_row(&tx, &dump_id)?;
            insert_inbox_row(&tx, &record)?;
            tx.commit()?;
            Ok(())
        })
        .await
    }

    /// Replaces a dump item with a scheduled reminder.
    pub async fn move_focus_dump_to_reminder(&self, dump_id: &str, reminder: &Reminder) -> Result<()> {
        let dump_id = dump_id.to_string();
        let record = reminder.clone();
        self.execute(move |conn| {
            let tx = conn.transaction()?;
            delete_dump_row(&tx, &dump_id)?;
            insert_reminder_row(&tx, &record)?;
            tx.commit()?;
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};
    use tempfile::TempDir;

    use crate::db::{Database, FocusDumpItem, FocusSession, FocusSourceKind, InboxItem, ItemSource, Reminder};

    #[tokio::test]
    async fn starting_a_session_ends_the_previous_one() {
        let dir = TempDir::new().unwrap();
        let db = Database::new(dir.path().join("focus.sqlite3")).unwrap();
        let now = Utc.with_ymd_and_hms(2026, 1, 5, 10, 0, 0).unwrap();

        let first = FocusSession::new("Write report", "Open the doc", 1500, now);
        db.start_focus_session(&first).await.unwrap();

        let second = FocusSession::new("Taxes", "", 900, now + Duration::minutes(5))
            .with_source(FocusSourceKind::Inbox, "item-1");
        db.start_focus_session(&second).await.unwrap();

        let active = db.active_focus_session().await.unwrap().unwrap();
        assert_eq!(active.id, second.id);
        assert_eq!(active.source_kind, Some(FocusSourceKind::Inbox));
        assert_eq!(active.source_id.as_deref(), Some("item-1"));

        let previous = db.get_focus_session(&first.id).await.unwrap().unwrap();
        assert!(!previous.is_active);
        assert_eq!(previous.ended_at, Some(second.created_at));
    }

    #[tokio::test]
    async fn ending_a_session_clears_active_and_keeps_dump() {
        let dir = TempDir::new().unwrap();
        let db = Database::new(dir.path().join("focus.sqlite3")).unwrap();
        let now = Utc.with_ymd_and_hms(2026, 1, 5, 10, 0, 0).unwrap();

        let session = FocusSession::new("Deep work", "", 2700, now);
        db.start_focus_session(&session).await.unwrap();
        db.insert_focus_dump(&FocusDumpItem::new(&session.id, "buy milk", now))
            .await
            .unwrap();
        db.insert_focus_dump(&FocusDumpItem::new(
            &session.id,
            "call bank",
            now + Duration::minutes(1),
        ))
        .await
        .unwrap();

        db.end_focus_session(&session.id, now + Duration::minutes(45))
            .await
            .unwrap();
        assert!(db.active_focus_session().await.unwrap().is_none());

        let dump: Vec<String> = db
            .focus_dump_for_session(&session.id)
            .await
            .unwrap()
            .into_iter()
            .map(|item| item.text)
            .collect();
        assert_eq!(dump, vec!["buy milk", "call bank"]);
        assert_eq!(db.list_focus_sessions().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn ending_unknown_session_fails() {
        let dir = TempDir::new().unwrap();
        let db = Database::new(dir.path().join("focus.sqlite3")).unwrap();
        assert!(db.end_focus_session("missing", Utc::now()).await.is_err());
    }

    #[tokio::test]
    async fn dump_items_move_or_disappear_atomically() {
        let dir = TempDir::new().unwrap();
        let db = Database::new(dir.path().join("focus.sqlite3")).unwrap();
        let now = Utc.with_ymd_and_hms(2026, 1, 5, 10, 0, 0).unwrap();

        let session = FocusSession::new("Deep work", "", 1800, now);
        db.start_focus_session(&session).await.unwrap();
        let milk = FocusDumpItem::new(&session.id, "buy milk", now);
        let bank = FocusDumpItem::new(&session.id, "call bank", now);
        let socks = FocusDumpItem::new(&session.id, "socks", now);
        for item in [&milk, &bank, &socks] {
            db.insert_focus_dump(item).await.unwrap();
        }

        let inbox = InboxItem::new("buy milk", "Buy milk", ItemSource::App, "", 10, now);
        db.move_focus_dump_to_inbox(&milk.id, &inbox).await.unwrap();
        let reminder = Reminder::new("Call bank", "", 10, now + Duration::days(1), now);
        db.move_focus_dump_to_reminder(&bank.id, &reminder).await.unwrap();
        assert!(db.delete_focus_dump(&socks.id).await.unwrap());
        assert!(!db.delete_focus_dump(&socks.id).await.unwrap());

        assert!(db.focus_dump_for_session(&session.id).await.unwrap().is_empty());
        assert!(db.get_focus_dump(&milk.id).await.unwrap().is_none());
        assert_eq!(db.list_inbox_items().await.unwrap(), vec![inbox.clone()]);
        assert_eq!(db.list_reminders().await.unwrap(), vec![reminder]);

        // A missing dump item rolls the insert back.
        let stray = InboxItem::new("stray", "Stray", ItemSource::App, "", 10, now);
        assert!(db.move_focus_dump_to_inbox("missing", &stray).await.is_err());
        assert_eq!(db.list_inbox_items().await.unwrap(), vec![inbox]);
    }
}
