use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};

use crate::db::{
    connection::Database,
    helpers::{parse_datetime, parse_optional_datetime, to_u32},
    models::Reminder,
};

const REMINDER_COLUMNS: &str = "id, title, why, start_step, estimate_minutes, scheduled_at, created_at, is_started, is_done, last_checked_at";

fn row_to_reminder(row: &Row) -> Result<Reminder> {
    let estimate_minutes: i64 = row.get("estimate_minutes")?;
    let scheduled_at: String = row.get("scheduled_at")?;
    let created_at: String = row.get("created_at")?;
    let last_checked_at: Option<String> = row.get("last_checked_at")?;

    Ok(Reminder {
        id: row.get("id")?,
        title: row.get("title")?,
        why: row.get("why")?,
        start_step: row.get("start_step")?,
        estimate_minutes: to_u32(estimate_minutes, "estimate_minutes")?,
        scheduled_at: parse_datetime(&scheduled_at, "scheduled_at")?,
        created_at: parse_datetime(&created_at, "created_at")?,
        is_started: row.get("is_started")?,
        is_done: row.get("is_done")?,
        last_checked_at: parse_optional_datetime(last_checked_at, "last_checked_at")?,
    })
}

fn collect_reminders(rows: &mut rusqlite::Rows<'_>) -> Result<Vec<Reminder>> {
    let mut reminders = Vec::new();
    while let Some(row) = rows.next()? {
        reminders.push(row_to_reminder(row)?);
    }
    Ok(reminders)
}

pub(super) fn insert_reminder_row(conn: &Connection, record: &Reminder) -> Result<()> {
    conn.execute(
        "INSERT INTO reminders (id, title, why, start_step, estimate_minutes, scheduled_at, created_at, is_started, is_done, last_checked_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            record.id,
            record.title,
            record.why,
            record.start_step,
            record.estimate_minutes,
            record.scheduled_at.to_rfc3339(),
            record.created_at.to_rfc3339(),
            record.is_started,
            record.is_done,
            record.last_checked_at.map(|dt| dt.to_rfc3339()),
        ],
    )?;
    Ok(())
}

impl Database {
    pub async fn insert_reminder(&self, reminder: &Reminder) -> Result<()> {
        let record = reminder.clone();
        self.execute(move |conn| insert_reminder_row(conn, &record)).await
    }

    pub async fn update_reminder(&self, reminder: &Reminder) -> Result<()> {
        let record = reminder.clone();
        self.execute(move |conn| {
            let updated = conn.execute(
                "UPDATE reminders
                 SET title = ?1,
                     why = ?2,
                     start_step = ?3,
                     estimate_minutes = ?4,
                     scheduled_at = ?5,
                     is_started = ?6,
                     is_done = ?7,
                     last_checked_at = ?8
                 WHERE id = ?9",
                params![
                    record.title,
                    record.why,
                    record.start_step,
                    record.estimate_minutes,
                    record.scheduled_at.to_rfc3339(),
                    record.is_started,
                    record.is_done,
                    record.last_checked_at.map(|dt| dt.to_rfc3339()),
                    record.id,
                ],
            )?;
            if updated == 0 {
                return Err(anyhow!("reminder {} not found", record.id));
            }
            Ok(())
        })
        .await
    }

    pub async fn get_reminder(&self, reminder_id: &str) -> Result<Option<Reminder>> {
        let reminder_id = reminder_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {REMINDER_COLUMNS} FROM reminders WHERE id = ?1"
            ))?;
            let mut rows = stmt.query(params![reminder_id])?;
            match rows.next()? {
                Some(row) => Ok(Some(row_to_reminder(row)?)),
                None => Ok(None),
            }
        })
        .await
    }

    /// All reminders, earliest first.
    pub async fn list_reminders(&self) -> Result<Vec<Reminder>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {REMINDER_COLUMNS} FROM reminders ORDER BY scheduled_at ASC"
            ))?;
            let mut rows = stmt.query([])?;
            collect_reminders(&mut rows)
        })
        .await
    }

    /// Open reminders scheduled inside `[from, to]`, earliest first.
    pub async fn list_open_reminders_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Reminder>> {
        self.execute(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {REMINDER_COLUMNS}
                 FROM reminders
                 WHERE is_done = 0 AND scheduled_at >= ?1 AND scheduled_at <= ?2
                 ORDER BY scheduled_at ASC"
            ))?;
            let mut rows = stmt.query(params![from.to_rfc3339(), to.to_rfc3339()])?;
            collect_reminders(&mut rows)
        })
        .await
    }

    pub async fn delete_reminder(&self, reminder_id: &str) -> Result<bool> {
        let reminder_id = reminder_id.to_string();
        self.execute(move |conn| {
            let deleted = conn.execute("DELETE FROM reminders WHERE id = ?1", params![reminder_id])?;
            Ok(deleted > 0)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};
    use tempfile::TempDir;

    use crate::db::{Database, Reminder};

    #[tokio::test]
    async fn reminders_round_trip_and_sort_by_schedule() {
        let dir = TempDir::new().unwrap();
        let db = Database::new(dir.path().join("reminders.sqlite3")).unwrap();
        let now = Utc.with_ymd_and_hms(2026, 1, 5, 10, 0, 0).unwrap();

        let later = Reminder::new("Pay rent", "Open the bank app", 5, now + Duration::hours(5), now);
        let sooner = Reminder::new("Call mom", "Open Phone", 6, now + Duration::hours(1), now);
        db.insert_reminder(&later).await.unwrap();
        db.insert_reminder(&sooner).await.unwrap();

        let all = db.list_reminders().await.unwrap();
        assert_eq!(all, vec![sooner.clone(), later.clone()]);

        let window = db
            .list_open_reminders_between(now, now + Duration::hours(2))
            .await
            .unwrap();
        assert_eq!(window, vec![sooner]);
    }

    #[tokio::test]
    async fn updates_flags_and_schedule() {
        let dir = TempDir::new().unwrap();
        let db = Database::new(dir.path().join("reminders.sqlite3")).unwrap();
        let now = Utc.with_ymd_and_hms(2026, 1, 5, 10, 0, 0).unwrap();

        let mut reminder = Reminder::new("Email boss", "Open Mail", 4, now, now);
        db.insert_reminder(&reminder).await.unwrap();

        reminder.is_done = true;
        reminder.scheduled_at = now + Duration::minutes(10);
        reminder.last_checked_at = Some(now);
        db.update_reminder(&reminder).await.unwrap();

        let stored = db.get_reminder(&reminder.id).await.unwrap().unwrap();
        assert_eq!(stored, reminder);

        let open = db
            .list_open_reminders_between(now, now + Duration::hours(1))
            .await
            .unwrap();
        assert!(open.is_empty());

        assert!(db.delete_reminder(&reminder.id).await.unwrap());
        assert!(db.get_reminder(&reminder.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn open_window_is_inclusive_and_skips_done() {
        let dir = TempDir::new().unwrap();
        let db = Database::new(dir.path().join("reminders.sqlite3")).unwrap();
        let now = Utc.with_ymd_and_hms(2026, 1, 5, 10, 0, 0).unwrap();

        let edge = Reminder::new("Edge", "x", 5, now + Duration::hours(6), now);
        let early = Reminder::new("Early", "x", 5, now + Duration::hours(1), now);
        let later = Reminder::new("Later", "x", 5, now + Duration::hours(7), now);
        let past = Reminder::new("Past", "x", 5, now - Duration::minutes(1), now);
        let mut done = Reminder::new("Done", "x", 5, now + Duration::hours(2), now);
        done.is_done = true;
        for reminder in [&edge, &early, &later, &past, &done] {
            db.insert_reminder(reminder).await.unwrap();
        }

        let open = db
            .list_open_reminders_between(now, now + Duration::hours(6))
            .await
            .unwrap();
        let titles: Vec<&str> = open.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["Early", "Edge"]);
    }
}
