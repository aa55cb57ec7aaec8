use anyhow::{anyhow, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::{
    connection::Database,
    helpers::{parse_datetime, to_u32},
    models::{InboxItem, ItemSource},
};

const INBOX_COLUMNS: &str =
    "id, content, title, source, start_step, estimate_minutes, sort_index, created_at";

fn row_to_inbox_item(row: &Row) -> Result<InboxItem> {
    let source: String = row.get("source")?;
    let estimate_minutes: i64 = row.get("estimate_minutes")?;
    let created_at: String = row.get("created_at")?;

    Ok(InboxItem {
        id: row.get("id")?,
        content: row.get("content")?,
        title: row.get("title")?,
        source: ItemSource::parse(&source)?,
        start_step: row.get("start_step")?,
        estimate_minutes: to_u32(estimate_minutes, "estimate_minutes")?,
        sort_index: row.get("sort_index")?,
        created_at: parse_datetime(&created_at, "created_at")?,
    })
}

pub(super) fn insert_inbox_row(conn: &Connection, record: &InboxItem) -> Result<()> {
    conn.execute(
        "INSERT INTO inbox_items (id, content, title, source, start_step, estimate_minutes, sort_index, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            record.id,
            record.content,
            record.title,
            record.source.as_str(),
            record.start_step,
            record.estimate_minutes,
            record.sort_index,
            record.created_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

impl Database {
    pub async fn insert_inbox_item(&self, item: &InboxItem) -> Result<()> {
        let record = item.clone();
        self.execute(move |conn| insert_inbox_row(conn, &record)).await
    }

    /// Inbox in display order: explicit `sort_index` first, then newest first.
    pub async fn list_inbox_items(&self) -> Result<Vec<InboxItem>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {INBOX_COLUMNS}
                 FROM inbox_items
                 ORDER BY sort_index IS NULL, sort_index ASC, created_at DESC"
            ))?;

            let mut rows = stmt.query([])?;
            let mut items = Vec::new();
            while let Some(row) = rows.next()? {
                items.push(row_to_inbox_item(row)?);
            }
            Ok(items)
        })
        .await
    }

    pub async fn get_inbox_item(&self, item_id: &str) -> Result<Option<InboxItem>> {
        let item_id = item_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {INBOX_COLUMNS} FROM inbox_items WHERE id = ?1"
            ))?;
            let mut rows = stmt.query(params![item_id])?;
            match rows.next()? {
                Some(row) => Ok(Some(row_to_inbox_item(row)?)),
                None => Ok(None),
            }
        })
        .await
    }

    pub async fn update_inbox_item(&self, item: &InboxItem) -> Result<()> {
        let record = item.clone();
        self.execute(move |conn| {
            let updated = conn.execute(
                "UPDATE inbox_items
                 SET content = ?1,
                     title = ?2,
                     start_step = ?3,
                     estimate_minutes = ?4,
                     sort_index = ?5
                 WHERE id = ?6",
                params![
                    record.content,
                    record.title,
                    record.start_step,
                    record.estimate_minutes,
                    record.sort_index,
                    record.id,
                ],
            )?;
            if updated == 0 {
                return Err(anyhow!("inbox item {} not found", record.id));
            }
            Ok(())
        })
        .await
    }

    /// Returns whether a row was removed.
    pub async fn delete_inbox_item(&self, item_id: &str) -> Result<bool> {
        let item_id = item_id.to_string();
        self.execute(move |conn| {
            let deleted = conn.execute("DELETE FROM inbox_items WHERE id = ?1", params![item_id])?;
            Ok(deleted > 0)
        })
        .await
    }

    pub async fn inbox_item_exists(&self, item_id: &str) -> Result<bool> {
        let item_id = item_id.to_string();
        self.execute(move |conn| {
            let found = conn
                .query_row(
                    "SELECT 1 FROM inbox_items WHERE id = ?1",
                    params![item_id],
                    |_| Ok(()),
                )
                .optional()?;
            Ok(found.is_some())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};
    use tempfile::TempDir;

    use crate::db::{Database, InboxItem, ItemSource};

    fn item(title: &str, minutes_ago: i64) -> InboxItem {
        let base = Utc.with_ymd_and_hms(2026, 1, 5, 10, 0, 0).unwrap();
        InboxItem::new(
            title,
            title,
            ItemSource::App,
            "Do it",
            3,
            base - Duration::minutes(minutes_ago),
        )
    }

    #[tokio::test]
    async fn lists_sorted_items_before_newest_unsorted() {
        let dir = TempDir::new().unwrap();
        let db = Database::new(dir.path().join("inbox.sqlite3")).unwrap();

        let old = item("Old", 30);
        let new = item("New", 1);
        let mut pinned = item("Pinned", 60);
        pinned.sort_index = Some(0);

        for record in [&old, &new, &pinned] {
            db.insert_inbox_item(record).await.unwrap();
        }

        let titles: Vec<String> = db
            .list_inbox_items()
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.title)
            .collect();
        assert_eq!(titles, vec!["Pinned", "New", "Old"]);
    }

    #[tokio::test]
    async fn update_and_delete_inbox_item() {
        let dir = TempDir::new().unwrap();
        let db = Database::new(dir.path().join("inbox.sqlite3")).unwrap();

        let mut record = item("Email landlord", 0);
        record.source = ItemSource::Siri;
        db.insert_inbox_item(&record).await.unwrap();

        record.title = "Email the landlord".into();
        record.estimate_minutes = 4;
        db.update_inbox_item(&record).await.unwrap();

        let stored = db.get_inbox_item(&record.id).await.unwrap().unwrap();
        assert_eq!(stored, record);

        assert!(db.delete_inbox_item(&record.id).await.unwrap());
        assert!(!db.delete_inbox_item(&record.id).await.unwrap());
        assert!(!db.inbox_item_exists(&record.id).await.unwrap());
    }

    #[tokio::test]
    async fn updating_missing_item_fails() {
        let dir = TempDir::new().unwrap();
        let db = Database::new(dir.path().join("inbox.sqlite3")).unwrap();
        assert!(db.update_inbox_item(&item("Ghost", 0)).await.is_err());
    }
}
