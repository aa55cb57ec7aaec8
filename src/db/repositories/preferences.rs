use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, OptionalExtension};

use crate::db::connection::Database;

impl Database {
    /// Read a string preference, `None` when the key was never written.
    pub async fn get_preference(&self, key: &str) -> Result<Option<String>> {
        let key = key.to_string();
        self.execute(move |conn| {
            let value = conn
                .query_row(
                    "SELECT value FROM preferences WHERE key = ?1",
                    params![key],
                    |row| row.get::<_, String>(0),
                )
                .optional()
                .with_context(|| format!("failed to read preference {key}"))?;
            Ok(value)
        })
        .await
    }

    pub async fn set_preference(&self, key: &str, value: &str) -> Result<()> {
        let key = key.to_string();
        let value = value.to_string();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO preferences (key, value, updated_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET
                     value = excluded.value,
                     updated_at = excluded.updated_at",
                params![key, value, Utc::now().to_rfc3339()],
            )
            .with_context(|| format!("failed to write preference {key}"))?;
            Ok(())
        })
        .await
    }

    /// Write several preferences in one transaction.
    pub async fn set_preferences(&self, entries: Vec<(String, String)>) -> Result<()> {
        self.execute(move |conn| {
            let tx = conn.transaction()?;
            let now = Utc::now().to_rfc3339();
            for (key, value) in &entries {
                tx.execute(
                    "INSERT INTO preferences (key, value, updated_at)
                     VALUES (?1, ?2, ?3)
                     ON CONFLICT(key) DO UPDATE SET
                         value = excluded.value,
                         updated_at = excluded.updated_at",
                    params![key, value, now],
                )
                .with_context(|| format!("failed to write preference {key}"))?;
            }
            tx.commit().context("failed to commit preferences")?;
            Ok(())
        })
        .await
    }

    pub async fn remove_preferences(&self, keys: &[&str]) -> Result<()> {
        let keys: Vec<String> = keys.iter().map(|key| key.to_string()).collect();
        self.execute(move |conn| {
            let tx = conn.transaction()?;
            for key in &keys {
                tx.execute("DELETE FROM preferences WHERE key = ?1", params![key])
                    .with_context(|| format!("failed to remove preference {key}"))?;
            }
            tx.commit().context("failed to commit preference removal")?;
            Ok(())
        })
        .await
    }
}
