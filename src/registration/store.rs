//! Registration bookkeeping kept in the preferences table.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::db::Database;

const INSTALL_ID_KEY: &str = "install_id";
const TOKEN_KEY: &str = "apns_token";
const LAST_SENT_SIGNATURE_KEY: &str = "apns_last_sent_signature";
const LAST_FAILURE_SIGNATURE_KEY: &str = "apns_last_failure_signature";
const LAST_FAILURE_AT_KEY: &str = "apns_last_failure_at";

#[derive(Clone)]
pub struct RegistrationStore {
    db: Database,
}

impl RegistrationStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Created on first use and never rotated.
    pub async fn install_id(&self) -> Result<String> {
        if let Some(existing) = self.db.get_preference(INSTALL_ID_KEY).await? {
            if !existing.is_empty() {
                return Ok(existing);
            }
        }
        let fresh = Uuid::new_v4().to_string().to_lowercase();
        self.db.set_preference(INSTALL_ID_KEY, &fresh).await?;
        Ok(fresh)
    }

    pub async fn store_token(&self, token: &str) -> Result<()> {
        self.db.set_preference(TOKEN_KEY, token).await
    }

    pub async fn cached_token(&self) -> Result<Option<String>> {
        Ok(self
            .db
            .get_preference(TOKEN_KEY)
            .await?
            .filter(|token| !token.is_empty()))
    }

    pub async fn last_sent_signature(&self) -> Result<Option<String>> {
        self.db.get_preference(LAST_SENT_SIGNATURE_KEY).await
    }

    /// The last failed signature and when it failed.
    pub async fn last_failure(&self) -> Result<Option<(String, DateTime<Utc>)>> {
        let signature = self.db.get_preference(LAST_FAILURE_SIGNATURE_KEY).await?;
        let at = self.db.get_preference(LAST_FAILURE_AT_KEY).await?;
        match (signature, at) {
            (Some(signature), Some(at)) => {
                let at = DateTime::parse_from_rfc3339(&at)
                    .with_context(|| format!("invalid {LAST_FAILURE_AT_KEY}: {at}"))?
                    .with_timezone(&Utc);
                Ok(Some((signature, at)))
            }
            _ => Ok(None),
        }
    }

    /// Stores the sent signature and forgets any earlier failure.
    pub async fn record_success(&self, signature: &str) -> Result<()> {
        self.db
            .set_preference(LAST_SENT_SIGNATURE_KEY, signature)
            .await?;
        self.db
            .remove_preferences(&[LAST_FAILURE_SIGNATURE_KEY, LAST_FAILURE_AT_KEY])
            .await
    }

    pub async fn record_failure(&self, signature: &str, at: DateTime<Utc>) -> Result<()> {
        self.db
            .set_preferences(vec![
                (LAST_FAILURE_SIGNATURE_KEY.to_string(), signature.to_string()),
                (LAST_FAILURE_AT_KEY.to_string(), at.to_rfc3339()),
            ])
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn open_store() -> (TempDir, RegistrationStore) {
        let dir = TempDir::new().unwrap();
        let db = Database::new(dir.path().join("withyou.sqlite3")).unwrap();
        (dir, RegistrationStore::new(db))
    }

    #[tokio::test]
    async fn install_id_is_stable_lowercase_uuid() {
        let (_dir, store) = open_store();
        let first = store.install_id().await.unwrap();
        let second = store.install_id().await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first, first.to_lowercase());
        assert!(Uuid::parse_str(&first).is_ok());
    }

    #[tokio::test]
    async fn token_round_trips() {
        let (_dir, store) = open_store();
        assert_eq!(store.cached_token().await.unwrap(), None);
        store.store_token("abc").await.unwrap();
        assert_eq!(store.cached_token().await.unwrap().as_deref(), Some("abc"));
    }

    #[tokio::test]
    async fn success_clears_failure() {
        let (_dir, store) = open_store();
        let at = Utc.with_ymd_and_hms(2026, 2, 9, 8, 30, 0).unwrap();

        store.record_failure("sig-a", at).await.unwrap();
        assert_eq!(
            store.last_failure().await.unwrap(),
            Some(("sig-a".to_string(), at))
        );

        store.record_success("sig-a").await.unwrap();
        assert_eq!(store.last_failure().await.unwrap(), None);
        assert_eq!(
            store.last_sent_signature().await.unwrap().as_deref(),
            Some("sig-a")
        );
    }
}
