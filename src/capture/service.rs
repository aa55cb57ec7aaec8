//! Files a capture: into the running focus session's dump, as a scheduled
//! reminder, or into the inbox.

use std::sync::Arc;

use anyhow::{bail, Result};
use chrono::{DateTime, Local, Utc};
use serde::Serialize;

use super::CaptureParser;
use crate::{
    db::{Database, FocusDumpItem, InboxItem, ItemSource, Reminder},
    log_info,
    profiles::ProfileStore,
    reminders::{reminder_notification, NotificationRequest},
    utils::time::local_to_utc,
};

const ENABLE_LOGS: bool = true;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureMode {
    /// Schedule when a time is detected, otherwise inbox.
    Smart,
    /// Never schedule.
    InboxOnly,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum CaptureOutcome {
    FocusDump { item: FocusDumpItem },
    Scheduled { reminder: Reminder, notification: NotificationRequest },
    Inbox { item: InboxItem },
}

impl CaptureOutcome {
    /// Short confirmation suitable for a voice or toast reply.
    pub fn confirmation(&self) -> String {
        match self {
            CaptureOutcome::FocusDump { .. } => "Captured. Keep focusing.".to_string(),
            CaptureOutcome::Scheduled { reminder, .. } => format!(
                "Scheduled for {}.",
                reminder
                    .scheduled_at
                    .with_timezone(&Local)
                    .format("%b %-d, %Y at %-I:%M %p")
            ),
            CaptureOutcome::Inbox { .. } => "Saved to Inbox.".to_string(),
        }
    }
}

#[derive(Clone)]
pub struct CaptureService {
    pub(super) db: Database,
    pub(super) profiles: Arc<ProfileStore>,
    pub(super) parser: CaptureParser,
}

impl CaptureService {
    pub fn new(db: Database, profiles: Arc<ProfileStore>) -> Self {
        Self {
            db,
            profiles,
            parser: CaptureParser::new(),
        }
    }

    pub async fn capture(
        &self,
        text: &str,
        source: ItemSource,
        mode: CaptureMode,
    ) -> Result<CaptureOutcome> {
        self.capture_at(text, source, mode, Local::now()).await
    }

    pub async fn capture_at(
        &self,
        text: &str,
        source: ItemSource,
        mode: CaptureMode,
        now: DateTime<Local>,
    ) -> Result<CaptureOutcome> {
        if text.trim().is_empty() {
            bail!("capture text is empty");
        }

        let profile = self.profiles.ensure_default_profile()?;
        let now_utc = now.with_timezone(&Utc);

        if profile.route_captures_to_focus_dump {
            if let Some(session) = self.db.active_focus_session().await? {
                let item = FocusDumpItem::new(&session.id, text, now_utc);
                self.db.insert_focus_dump(&item).await?;
                log_info!("Capture routed to focus dump of session {}", session.id);
                return Ok(CaptureOutcome::FocusDump { item });
            }
        }

        let parsed = self.parser.parse(text, Some(&profile), now.naive_local());

        let scheduled_at = match mode {
            CaptureMode::Smart => parsed.scheduled_at.and_then(local_to_utc),
            CaptureMode::InboxOnly => None,
        };

        if let Some(when) = scheduled_at {
            let reminder = Reminder::new(
                &parsed.title,
                &parsed.start_step,
                parsed.estimate_minutes,
                when,
                now_utc,
            );
            self.db.insert_reminder(&reminder).await?;
            let notification = reminder_notification(&reminder);
            log_info!("Capture scheduled as reminder {} at {}", reminder.id, when);
            return Ok(CaptureOutcome::Scheduled {
                reminder,
                notification,
            });
        }

        let item = InboxItem::new(
            text,
            &parsed.title,
            source,
            &parsed.start_step,
            parsed.estimate_minutes,
            now_utc,
        );
        self.db.insert_inbox_item(&item).await?;
        log_info!("Capture saved to inbox as {}", item.id);
        Ok(CaptureOutcome::Inbox { item })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::FocusSession;
    use chrono::{NaiveDate, TimeZone};
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        db: Database,
        profiles: Arc<ProfileStore>,
        service: CaptureService,
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let db = Database::new(dir.path().join("capture.sqlite3")).unwrap();
        let profiles = Arc::new(ProfileStore::new(dir.path().join("profiles.json")).unwrap());
        let service = CaptureService::new(db.clone(), profiles.clone());
        Fixture {
            _dir: dir,
            db,
            profiles,
            service,
        }
    }

    fn local(y: i32, m: u32, d: u32, h: u32) -> DateTime<Local> {
        let naive = NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap();
        Local.from_local_datetime(&naive).earliest().unwrap()
    }

    #[tokio::test]
    async fn timed_capture_becomes_reminder() {
        let fx = fixture();
        let outcome = fx
            .service
            .capture_at(
                "remind me to call the dentist tomorrow morning",
                ItemSource::Siri,
                CaptureMode::Smart,
                local(2026, 1, 5, 10),
            )
            .await
            .unwrap();

        let CaptureOutcome::Scheduled { reminder, notification } = outcome else {
            panic!("expected a scheduled reminder");
        };
        assert_eq!(reminder.title, "Call the dentist tomorrow morning");
        assert_eq!(
            reminder.scheduled_at.with_timezone(&Local).naive_local(),
            NaiveDate::from_ymd_opt(2026, 1, 6).unwrap().and_hms_opt(9, 0, 0).unwrap()
        );
        assert_eq!(notification.identifier, reminder.id);
        assert_eq!(fx.db.list_reminders().await.unwrap(), vec![reminder]);
        assert!(fx.db.list_inbox_items().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn untimed_or_inbox_only_capture_goes_to_inbox() {
        let fx = fixture();
        let now = local(2026, 1, 5, 10);

        let outcome = fx
            .service
            .capture_at("pay the electric bill", ItemSource::App, CaptureMode::Smart, now)
            .await
            .unwrap();
        assert!(matches!(outcome, CaptureOutcome::Inbox { .. }));
        assert_eq!(outcome.confirmation(), "Saved to Inbox.");

        let outcome = fx
            .service
            .capture_at("read tonight", ItemSource::Widget, CaptureMode::InboxOnly, now)
            .await
            .unwrap();
        let CaptureOutcome::Inbox { item } = outcome else {
            panic!("expected an inbox item");
        };
        assert_eq!(item.content, "read tonight");
        assert_eq!(item.source, ItemSource::Widget);

        assert_eq!(fx.db.list_inbox_items().await.unwrap().len(), 2);
        assert!(fx.db.list_reminders().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn active_focus_session_receives_captures() {
        let fx = fixture();
        let now = local(2026, 1, 5, 10);
        let session = FocusSession::new("Deep work", "", 1800, now.with_timezone(&Utc));
        fx.db.start_focus_session(&session).await.unwrap();

        let outcome = fx
            .service
            .capture_at("email Sam tomorrow at 3pm", ItemSource::Siri, CaptureMode::Smart, now)
            .await
            .unwrap();
        assert!(matches!(outcome, CaptureOutcome::FocusDump { .. }));
        assert_eq!(outcome.confirmation(), "Captured. Keep focusing.");
        assert_eq!(fx.db.focus_dump_for_session(&session.id).await.unwrap().len(), 1);

        // Routing off: the capture is parsed and scheduled as usual.
        let mut profile = fx.profiles.ensure_default_profile().unwrap();
        profile.route_captures_to_focus_dump = false;
        fx.profiles.upsert_profile(profile).unwrap();

        let outcome = fx
            .service
            .capture_at("email Sam tomorrow at 3pm", ItemSource::Siri, CaptureMode::Smart, now)
            .await
            .unwrap();
        assert!(matches!(outcome, CaptureOutcome::Scheduled { .. }));
    }

    #[tokio::test]
    async fn blank_capture_is_rejected() {
        let fx = fixture();
        let result = fx
            .service
            .capture_at("  \n ", ItemSource::App, CaptureMode::Smart, local(2026, 1, 5, 10))
            .await;
        assert!(result.is_err());
    }
}
