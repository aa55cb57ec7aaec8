//! Clearing the focus dump after a session: each item is filed into the
//! inbox, scheduled for tomorrow morning, or dropped.

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Local, Utc};
use serde::Serialize;

use super::CaptureService;
use crate::{
    db::{InboxItem, ItemSource, Reminder},
    log_info,
    reminders::{reminder_notification, NotificationRequest},
    utils::time::tomorrow_at,
};

const ENABLE_LOGS: bool = true;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DumpReview {
    ToInbox,
    TomorrowMorning,
    NotNeeded,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ReviewOutcome {
    Inbox { item: InboxItem },
    Scheduled { reminder: Reminder, notification: NotificationRequest },
    Discarded,
}

impl CaptureService {
    pub async fn review_dump_item(&self, dump_id: &str, review: DumpReview) -> Result<ReviewOutcome> {
        self.review_dump_item_at(dump_id, review, Local::now()).await
    }

    pub async fn review_dump_item_at(
        &self,
        dump_id: &str,
        review: DumpReview,
        now: DateTime<Local>,
    ) -> Result<ReviewOutcome> {
        let dump = self
            .db
            .get_focus_dump(dump_id)
            .await?
            .ok_or_else(|| anyhow!("focus dump item {} not found", dump_id))?;

        if review == DumpReview::NotNeeded {
            self.db.delete_focus_dump(&dump.id).await?;
            log_info!("Focus dump item {} dismissed", dump.id);
            return Ok(ReviewOutcome::Discarded);
        }

        let profile = self.profiles.ensure_default_profile()?;
        let parsed = self.parser.parse(&dump.text, Some(&profile), now.naive_local());
        let now_utc = now.with_timezone(&Utc);

        if review == DumpReview::ToInbox {
            let item = InboxItem::new(
                &dump.text,
                &parsed.title,
                ItemSource::App,
                &parsed.start_step,
                parsed.estimate_minutes,
                now_utc,
            );
            self.db.move_focus_dump_to_inbox(&dump.id, &item).await?;
            log_info!("Focus dump item {} moved to inbox as {}", dump.id, item.id);
            return Ok(ReviewOutcome::Inbox { item });
        }

        let hour = profile.morning_hour;
        let when =
            tomorrow_at(now, hour).with_context(|| format!("Invalid morning hour {hour}"))?;
        let reminder = Reminder::new(
            &parsed.title,
            &parsed.start_step,
            parsed.estimate_minutes,
            when,
            now_utc,
        );
        self.db.move_focus_dump_to_reminder(&dump.id, &reminder).await?;
        let notification = reminder_notification(&reminder);
        log_info!("Focus dump item {} scheduled as reminder {}", dump.id, reminder.id);
        Ok(ReviewOutcome::Scheduled {
            reminder,
            notification,
        })
    }
}
