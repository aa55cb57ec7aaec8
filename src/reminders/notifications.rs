//! Local notification requests. These are plain values; handing them to the
//! platform scheduler is the host's job.

use chrono::{DateTime, SubsecRound, Timelike, Utc};
use serde::Serialize;

use crate::db::{FocusSession, Reminder};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub enum NotificationCategory {
    #[serde(rename = "VERBOSE_REMINDER")]
    VerboseReminder,
    #[serde(rename = "FOCUS_END")]
    FocusEnd,
}

impl NotificationCategory {
    pub fn identifier(&self) -> &'static str {
        match self {
            NotificationCategory::VerboseReminder => "VERBOSE_REMINDER",
            NotificationCategory::FocusEnd => "FOCUS_END",
        }
    }
}

/// What a delivered notification points back at.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum NotificationTarget {
    Reminder { reminder_id: String },
    FocusSession { session_id: String },
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRequest {
    pub identifier: String,
    pub title: String,
    pub body: String,
    pub category: NotificationCategory,
    pub fire_at: DateTime<Utc>,
    pub target: NotificationTarget,
}

pub fn reminder_notification(reminder: &Reminder) -> NotificationRequest {
    let body = format!(
        "Start: {} ({} min)\nTap “Help me start” if you’re stuck.",
        reminder.start_step, reminder.estimate_minutes
    );

    NotificationRequest {
        identifier: reminder.id.clone(),
        title: reminder.title.clone(),
        body,
        category: NotificationCategory::VerboseReminder,
        // Reminders fire on the minute.
        fire_at: reminder
            .scheduled_at
            .trunc_subsecs(0)
            .with_second(0)
            .unwrap_or(reminder.scheduled_at),
        target: NotificationTarget::Reminder {
            reminder_id: reminder.id.clone(),
        },
    }
}

pub fn focus_end_identifier(session_id: &str) -> String {
    format!("focus_end_{session_id}")
}

/// `None` when the session has no start time to count from.
pub fn focus_end_notification(session: &FocusSession) -> Option<NotificationRequest> {
    let end = session.planned_end()?;
    Some(NotificationRequest {
        identifier: focus_end_identifier(&session.id),
        title: "Focus complete".to_string(),
        body: format!("Nice work on “{}”. Want to wrap up?", session.focus_title),
        category: NotificationCategory::FocusEnd,
        fire_at: end.trunc_subsecs(0),
        target: NotificationTarget::FocusSession {
            session_id: session.id.clone(),
        },
    })
}
