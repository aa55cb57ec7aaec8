//! "I'm stuck" suggestions: pick something small to start right now.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::db::{FocusSession, InboxItem, Reminder};

/// Reminders due within this many hours count as "soon".
pub const SOON_WINDOW_HOURS: i64 = 6;
const MAX_SUGGESTED_MINUTES: u32 = 5;
const ACTIVE_FOCUS_MINUTES: u32 = 2;

pub const EVEN_SMALLER_STEP: &str = "Only open what you need. One click is enough.";

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SuggestionSource {
    ActiveFocus { session_id: String },
    Reminder { reminder_id: String },
    Inbox { item_id: String },
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StuckSuggestion {
    pub source: SuggestionSource,
    pub title: String,
    pub start_step: String,
    pub estimate_minutes: u32,
}

impl StuckSuggestion {
    pub fn for_reminder(reminder: &Reminder) -> Self {
        Self {
            source: SuggestionSource::Reminder {
                reminder_id: reminder.id.clone(),
            },
            title: reminder.title.clone(),
            start_step: normalize_start_step(&reminder.start_step, &reminder.title),
            estimate_minutes: reminder.estimate_minutes.min(MAX_SUGGESTED_MINUTES),
        }
    }

    pub fn for_inbox_item(item: &InboxItem) -> Self {
        Self {
            source: SuggestionSource::Inbox {
                item_id: item.id.clone(),
            },
            title: item.title.clone(),
            start_step: normalize_start_step(&item.start_step, &item.title),
            estimate_minutes: item.estimate_minutes.min(MAX_SUGGESTED_MINUTES),
        }
    }

    fn for_active_focus(session: &FocusSession) -> Self {
        Self {
            source: SuggestionSource::ActiveFocus {
                session_id: session.id.clone(),
            },
            title: session.focus_title.clone(),
            start_step: normalize_start_step(&session.focus_start_step, &session.focus_title),
            estimate_minutes: ACTIVE_FOCUS_MINUTES,
        }
    }
}

/// Ordered suggestions. A running focus session short-circuits everything
/// else; otherwise the next reminder due soon, the smallest inbox item, and the
/// most recent inbox item (first in `inbox_items`) when it differs.
pub fn suggestions(
    focus_sessions: &[FocusSession],
    reminders: &[Reminder],
    inbox_items: &[InboxItem],
    now: DateTime<Utc>,
) -> Vec<StuckSuggestion> {
    if let Some(active) = focus_sessions.iter().find(|s| s.is_running()) {
        return vec![StuckSuggestion::for_active_focus(active)];
    }

    let mut out = Vec::new();

    if let Some(soon) = next_soon_reminder(reminders, now) {
        out.push(StuckSuggestion::for_reminder(soon));
    }

    // min_by_key keeps the first of equal estimates, i.e. the most recent one.
    let smallest = inbox_items.iter().min_by_key(|item| item.estimate_minutes);
    if let Some(tiny) = smallest {
        out.push(StuckSuggestion::for_inbox_item(tiny));
    }

    if let Some(recent) = inbox_items.first() {
        let already = smallest.map_or(false, |tiny| tiny.id == recent.id);
        if !already {
            out.push(StuckSuggestion::for_inbox_item(recent));
        }
    }

    out
}

/// The `[from, to]` range a reminder must fall in to be suggested.
pub fn soon_window(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    (now, now + Duration::hours(SOON_WINDOW_HOURS))
}

fn next_soon_reminder(reminders: &[Reminder], now: DateTime<Utc>) -> Option<&Reminder> {
    let (_, window_end) = soon_window(now);
    reminders
        .iter()
        .filter(|r| !r.is_done && r.scheduled_at >= now && r.scheduled_at <= window_end)
        .min_by_key(|r| r.scheduled_at)
}

/// Keeps a non-blank step, otherwise derives one from the title.
pub fn normalize_start_step(step: &str, fallback_title: &str) -> String {
    let trimmed = step.trim();
    if !trimmed.is_empty() {
        return trimmed.to_string();
    }

    let lower = fallback_title.to_lowercase();
    let derived = if lower.contains("email") {
        "Open Mail and draft one sentence."
    } else if lower.contains("text") || lower.contains("message") {
        "Open Messages and type one sentence."
    } else if lower.contains("call") {
        "Open Phone and find the number."
    } else if lower.contains("pay") {
        "Open the bill and find the amount due."
    } else if lower.contains("schedule") {
        "Open your calendar and pick a time."
    } else {
        "Open what you need and do the smallest possible step for 2 minutes."
    };
    derived.to_string()
}

pub fn make_even_smaller(_current_step: &str) -> String {
    EVEN_SMALLER_STEP.to_string()
}
