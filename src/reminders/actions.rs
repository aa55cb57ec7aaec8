//! Notification action buttons and what they do to a reminder.

use std::str::FromStr;

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Duration, Local, Utc};
use serde::Serialize;

use super::notifications::{reminder_notification, NotificationRequest};
use crate::{
    db::{Database, Reminder},
    log_info,
    profiles::UserProfile,
    stuck::StuckSuggestion,
    utils::time::tomorrow_at,
};

const ENABLE_LOGS: bool = true;

const SNOOZE_MINUTES: i64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ReminderAction {
    Started,
    HelpMeStart,
    Snooze10,
    TomorrowMorning,
    /// Belongs to the focus-end notification, not to reminders.
    FocusWrapUp,
}

impl ReminderAction {
    pub fn identifier(&self) -> &'static str {
        match self {
            ReminderAction::Started => "REMINDER_STARTED",
            ReminderAction::HelpMeStart => "REMINDER_HELP",
            ReminderAction::Snooze10 => "REMINDER_SNOOZE_10",
            ReminderAction::TomorrowMorning => "REMINDER_RESCHED_TMORNING",
            ReminderAction::FocusWrapUp => "FOCUS_WRAP_UP",
        }
    }
}

impl FromStr for ReminderAction {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "REMINDER_STARTED" => Ok(ReminderAction::Started),
            "REMINDER_HELP" => Ok(ReminderAction::HelpMeStart),
            "REMINDER_SNOOZE_10" => Ok(ReminderAction::Snooze10),
            "REMINDER_RESCHED_TMORNING" => Ok(ReminderAction::TomorrowMorning),
            "FOCUS_WRAP_UP" => Ok(ReminderAction::FocusWrapUp),
            other => Err(anyhow!("Unknown notification action: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ActionEffect {
    /// `reschedule` is set when the fire time moved.
    Updated {
        reminder: Reminder,
        reschedule: Option<NotificationRequest>,
    },
    ShowHelp {
        reminder: Reminder,
        suggestion: StuckSuggestion,
    },
}

impl ActionEffect {
    pub fn reminder(&self) -> &Reminder {
        match self {
            ActionEffect::Updated { reminder, .. } | ActionEffect::ShowHelp { reminder, .. } => {
                reminder
            }
        }
    }
}

pub fn apply_reminder_action(
    mut reminder: Reminder,
    action: ReminderAction,
    profile: Option<&UserProfile>,
    now: DateTime<Local>,
) -> Result<ActionEffect> {
    let now_utc = now.with_timezone(&Utc);
    reminder.last_checked_at = Some(now_utc);

    let new_time = match action {
        ReminderAction::Started => {
            reminder.is_started = true;
            None
        }
        ReminderAction::HelpMeStart => {
            let suggestion = StuckSuggestion::for_reminder(&reminder);
            return Ok(ActionEffect::ShowHelp {
                reminder,
                suggestion,
            });
        }
        ReminderAction::Snooze10 => Some(now_utc + Duration::minutes(SNOOZE_MINUTES)),
        ReminderAction::TomorrowMorning => Some(tomorrow_morning(profile, now)?),
        ReminderAction::FocusWrapUp => {
            bail!("{} does not apply to reminders", action.identifier())
        }
    };

    let reschedule = match new_time {
        Some(at) if at != reminder.scheduled_at => {
            reminder.scheduled_at = at;
            Some(reminder_notification(&reminder))
        }
        _ => None,
    };

    Ok(ActionEffect::Updated {
        reminder,
        reschedule,
    })
}

fn tomorrow_morning(profile: Option<&UserProfile>, now: DateTime<Local>) -> Result<DateTime<Utc>> {
    let hour = profile
        .map(|p| p.morning_hour)
        .unwrap_or(UserProfile::DEFAULT_MORNING_HOUR);
    tomorrow_at(now, hour).with_context(|| format!("Invalid morning hour {hour}"))
}

/// Loads the reminder, applies the action and persists the result.
pub async fn handle_reminder_action(
    db: &Database,
    profile: Option<&UserProfile>,
    reminder_id: &str,
    action: ReminderAction,
    now: DateTime<Local>,
) -> Result<ActionEffect> {
    let reminder = db
        .get_reminder(reminder_id)
        .await?
        .with_context(|| format!("Reminder {reminder_id} not found"))?;

    let effect = apply_reminder_action(reminder, action, profile, now)?;
    db.update_reminder(effect.reminder()).await?;

    log_info!(
        "Applied {} to reminder {}",
        action.identifier(),
        reminder_id
    );
    Ok(effect)
}
