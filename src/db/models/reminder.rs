//! Scheduled reminders ("verbose" reminders carry a first step and estimate).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Reminder {
    pub id: String,
    pub title: String,
    pub why: String,
    pub start_step: String,
    pub estimate_minutes: u32,
    pub scheduled_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub is_started: bool,
    pub is_done: bool,
    pub last_checked_at: Option<DateTime<Utc>>,
}

impl Reminder {
    pub fn new(
        title: impl Into<String>,
        start_step: impl Into<String>,
        estimate_minutes: u32,
        scheduled_at: DateTime<Utc>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: title.into(),
            why: String::new(),
            start_step: start_step.into(),
            estimate_minutes,
            scheduled_at,
            created_at,
            is_started: false,
            is_done: false,
            last_checked_at: None,
        }
    }
}
