//! Focus session data models.
//!
//! A focus session optionally points back at the inbox item or reminder it was
//! started from, so completing the session can clear that source.

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum FocusSourceKind {
    Inbox,
    Reminder,
}

impl FocusSourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FocusSourceKind::Inbox => "inbox",
            FocusSourceKind::Reminder => "reminder",
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "inbox" => Ok(FocusSourceKind::Inbox),
            "reminder" => Ok(FocusSourceKind::Reminder),
            other => Err(anyhow!("unknown focus source kind '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FocusSession {
    pub id: String,
    pub focus_title: String,
    pub focus_start_step: String,
    pub duration_seconds: u64,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub source_kind: Option<FocusSourceKind>,
    pub source_id: Option<String>,
    /// Set once the session has been logged as a completion.
    pub completed_logged_at: Option<DateTime<Utc>>,
}

impl FocusSession {
    pub fn new(
        focus_title: impl Into<String>,
        focus_start_step: impl Into<String>,
        duration_seconds: u64,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            focus_title: focus_title.into(),
            focus_start_step: focus_start_step.into(),
            duration_seconds,
            created_at,
            started_at: Some(created_at),
            ended_at: None,
            is_active: true,
            source_kind: None,
            source_id: None,
            completed_logged_at: None,
        }
    }

    pub fn with_source(mut self, kind: FocusSourceKind, source_id: impl Into<String>) -> Self {
        self.source_kind = Some(kind);
        self.source_id = Some(source_id.into());
        self
    }

    pub fn is_running(&self) -> bool {
        self.is_active && self.ended_at.is_none()
    }

    /// `None` when not started or when the duration does not fit a timestamp.
    pub fn planned_end(&self) -> Option<DateTime<Utc>> {
        let seconds = i64::try_from(self.duration_seconds).ok()?;
        let duration = chrono::Duration::try_seconds(seconds)?;
        self.started_at?.checked_add_signed(duration)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FocusDumpItem {
    pub id: String,
    pub session_id: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl FocusDumpItem {
    pub fn new(session_id: impl Into<String>, text: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            session_id: session_id.into(),
            text: text.into(),
            created_at,
        }
    }
}
