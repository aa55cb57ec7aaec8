//! Inbox items: captures that have no scheduled time yet.

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ItemSource {
    Siri,
    App,
    Widget,
}

impl ItemSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemSource::Siri => "siri",
            ItemSource::App => "app",
            ItemSource::Widget => "widget",
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "siri" => Ok(ItemSource::Siri),
            "app" => Ok(ItemSource::App),
            "widget" => Ok(ItemSource::Widget),
            other => Err(anyhow!("unknown item source '{other}'")),
        }
    }
}

impl Default for ItemSource {
    fn default() -> Self {
        ItemSource::App
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InboxItem {
    pub id: String,
    /// Raw text as captured, before title cleanup.
    pub content: String,
    pub title: String,
    pub source: ItemSource,
    pub start_step: String,
    pub estimate_minutes: u32,
    pub sort_index: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl InboxItem {
    pub fn new(
        content: impl Into<String>,
        title: impl Into<String>,
        source: ItemSource,
        start_step: impl Into<String>,
        estimate_minutes: u32,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            content: content.into(),
            title: title.into(),
            source,
            start_step: start_step.into(),
            estimate_minutes,
            sort_index: None,
            created_at,
        }
    }
}
