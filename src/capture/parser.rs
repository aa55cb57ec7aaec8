use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::{
    rules::{
        first_match, DEFAULT_ESTIMATE_MINUTES, ESTIMATE_RULES, GENERIC_START_STEP,
        LEADING_PHRASES, START_STEP_RULES,
    },
    when,
};
use crate::profiles::UserProfile;

pub const MAX_TITLE_CHARS: usize = 80;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedCapture {
    pub title: String,
    pub start_step: String,
    pub estimate_minutes: u32,
    /// Local wall-clock time; `None` means the capture belongs in the inbox.
    pub scheduled_at: Option<NaiveDateTime>,
}

/// Hours used for "morning", "afternoon" and "evening"/"tonight".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayParts {
    pub morning_hour: u32,
    pub afternoon_hour: u32,
    pub evening_hour: u32,
}

impl Default for DayParts {
    fn default() -> Self {
        Self {
            morning_hour: UserProfile::DEFAULT_MORNING_HOUR,
            afternoon_hour: UserProfile::DEFAULT_AFTERNOON_HOUR,
            evening_hour: UserProfile::DEFAULT_EVENING_HOUR,
        }
    }
}

impl From<Option<&UserProfile>> for DayParts {
    fn from(profile: Option<&UserProfile>) -> Self {
        profile.map_or_else(Self::default, |p| Self {
            morning_hour: p.morning_hour,
            afternoon_hour: p.afternoon_hour,
            evening_hour: p.evening_hour,
        })
    }
}

/// Turns a free-text capture into a task suggestion. Stateless; every call
/// depends only on its arguments.
#[derive(Debug, Clone, Copy, Default)]
pub struct CaptureParser;

impl CaptureParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse(
        &self,
        raw: &str,
        profile: Option<&UserProfile>,
        now: NaiveDateTime,
    ) -> ParsedCapture {
        let cleaned = raw.trim();
        let title = extract_title(cleaned);
        let lower_title = title.to_lowercase();

        let start_step = first_match(START_STEP_RULES, &lower_title, GENERIC_START_STEP);
        let estimate_minutes = first_match(ESTIMATE_RULES, &lower_title, DEFAULT_ESTIMATE_MINUTES);

        let scheduled_at = when::detect(cleaned, now)
            .or_else(|| part_of_day(cleaned, now, DayParts::from(profile)));

        ParsedCapture {
            title,
            start_step: start_step.to_string(),
            estimate_minutes,
            scheduled_at,
        }
    }
}

fn extract_title(cleaned: &str) -> String {
    let stripped = strip_leading_phrase(cleaned).trim();
    let truncated: String = stripped.chars().take(MAX_TITLE_CHARS).collect();
    // Uppercasing can widen a character (e.g. 'ß'), so cap again.
    capitalize_first(&truncated)
        .chars()
        .take(MAX_TITLE_CHARS)
        .collect()
}

fn strip_leading_phrase(text: &str) -> &str {
    for phrase in LEADING_PHRASES {
        let len = phrase.chars().count();
        let head: String = text.chars().take(len).collect();
        if head.to_lowercase() == *phrase {
            let cut = text
                .char_indices()
                .nth(len)
                .map_or(text.len(), |(idx, _)| idx);
            return &text[cut..];
        }
    }
    text
}

fn capitalize_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn part_of_day(text: &str, now: NaiveDateTime, parts: DayParts) -> Option<NaiveDateTime> {
    let lower = text.to_lowercase();

    let base = if lower.contains("tomorrow") {
        now.date() + Duration::days(1)
    } else {
        now.date()
    };

    let hour = if lower.contains("morning") {
        parts.morning_hour
    } else if lower.contains("afternoon") {
        parts.afternoon_hour
    } else if lower.contains("evening") || lower.contains("tonight") {
        parts.evening_hour
    } else {
        return None;
    };

    base.and_hms_opt(hour, 0, 0)
}
