//! Best-effort recognition of explicit dates and clock times in free text.
//!
//! Recognized forms (case-insensitive): ISO dates (`2026-01-07`), US numeric
//! dates (`1/7`, `1/7/26`), month names (`jan 7`, `January 7th, 2027`),
//! weekday names (`friday`, `on friday`, `next friday`), clock times (`3pm`,
//! `3:30 p.m.`, `15:30`, `at 4`, `noon`, `midnight`) and the relative days
//! `today`, `tonight` and `tomorrow` when paired with a clock time.
//!
//! A bare part of day ("tomorrow morning") is not a match here; the parser
//! resolves those against the user's profile hours instead.

use std::sync::OnceLock;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Weekday};
use regex::Regex;

/// Time used when a date is found without a clock time.
const DATE_ONLY_HOUR: u32 = 12;

fn iso_date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(\d{4})-(\d{1,2})-(\d{1,2})\b").unwrap())
}

fn numeric_date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(\d{1,2})/(\d{1,2})(?:/(\d{4}|\d{2}))?\b").unwrap())
}

fn month_name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"\b(january|february|march|april|may|june|july|august|september|october|november|december|jan|feb|mar|apr|jun|jul|aug|sept|sep|oct|nov|dec)\.?\s+(\d{1,2})(?:st|nd|rd|th)?\b(?:,?\s+(\d{4})\b)?",
        )
        .unwrap()
    })
}

fn weekday_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b(monday|tuesday|wednesday|thursday|friday|saturday|sunday)\b").unwrap()
    })
}

fn meridiem_time_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(\d{1,2})(?::([0-5]\d))?\s*([ap])\.?m\b").unwrap())
}

fn clock_time_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b([01]?\d|2[0-3]):([0-5]\d)\b").unwrap())
}

fn bare_hour_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\bat\s+(\d{1,2})\b").unwrap())
}

fn named_time_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(noon|midnight)\b").unwrap())
}

fn relative_day_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(today|tonight|tomorrow)\b").unwrap())
}

/// Returns the moment described by `text`, relative to `now`, or `None` when no
/// explicit date or clock time is present.
pub fn detect(text: &str, now: NaiveDateTime) -> Option<NaiveDateTime> {
    let lower = text.to_lowercase();
    let today = now.date();

    let date = explicit_date(&lower, today).or_else(|| weekday_date(&lower, today));
    let time = clock_time(&lower).map(|(time, ambiguous)| {
        if ambiguous {
            apply_day_part(time, &lower)
        } else {
            time
        }
    });

    match (date, time) {
        (Some(date), Some(time)) => Some(date.and_time(time)),
        (Some(date), None) => date.and_hms_opt(DATE_ONLY_HOUR, 0, 0),
        (None, Some(time)) => Some(relative_day(&lower, today).and_time(time)),
        (None, None) => None,
    }
}

/// Moves an hour without am/pm into the half of the day the text names:
/// "tonight at 8" is 20:00, "at 6 in the morning" is 06:00.
fn apply_day_part(time: NaiveTime, lower: &str) -> NaiveTime {
    let later = ["tonight", "evening", "afternoon"]
        .iter()
        .any(|cue| lower.contains(cue));
    let hour = time.hour();

    let shifted = if later && (1..=11).contains(&hour) {
        hour + 12
    } else if !later && lower.contains("morning") && (13..=19).contains(&hour) {
        hour - 12
    } else {
        hour
    };
    time.with_hour(shifted).unwrap_or(time)
}

fn explicit_date(lower: &str, today: NaiveDate) -> Option<NaiveDate> {
    if let Some(caps) = iso_date_re().captures(lower) {
        let year = caps[1].parse().ok()?;
        let month = caps[2].parse().ok()?;
        let day = caps[3].parse().ok()?;
        if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
            return Some(date);
        }
    }

    if let Some(caps) = month_name_re().captures(lower) {
        let month = month_number(&caps[1])?;
        let day: u32 = caps[2].parse().ok()?;
        let year = caps.get(3).and_then(|m| m.as_str().parse().ok());
        if let Some(date) = resolve_month_day(month, day, year, today) {
            return Some(date);
        }
    }

    if let Some(caps) = numeric_date_re().captures(lower) {
        let month: u32 = caps[1].parse().ok()?;
        let day: u32 = caps[2].parse().ok()?;
        let year = caps.get(3).and_then(|m| {
            let raw = m.as_str();
            let value: i32 = raw.parse().ok()?;
            Some(if raw.len() == 2 { 2000 + value } else { value })
        });
        if let Some(date) = resolve_month_day(month, day, year, today) {
            return Some(date);
        }
    }

    None
}

/// Without a year the next occurrence (today included) is used.
fn resolve_month_day(month: u32, day: u32, year: Option<i32>, today: NaiveDate) -> Option<NaiveDate> {
    match year {
        Some(year) => NaiveDate::from_ymd_opt(year, month, day),
        None => {
            let this_year = NaiveDate::from_ymd_opt(today.year(), month, day)?;
            if this_year >= today {
                Some(this_year)
            } else {
                NaiveDate::from_ymd_opt(today.year() + 1, month, day)
            }
        }
    }
}

fn month_number(name: &str) -> Option<u32> {
    let month = match &name[..3] {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(month)
}

/// The next occurrence of the named weekday, one to seven days ahead.
fn weekday_date(lower: &str, today: NaiveDate) -> Option<NaiveDate> {
    let caps = weekday_re().captures(lower)?;
    let target: Weekday = caps[1].parse().ok()?;

    let current = today.weekday().num_days_from_monday() as i64;
    let wanted = target.num_days_from_monday() as i64;
    let mut ahead = (wanted - current).rem_euclid(7);
    if ahead == 0 {
        ahead = 7;
    }
    Some(today + Duration::days(ahead))
}

/// The clock time in `lower`, flagged when it carried no am/pm.
fn clock_time(lower: &str) -> Option<(NaiveTime, bool)> {
    if let Some(caps) = meridiem_time_re().captures(lower) {
        let hour: u32 = caps[1].parse().ok()?;
        let minute: u32 = caps.get(2).map_or(Some(0), |m| m.as_str().parse().ok())?;
        if (1..=12).contains(&hour) {
            let hour = match (&caps[3], hour) {
                ("a", 12) => 0,
                ("a", h) => h,
                ("p", 12) => 12,
                (_, h) => h + 12,
            };
            return NaiveTime::from_hms_opt(hour, minute, 0).map(|t| (t, false));
        }
    }

    if let Some(caps) = clock_time_re().captures(lower) {
        let hour: u32 = caps[1].parse().ok()?;
        let minute: u32 = caps[2].parse().ok()?;
        return NaiveTime::from_hms_opt(hour, minute, 0).map(|t| (t, true));
    }

    if let Some(caps) = named_time_re().captures(lower) {
        let hour = if &caps[1] == "noon" { 12 } else { 0 };
        return NaiveTime::from_hms_opt(hour, 0, 0).map(|t| (t, false));
    }

    if let Some(caps) = bare_hour_re().captures(lower) {
        let hour: u32 = caps[1].parse().ok()?;
        // "at 4" reads as the afternoon; "at 9" as the morning.
        let hour = match hour {
            1..=7 => hour + 12,
            8..=12 => hour,
            _ => return None,
        };
        return NaiveTime::from_hms_opt(hour, 0, 0).map(|t| (t, true));
    }

    None
}

fn relative_day(lower: &str, today: NaiveDate) -> NaiveDate {
    match relative_day_re().captures(lower) {
        Some(caps) if &caps[1] == "tomorrow" => today + Duration::days(1),
        _ => today,
    }
}
