use std::convert::TryFrom;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};

pub fn to_i64(value: u64) -> Result<i64> {
    i64::try_from(value).map_err(|_| anyhow!("value {value} exceeds SQLite INTEGER range"))
}

pub fn to_u32(value: i64, field: &str) -> Result<u32> {
    u32::try_from(value).map_err(|_| anyhow!("{field} contains out-of-range value {value}"))
}

pub fn to_u64(value: i64, field: &str) -> Result<u64> {
    u64::try_from(value).map_err(|_| anyhow!("{field} contains negative value {value}"))
}

pub fn parse_datetime(value: &str, field: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("failed to parse {field}"))
}

pub fn parse_optional_datetime(
    value: Option<String>,
    field: &str,
) -> Result<Option<DateTime<Utc>>> {
    match value {
        Some(raw) => parse_datetime(&raw, field).map(Some),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rfc3339_into_utc() {
        let parsed = parse_datetime("2026-01-05T10:00:00+02:00", "created_at").unwrap();
        assert_eq!(parsed.to_rfc3339(), "2026-01-05T08:00:00+00:00");
    }

    #[test]
    fn reports_field_name_on_bad_datetime() {
        let err = parse_datetime("yesterday", "scheduled_at").unwrap_err();
        assert!(err.to_string().contains("scheduled_at"));
    }

    #[test]
    fn rejects_negative_counts() {
        assert!(to_u32(-1, "estimate_minutes").is_err());
        assert_eq!(to_u32(5, "estimate_minutes").unwrap(), 5);
        assert!(to_i64(u64::MAX).is_err());
    }
}
