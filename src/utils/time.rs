use chrono::{DateTime, Days, Duration, Local, NaiveDateTime, TimeZone, Utc};

/// Resolves a local wall-clock time. Times that fall into a DST gap move
/// forward by an hour.
pub fn local_to_utc(naive: NaiveDateTime) -> Option<DateTime<Utc>> {
    Local
        .from_local_datetime(&naive)
        .earliest()
        .or_else(|| Local.from_local_datetime(&(naive + Duration::hours(1))).earliest())
        .map(|dt| dt.with_timezone(&Utc))
}

/// The next calendar day after `now` at `hour:00` local time.
pub fn tomorrow_at(now: DateTime<Local>, hour: u32) -> Option<DateTime<Utc>> {
    let naive = now
        .date_naive()
        .checked_add_days(Days::new(1))?
        .and_hms_opt(hour, 0, 0)?;
    local_to_utc(naive)
}
