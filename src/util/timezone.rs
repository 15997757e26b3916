use chrono::{LocalResult, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeDelta, TimeZone};
use chrono_tz::Tz;

const DATE_FORMAT: &str = "%Y-%m-%d";
// Wider than any real DST gap.
const GAP_LOOKBACK_HOURS: i64 = 3;

/// Interpret a Notion calendar date (and optional `HH:MM` time) as local time
/// in `tz`, returning Unix milliseconds.
///
/// Ambiguous local times (DST fall-back) resolve to the earlier instant. Times
/// skipped by a DST jump are read with the offset in force before the jump,
/// which moves them forward by the size of the gap.
pub fn local_date_to_unix_ms(date: &str, time: Option<&str>, tz: Tz) -> Option<i64> {
    let date = NaiveDate::parse_from_str(date.trim(), DATE_FORMAT).ok()?;
    let time = match time.map(str::trim).filter(|value| !value.is_empty()) {
        Some(value) => parse_time(value)?,
        None => NaiveTime::MIN,
    };
    let naive = NaiveDateTime::new(date, time);
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(local) | LocalResult::Ambiguous(local, _) => {
            Some(local.timestamp_millis())
        }
        LocalResult::None => {
            let before = tz
                .from_local_datetime(&(naive - TimeDelta::hours(GAP_LOOKBACK_HOURS)))
                .earliest()?;
            let offset_ms = i64::from(before.offset().fix().local_minus_utc()) * 1_000;
            Some(naive.and_utc().timestamp_millis() - offset_ms)
        }
    }
}

fn parse_time(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .ok()
}

/// Parse an IANA zone name, as Notion reports it on dates with a time zone.
pub fn parse_zone(name: &str) -> Option<Tz> {
    name.trim().parse().ok()
}
