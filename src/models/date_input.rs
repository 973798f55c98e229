//! Serde helpers for dates sent by clients: either an RFC 3339 timestamp or
//! a plain `YYYY-MM-DD` calendar date, read as UTC.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{de, Deserialize, Deserializer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayBound {
    /// 00:00:00 of the given date.
    Start,
    /// Last nanosecond of the given date.
    End,
}

pub fn parse(raw: &str, bound: DayBound) -> Result<DateTime<Utc>, String> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }

    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
        format!("invalid date `{raw}`, expected YYYY-MM-DD or an RFC 3339 timestamp")
    })?;
    let naive = match bound {
        DayBound::Start => date.and_hms_opt(0, 0, 0),
        DayBound::End => date.and_hms_nano_opt(23, 59, 59, 999_999_999),
    }
    .ok_or_else(|| format!("invalid date `{raw}`"))?;
    Ok(Utc.from_utc_datetime(&naive))
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse(&raw, DayBound::Start).map_err(de::Error::custom)
}

/// Plain dates resolve to the end of the day, for inclusive upper bounds.
pub fn deserialize_end_of_day<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse(&raw, DayBound::End).map_err(de::Error::custom)
}

pub fn deserialize_option<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer)?
        .map(|raw| parse(&raw, DayBound::Start).map_err(de::Error::custom))
        .transpose()
}
