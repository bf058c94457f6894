//! Date, time, datetime and duration parsing
//!
//! Accepted formats:
//!
//! | kind | format |
//! |---|---|
//! | date | `YYYY-MM-DD` |
//! | time | `HH:MM[:SS[.ffffff]][Z or [±]HH[:]MM]` |
//! | datetime | `YYYY-MM-DD[T]HH:MM[:SS[.ffffff]][Z or [±]HH[:]MM]` |
//! | timedelta | `[-][DD ][HH:MM]SS[.ffffff]` or `[±]P[DD]DT[HH]H[MM]M[SS]S` |
//!
//! Parsed values are normalized to ISO strings (durations to total seconds)
//! before they reach a command body.

use chrono::{DateTime, FixedOffset, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::Value;

pub const DATE_FORMAT: &str = "YYYY-MM-DD";
pub const TIME_FORMAT: &str = "HH:MM[:SS[.ffffff]][Z or [±]HH[:]MM]";
pub const DATETIME_FORMAT: &str = "YYYY-MM-DD[T]HH:MM[:SS[.ffffff]][Z or [±]HH[:]MM]";
pub const TIMEDELTA_FORMATS: [&str; 2] = ["[-][DD ][HH:MM]SS[.ffffff]", "[±]P[DD]DT[HH]H[MM]M[SS]S"];

static TIME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{2}):(\d{2})(?::(\d{2})(?:\.(\d{1,6}))?)?(Z|[+-]\d{2}:?\d{2})?$").unwrap()
});
static DATETIME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(\d{4}-\d{2}-\d{2})(?:[T ](\d{2}):(\d{2})(?::(\d{2})(?:\.(\d{1,6}))?)?(Z|[+-]\d{2}:?\d{2})?)?$",
    )
    .unwrap()
});
static CLOCK_DELTA: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([-+])?(?:(\d+)\s*(?:d|days?,?)?\s+)?(?:(\d+):(\d{2}):)?(\d+)(?:\.(\d{1,6}))?$")
        .unwrap()
});
static ISO_DELTA: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([-+])?P(?:(\d+)D)?(?:T(?:(\d+)H)?(?:(\d+)M)?(?:(\d+(?:\.\d+)?)S)?)?$").unwrap()
});

/// A parsed time of day with an optional UTC offset
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeOfDay {
    pub time: NaiveTime,
    pub offset: Option<FixedOffset>,
}

/// A parsed datetime, either naive or offset-aware
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParsedDateTime {
    Naive(NaiveDateTime),
    Aware(DateTime<FixedOffset>),
}

impl ParsedDateTime {
    pub fn to_value(&self) -> Value {
        match self {
            ParsedDateTime::Naive(dt) => Value::String(dt.format("%Y-%m-%dT%H:%M:%S%.f").to_string()),
            ParsedDateTime::Aware(dt) => Value::String(dt.to_rfc3339()),
        }
    }

    /// Signed comparison with the current instant: negative when in the past
    pub fn cmp_now(&self) -> std::cmp::Ordering {
        match self {
            ParsedDateTime::Naive(dt) => dt.cmp(&Local::now().naive_local()),
            ParsedDateTime::Aware(dt) => dt.with_timezone(&Utc).cmp(&Utc::now()),
        }
    }
}

fn number(caps: &Captures<'_>, index: usize) -> u32 {
    caps.get(index)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0)
}

fn micros(caps: &Captures<'_>, index: usize) -> u32 {
    caps.get(index)
        .map(|m| {
            let digits = m.as_str();
            let padded = format!("{digits:0<6}");
            padded.parse().unwrap_or(0)
        })
        .unwrap_or(0)
}

fn offset(text: Option<&str>) -> Result<Option<FixedOffset>, String> {
    let Some(text) = text else {
        return Ok(None);
    };
    if text == "Z" {
        return Ok(FixedOffset::east_opt(0));
    }
    let sign = if text.starts_with('-') { -1 } else { 1 };
    let digits: String = text[1..].chars().filter(|c| *c != ':').collect();
    let hours: i32 = digits[..2].parse().map_err(|_| "invalid timezone offset".to_string())?;
    let minutes: i32 = digits[2..].parse().map_err(|_| "invalid timezone offset".to_string())?;
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
        .map(Some)
        .ok_or_else(|| "timezone offset out of range".to_string())
}

pub fn parse_date(text: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d").map_err(|e| e.to_string())
}

pub fn parse_time(text: &str) -> Result<TimeOfDay, String> {
    let caps = TIME
        .captures(text.trim())
        .ok_or_else(|| "invalid time format".to_string())?;
    let time = NaiveTime::from_hms_micro_opt(
        number(&caps, 1),
        number(&caps, 2),
        number(&caps, 3),
        micros(&caps, 4),
    )
    .ok_or_else(|| "time out of range".to_string())?;
    Ok(TimeOfDay {
        time,
        offset: offset(caps.get(5).map(|m| m.as_str()))?,
    })
}

pub fn parse_datetime(text: &str) -> Result<ParsedDateTime, String> {
    let caps = DATETIME
        .captures(text.trim())
        .ok_or_else(|| "invalid datetime format".to_string())?;
    let date = parse_date(&caps[1])?;
    let time = NaiveTime::from_hms_micro_opt(
        number(&caps, 2),
        number(&caps, 3),
        number(&caps, 4),
        micros(&caps, 5),
    )
    .ok_or_else(|| "time out of range".to_string())?;
    let naive = NaiveDateTime::new(date, time);
    match offset(caps.get(6).map(|m| m.as_str()))? {
        Some(tz) => tz
            .from_local_datetime(&naive)
            .single()
            .map(ParsedDateTime::Aware)
            .ok_or_else(|| "ambiguous local datetime".to_string()),
        None => Ok(ParsedDateTime::Naive(naive)),
    }
}

/// Parse a duration into total seconds
pub fn parse_timedelta(text: &str) -> Result<f64, String> {
    let text = text.trim();
    if let Some(caps) = ISO_DELTA.captures(text) {
        if text.trim_start_matches(['-', '+']) != "P" && !text.ends_with('T') {
            let sign = if caps.get(1).map(|m| m.as_str()) == Some("-") { -1.0 } else { 1.0 };
            let seconds: f64 = caps
                .get(5)
                .and_then(|m| m.as_str().parse().ok())
                .unwrap_or(0.0);
            let total = f64::from(number(&caps, 2)) * 86_400.0
                + f64::from(number(&caps, 3)) * 3_600.0
                + f64::from(number(&caps, 4)) * 60.0
                + seconds;
            return Ok(sign * total);
        }
    }
    if let Some(caps) = CLOCK_DELTA.captures(text) {
        let sign = if caps.get(1).map(|m| m.as_str()) == Some("-") { -1.0 } else { 1.0 };
        let total = f64::from(number(&caps, 2)) * 86_400.0
            + f64::from(number(&caps, 3)) * 3_600.0
            + f64::from(number(&caps, 4)) * 60.0
            + f64::from(number(&caps, 5))
            + f64::from(micros(&caps, 6)) / 1_000_000.0;
        return Ok(sign * total);
    }
    Err("invalid duration format".to_string())
}

pub fn date_value(date: NaiveDate) -> Value {
    Value::String(date.format("%Y-%m-%d").to_string())
}

pub fn time_value(time: &TimeOfDay) -> Value {
    let base = time.time.format("%H:%M:%S%.f").to_string();
    match time.offset {
        Some(offset) => Value::String(format!("{base}{offset}")),
        None => Value::String(base),
    }
}

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date() {
        assert_eq!(
            parse_date("2024-02-29").unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()
        );
        assert!(parse_date("2023-02-29").is_err());
        assert!(parse_date("29/02/2024").is_err());
    }

    #[test]
    fn test_parse_time_with_offset() {
        let parsed = parse_time("12:30:05.25+02:00").unwrap();
        assert_eq!(parsed.time, NaiveTime::from_hms_micro_opt(12, 30, 5, 250_000).unwrap());
        assert_eq!(parsed.offset, FixedOffset::east_opt(7200));
        assert_eq!(time_value(&parsed), Value::String("12:30:05.250+02:00".into()));

        let utc = parse_time("08:00Z").unwrap();
        assert_eq!(utc.offset, FixedOffset::east_opt(0));
        assert!(parse_time("25:00").is_err());
    }

    #[test]
    fn test_parse_datetime_variants() {
        assert!(matches!(
            parse_datetime("2024-01-01T10:00").unwrap(),
            ParsedDateTime::Naive(_)
        ));
        assert!(matches!(
            parse_datetime("2024-01-01 10:00:00").unwrap(),
            ParsedDateTime::Naive(_)
        ));
        assert!(matches!(
            parse_datetime("2024-01-01T10:00:00Z").unwrap(),
            ParsedDateTime::Aware(_)
        ));
        assert_eq!(
            parse_datetime("2024-01-01").unwrap().to_value(),
            Value::String("2024-01-01T00:00:00".into())
        );
        assert!(parse_datetime("yesterday").is_err());
    }

    #[test]
    fn test_parse_timedelta() {
        assert_eq!(parse_timedelta("45").unwrap(), 45.0);
        assert_eq!(parse_timedelta("01:02:03").unwrap(), 3723.0);
        assert_eq!(parse_timedelta("1 00:00:01.5").unwrap(), 86_401.5);
        assert_eq!(parse_timedelta("-30").unwrap(), -30.0);
        assert_eq!(parse_timedelta("P1DT2H").unwrap(), 93_600.0);
        assert_eq!(parse_timedelta("PT1M30S").unwrap(), 90.0);
        assert!(parse_timedelta("P").is_err());
        assert!(parse_timedelta("soon").is_err());
    }

    #[test]
    fn test_past_and_future_ordering() {
        let past = parse_datetime("2000-01-01T00:00:00Z").unwrap();
        let future = parse_datetime("2999-01-01T00:00:00").unwrap();
        assert_eq!(past.cmp_now(), std::cmp::Ordering::Less);
        assert_eq!(future.cmp_now(), std::cmp::Ordering::Greater);
    }
}
