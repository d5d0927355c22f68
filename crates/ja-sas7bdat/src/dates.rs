//! SAS date and datetime handling.
//!
//! SAS stores dates as days and datetimes as seconds since 1960-01-01.
//! Whether a numeric column is temporal is decided by its format name.

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};

const DATE_FORMATS: &[&str] = &[
    "DATE", "DAY", "DDMMYY", "DOWNAME", "JULDAY", "JULIAN", "MMDDYY", "MMYY", "MMYYC", "MMYYD",
    "MMYYP", "MMYYS", "MMYYN", "MONNAME", "MONTH", "MONYY", "QTR", "QTRR", "NENGO", "WEEKDATE",
    "WEEKDATX", "WEEKDAY", "WEEKV", "WORDDATE", "WORDDATX", "YEAR", "YYMM", "YYMMC", "YYMMD",
    "YYMMP", "YYMMS", "YYMMN", "YYMON", "YYMMDD", "YYQ", "YYQC", "YYQD", "YYQP", "YYQS", "YYQN",
    "YYQR", "YYQRC", "YYQRD", "YYQRP", "YYQRS", "YYQRN", "YYMMDDP", "YYMMDDC", "E8601DA",
    "YYMMDDN", "MMDDYYC", "MMDDYYS", "MMDDYYD", "YYMMDDS", "B8601DA", "DDMMYYN", "YYMMDDD",
    "DDMMYYB", "DDMMYYP", "MMDDYYP", "YYMMDDB", "MMDDYYN", "DDMMYYC", "DDMMYYD", "DDMMYYS",
    "MINGUO",
];

const DATETIME_FORMATS: &[&str] = &[
    "DATETIME", "DTWKDATX", "B8601DN", "B8601DT", "B8601DX", "B8601DZ", "B8601LX", "E8601DN",
    "E8601DT", "E8601DX", "E8601DZ", "E8601LX", "DATEAMPM", "DTDATE", "DTMONYY", "DTYEAR", "TOD",
    "MDYAMPM",
];

// Roughly +/- 8000 years around the epoch; beyond that chrono cannot represent the value.
const MAX_ABS_DAYS: f64 = 2_900_000.0;
const MAX_ABS_SECONDS: f64 = MAX_ABS_DAYS * 86_400.0;

/// Temporal interpretation of a format name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemporalKind {
    None,
    Date,
    DateTime,
}

/// Classify a SAS format name (case-insensitive, without width).
#[must_use]
pub fn classify_format(format: &str) -> TemporalKind {
    let name = format.trim().to_ascii_uppercase();
    if DATE_FORMATS.contains(&name.as_str()) {
        TemporalKind::Date
    } else if DATETIME_FORMATS.contains(&name.as_str()) {
        TemporalKind::DateTime
    } else {
        TemporalKind::None
    }
}

/// The SAS epoch, 1960-01-01.
#[must_use]
pub fn sas_epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1960, 1, 1).unwrap_or(NaiveDate::MIN)
}

/// Convert days since the epoch; fractional days are truncated toward the earlier date.
#[must_use]
pub fn sas_date(days: f64) -> Option<NaiveDate> {
    if !days.is_finite() || days.abs() > MAX_ABS_DAYS {
        return None;
    }
    let delta = TimeDelta::try_days(days.floor() as i64)?;
    sas_epoch().checked_add_signed(delta)
}

/// Convert seconds since the epoch, keeping millisecond precision.
#[must_use]
pub fn sas_datetime(seconds: f64) -> Option<NaiveDateTime> {
    if !seconds.is_finite() || seconds.abs() > MAX_ABS_SECONDS {
        return None;
    }
    let delta = TimeDelta::try_milliseconds((seconds * 1000.0).round() as i64)?;
    sas_epoch().and_time(chrono::NaiveTime::MIN).checked_add_signed(delta)
}

/// Days since the epoch for a date.
#[must_use]
pub fn days_since_epoch(date: NaiveDate) -> f64 {
    (date - sas_epoch()).num_days() as f64
}

/// Seconds since the epoch for a datetime.
#[must_use]
pub fn seconds_since_epoch(datetime: NaiveDateTime) -> f64 {
    let delta = datetime - sas_epoch().and_time(chrono::NaiveTime::MIN);
    delta.num_milliseconds() as f64 / 1000.0
}
