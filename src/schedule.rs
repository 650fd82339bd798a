//! Deadline and clock-time helpers.
//!
//! Deadlines arrive either as a full RFC 3339 timestamp or as the date + time
//! pair a form produces (`2024-05-01` and `9:30`). Everything here treats naive
//! values as UTC.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Timelike, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use validator::ValidationError;

use crate::error::AppError;

lazy_static! {
    // H:MM or HH:MM, 00:00 through 23:59
    static ref CLOCK_TIME_REGEX: Regex = Regex::new(r"^([0-1]?[0-9]|2[0-3]):[0-5][0-9]$").unwrap();
}

/// Parses a 24-hour `H:MM` / `HH:MM` clock time.
pub fn parse_clock_time(input: &str) -> Result<NaiveTime, AppError> {
    let input = input.trim();
    if !CLOCK_TIME_REGEX.is_match(input) {
        return Err(AppError::ValidationError(
            "Invalid time format, use HH:MM (00:00 - 23:59)".into(),
        ));
    }
    NaiveTime::parse_from_str(input, "%H:%M")
        .map_err(|e| AppError::ValidationError(format!("Invalid time: {}", e)))
}

/// Parses free-typed time input: [`normalize_time_input`] then [`parse_clock_time`].
pub fn parse_time_input(input: &str) -> Result<NaiveTime, AppError> {
    parse_clock_time(&normalize_time_input(input))
}

/// `validator` hook for optional clock-time fields. Blank input is accepted;
/// anything else must normalize to a valid `HH:MM`.
pub fn validate_clock_time(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() || CLOCK_TIME_REGEX.is_match(&normalize_time_input(value)) {
        Ok(())
    } else {
        let mut err = ValidationError::new("clock_time");
        err.message = Some("use HH:MM (00:00 - 23:59)".into());
        Err(err)
    }
}

/// Parses a form date, `YYYY-MM-DD`.
pub fn parse_calendar_date(input: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d")
        .map_err(|_| AppError::ValidationError("Invalid date, use YYYY-MM-DD".into()))
}

/// `validator` hook for optional form dates. Blank input is accepted.
pub fn validate_calendar_date(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() || parse_calendar_date(value).is_ok() {
        Ok(())
    } else {
        let mut err = ValidationError::new("calendar_date");
        err.message = Some("use YYYY-MM-DD".into());
        Err(err)
    }
}

/// Cleans up free-typed time input into `HH:MM` where possible.
///
/// Everything but digits and `:` is dropped. One or two bare digits mean a whole
/// hour (`9` -> `09:00`); three or four are split after the first two
/// (`0930` -> `09:30`, `930` -> `93:00`). The result is not validated, so
/// pass it through [`parse_clock_time`] afterwards.
pub fn normalize_time_input(input: &str) -> String {
    let cleaned: String = input
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == ':')
        .collect();

    if cleaned.contains(':') || cleaned.is_empty() || cleaned.len() > 4 {
        return cleaned;
    }
    if cleaned.len() <= 2 {
        format!("{:0>2}:00", cleaned)
    } else {
        format!("{}:{:0>2}", &cleaned[..2], &cleaned[2..])
    }
}

/// Renders a clock time with an AM/PM suffix, keeping the two-digit hour.
pub fn format_12h(time: NaiveTime) -> String {
    let (hour, minute) = (time.hour(), time.minute());
    match hour {
        0..=11 => format!("{:02}:{:02} AM", hour, minute),
        12 => format!("12:{:02} PM", minute),
        _ => format!("{:02}:{:02} PM", hour - 12, minute),
    }
}

/// Joins a form date with an optional time; no time means the end of that day.
pub fn combine_deadline(date: NaiveDate, time: Option<NaiveTime>) -> DateTime<Utc> {
    let time = time.unwrap_or_else(end_of_day);
    date.and_time(time).and_utc()
}

fn end_of_day() -> NaiveTime {
    NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN)
}

/// Time left until a deadline, broken down for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Countdown {
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
    pub is_overdue: bool,
}

impl Countdown {
    pub fn until(deadline: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        let left = deadline - now;
        if left <= Duration::zero() {
            return Self {
                days: 0,
                hours: 0,
                minutes: 0,
                seconds: 0,
                is_overdue: true,
            };
        }
        let total = left.num_seconds();
        Self {
            days: total / 86_400,
            hours: (total % 86_400) / 3_600,
            minutes: (total % 3_600) / 60,
            seconds: total % 60,
            is_overdue: false,
        }
    }
}

/// Coarse "how soon" wording for a deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum DeadlineLabel {
    Overdue,
    InHours(i64),
    Tomorrow,
    InDays(i64),
}

impl DeadlineLabel {
    pub fn for_deadline(deadline: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        let left = deadline - now;
        // Floor, so half an hour late is already overdue.
        let hours = left.num_seconds().div_euclid(3_600);
        match hours {
            h if h < 0 => DeadlineLabel::Overdue,
            h if h < 24 => DeadlineLabel::InHours(h),
            h if h < 48 => DeadlineLabel::Tomorrow,
            h => DeadlineLabel::InDays(h / 24),
        }
    }
}

impl fmt::Display for DeadlineLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeadlineLabel::Overdue => write!(f, "overdue"),
            DeadlineLabel::InHours(h) => write!(f, "in {} hours", h),
            DeadlineLabel::Tomorrow => write!(f, "tomorrow"),
            DeadlineLabel::InDays(d) => write!(f, "in {} days", d),
        }
    }
}
