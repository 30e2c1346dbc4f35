//! Tolerant parsing of the task date fields.
//!
//! Upstream sends dates either as bare strings (ISO-like or `DD-MM-YYYY HH:mm`) or as
//! objects holding the string under one of several keys. [`TaskDate::from_value`]
//! maps every shape onto one representation; formatting never fails.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;
use tracing::debug;

/// Object keys checked first, in order.
pub const DATE_KEYS: [&str; 4] = ["date", "dateFrom", "dateTo", "datetime"];

pub const DISPLAY_FORMAT: &str = "%d.%m.%Y";
pub const NOT_SPECIFIED: &str = "Not specified";
pub const INVALID_DATE: &str = "Invalid date";

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%d-%m-%Y %H:%M:%S",
    "%d-%m-%Y %H:%M",
    "%d.%m.%Y %H:%M",
];
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d-%m-%Y", "%d.%m.%Y"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskDate {
    Missing,
    Invalid,
    At(NaiveDateTime),
}

impl TaskDate {
    pub fn from_value(value: Option<&Value>) -> Self {
        match value {
            None | Some(Value::Null) => TaskDate::Missing,
            Some(Value::String(raw)) if raw.trim().is_empty() => TaskDate::Missing,
            Some(Value::String(raw)) => Self::from_str_lossy(raw),
            Some(Value::Object(fields)) => {
                let by_key = DATE_KEYS
                    .iter()
                    .filter_map(|key| fields.get(*key).and_then(Value::as_str))
                    .find_map(parse_date_str);
                let any_dashed = || {
                    fields
                        .values()
                        .filter_map(Value::as_str)
                        .filter(|raw| raw.contains('-'))
                        .find_map(parse_date_str)
                };
                match by_key.or_else(any_dashed) {
                    Some(at) => TaskDate::At(at),
                    None => {
                        debug!(fields = ?fields, "no parsable date in object");
                        TaskDate::Invalid
                    }
                }
            }
            Some(other) => {
                debug!(value = %other, "unsupported date value");
                TaskDate::Invalid
            }
        }
    }

    pub fn from_str_lossy(raw: &str) -> Self {
        match parse_date_str(raw) {
            Some(at) => TaskDate::At(at),
            None => {
                debug!(raw, "unparsable date string");
                TaskDate::Invalid
            }
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, TaskDate::Missing)
    }

    pub fn value(&self) -> Option<NaiveDateTime> {
        match self {
            TaskDate::At(at) => Some(*at),
            _ => None,
        }
    }

    /// The formatted date, or `None` when there is nothing to show.
    pub fn formatted(&self) -> Option<String> {
        self.value().map(|at| at.format(DISPLAY_FORMAT).to_string())
    }

    pub fn display(&self) -> String {
        match self {
            TaskDate::Missing => NOT_SPECIFIED.to_owned(),
            TaskDate::Invalid => INVALID_DATE.to_owned(),
            TaskDate::At(at) => at.format(DISPLAY_FORMAT).to_string(),
        }
    }
}

/// Parses the date shapes seen upstream. Offsets are dropped, keeping the
/// wall-clock time as written.
pub fn parse_date_str(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Some(at.naive_local());
    }
    if let Some(at) = DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
    {
        return Some(at);
    }
    // Trailing text such as a timezone name is ignored for date-only values.
    let head = raw.split_whitespace().next().unwrap_or(raw);
    let head = head.split('T').next().unwrap_or(head);
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(head, format).ok())
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}
