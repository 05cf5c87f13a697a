use crate::transform::error::SkipReason;
use chrono::{DateTime, LocalResult, NaiveDateTime, NaiveTime, TimeZone};
use chrono_tz::Tz;
use model::core::value::Value;

/// Text format of the source's naive DATETIME columns.
pub const SOURCE_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const SOURCE_DATETIME_FRACTIONAL: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Places a naive wall-clock time in `tz`.
///
/// Ambiguous times (DST fall-back) resolve to the earlier instant; times that
/// fall in a DST gap do not exist and yield `None`.
pub fn localize(naive: NaiveDateTime, tz: Tz) -> Option<DateTime<Tz>> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(at) => Some(at),
        LocalResult::Ambiguous(earliest, _) => Some(earliest),
        LocalResult::None => None,
    }
}

/// Interprets a `created_at` column value as an instant in the source timezone.
pub fn localize_value(value: &Value, tz: Tz) -> Result<DateTime<Tz>, SkipReason> {
    let invalid = || SkipReason::InvalidTimestamp(value.to_string());

    match value {
        Value::DateTime(naive) => localize(*naive, tz).ok_or_else(invalid),
        Value::Date(date) => localize(date.and_time(NaiveTime::MIN), tz).ok_or_else(invalid),
        Value::Timestamp(utc) => Ok(utc.with_timezone(&tz)),
        Value::String(_) | Value::Json(_) => {
            let text = value.as_str().map(str::trim).ok_or_else(invalid)?;
            if let Ok(naive) = NaiveDateTime::parse_from_str(text, SOURCE_DATETIME_FRACTIONAL) {
                return localize(naive, tz).ok_or_else(invalid);
            }
            DateTime::parse_from_rfc3339(text)
                .map(|at| at.with_timezone(&tz))
                .map_err(|_| invalid())
        }
        _ => Err(invalid()),
    }
}

/// Renders an instant as the source's native timestamp text.
pub fn format_source<T: TimeZone>(at: &DateTime<T>) -> String
where
    T::Offset: std::fmt::Display,
{
    at.format(SOURCE_DATETIME_FORMAT).to_string()
}
