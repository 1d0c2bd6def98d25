use chrono::{DateTime, Utc};

pub fn epoch_seconds_to_date_time(epoch_seconds: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(epoch_seconds, 0)
}

pub fn current_timestamp() -> DateTime<Utc> {
    Utc::now()
}

pub fn current_seconds() -> i64 {
    current_timestamp().timestamp()
}

/// Whether `date_time` lies strictly after the current instant.
///
/// An absent date-time is never in the future.
pub fn is_in_future(date_time: Option<DateTime<Utc>>) -> bool {
    match date_time {
        Some(date_time) => date_time > current_timestamp(),
        None => false,
    }
}

pub fn is_blank(value: Option<&str>) -> bool {
    value.is_none_or(|v| v.trim().is_empty())
}
