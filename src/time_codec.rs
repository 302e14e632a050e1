//! Nanosecond time codec.
//!
//! Sort keys on nanosecond time fields must stay exact (the full string is
//! compared), while window arithmetic runs on millisecond epochs. These helpers
//! split a timestamp into those two parts and join them back for range bounds.

use crate::error::ContextError;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// Digits of sub-millisecond remainder carried by a nanosecond timestamp.
pub const SUB_MILLIS_DIGITS: usize = 6;

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
];

/// Parse an ISO-8601-like timestamp. Values without an offset are UTC.
pub fn parse_timestamp(timestamp: &str) -> Result<DateTime<Utc>, ContextError> {
    let trimmed = timestamp.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        if let Some(naive) = date.and_hms_opt(0, 0, 0) {
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }
    Err(ContextError::InvalidTimestamp(timestamp.to_string()))
}

/// Sub-millisecond remainder of `timestamp`, as exactly six digits.
///
/// `"2024-01-01T00:00:00.123456789Z"` yields `"456789"`; a timestamp with
/// millisecond precision or less yields `"000000"`. Malformed input yields an
/// empty string.
pub fn extract_sub_millisecond_part(timestamp: &str) -> String {
    if parse_timestamp(timestamp).is_err() {
        return String::new();
    }
    let fraction = fractional_seconds(timestamp.trim());
    let mut remainder: String = fraction.chars().skip(3).take(SUB_MILLIS_DIGITS).collect();
    while remainder.len() < SUB_MILLIS_DIGITS {
        remainder.push('0');
    }
    remainder
}

/// Milliseconds since the Unix epoch, truncating any sub-millisecond part.
pub fn to_epoch_millis(timestamp: &str) -> Result<i64, ContextError> {
    Ok(parse_timestamp(timestamp)?.timestamp_millis())
}

/// Render a millisecond epoch as an ISO string, appending `sub_millis` digits
/// when the target field has nanosecond precision.
pub fn to_iso_boundary(millis: i64, sub_millis: Option<&str>) -> Result<String, ContextError> {
    let dt = Utc
        .timestamp_millis_opt(millis)
        .single()
        .ok_or_else(|| ContextError::InvalidTimestamp(format!("epoch millis {}", millis)))?;
    let base = dt.format("%Y-%m-%dT%H:%M:%S%.3f").to_string();
    match sub_millis {
        Some(digits) if !digits.is_empty() => Ok(format!("{}{}Z", base, digits)),
        _ => Ok(format!("{}Z", base)),
    }
}

/// Digits after the decimal point of the seconds component, if any.
fn fractional_seconds(timestamp: &str) -> &str {
    let time_part = match timestamp.find(['T', ' ']) {
        Some(idx) => &timestamp[idx + 1..],
        None => return "",
    };
    match time_part.find('.') {
        Some(dot) => {
            let digits = &time_part[dot + 1..];
            let end = digits
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(digits.len());
            &digits[..end]
        }
        None => "",
    }
}
