//! Time formatting and series helpers
use time::macros::format_description;
use time::OffsetDateTime;

use crate::error::{AmbientError, ErrorKind, Result};

const MINUTE_MS: i64 = 60 * 1000;

fn datetime_from_millis(ms: i64) -> Option<OffsetDateTime> {
    OffsetDateTime::from_unix_timestamp_nanos(ms as i128 * 1_000_000).ok()
}

/// Render epoch milliseconds as `YYYY-MM-DDTHH:MM:SS.mmmZ`
pub fn iso_from_millis(ms: i64) -> Result<String> {
    let format = format_description!(
        "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z"
    );
    datetime_from_millis(ms)
        .ok_or_else(|| {
            AmbientError::new(ErrorKind::Configuration, format!("Timestamp {} is out of range", ms))
        })?
        .format(&format)
        .map_err(|e| {
            AmbientError::new(ErrorKind::Configuration, "Failed to format timestamp").with_source(e)
        })
}

/// Format a timestamp for human-readable logging
///
/// Converts epoch milliseconds to DD.MM.YYYY - HH:MM:SS (UTC).
/// Falls back to the raw number if the value cannot be represented.
pub fn format_datetime(ms: i64) -> String {
    let format = format_description!("[day].[month].[year] - [hour]:[minute]:[second]");
    datetime_from_millis(ms)
        .and_then(|dt| dt.format(&format).ok())
        .unwrap_or_else(|| ms.to_string())
}

pub fn now_millis() -> i64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

pub fn truncate_to_minute(ms: i64) -> i64 {
    ms - ms.rem_euclid(MINUTE_MS)
}

/// Chart label for the minute containing `ms`, `YYYY-MM-DD HH:MM` in UTC
pub fn minute_label(ms: i64) -> Option<String> {
    let format = format_description!("[year]-[month]-[day] [hour]:[minute]");
    datetime_from_millis(ms)?.format(&format).ok()
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeriesSummary {
    pub min: f64,
    pub max: f64,
    pub average: f64,
    pub samples: usize,
}

/// Min, max and average of a series, rounded to 2 decimal places
pub fn summarize(values: &[f64]) -> Option<SeriesSummary> {
    if values.is_empty() {
        return None;
    }

    let count = values.len() as f64;
    let sum: f64 = values.iter().sum();
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    Some(SeriesSummary {
        min,
        max,
        average: (sum / count * 100.0).round() / 100.0,
        samples: values.len(),
    })
}
