//! Canonical in-memory representation of one OHLCV bar, plus the wire form the
//! data service sends.
//!
//! The service is loosely typed: `time` may be an RFC 3339 string, a naive
//! `YYYY-MM-DDTHH:MM:SS` string (read as UTC), a bare date, or an epoch number.
//! [`decode_bars`] turns a whole response body into [`Bar`]s or rejects it as a
//! unit; there is no partial result.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use snafu::{OptionExt, ResultExt};

use crate::errors::{
    FeedError, NotASequenceSnafu, RecordSnafu, TimestampSnafu, json_kind,
};

/// Epoch values with a magnitude below this are seconds, otherwise milliseconds.
pub const EPOCH_MILLIS_THRESHOLD: f64 = 1e11;

/// A single time-series bar (OHLCV) for a given timestamp.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bar {
    /// The timestamp for this bar (UTC).
    pub timestamp: DateTime<Utc>,

    /// Opening price.
    pub open: f64,

    /// Highest price during the bar interval.
    pub high: f64,

    /// Lowest price during the bar interval.
    pub low: f64,

    /// Closing price.
    pub close: f64,

    /// Volume traded during the bar interval. Not checked for sign.
    pub volume: f64,
}

impl Bar {
    /// `true` when the bar closed at or above its open.
    pub fn is_up(&self) -> bool {
        self.close >= self.open
    }
}

/// The `time` field as it arrives on the wire.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawTime {
    Epoch(f64),
    Text(String),
}

impl fmt::Display for RawTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawTime::Epoch(v) => write!(f, "{v}"),
            RawTime::Text(s) => write!(f, "{s:?}"),
        }
    }
}

/// One record of the `/data/{symbol}` response. Extra fields are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct RawBar {
    pub time: RawTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Resolves a wire `time` value to an absolute instant.
///
/// Returns `None` for anything that is not one of the accepted forms.
pub fn resolve_time(raw: &RawTime) -> Option<DateTime<Utc>> {
    match raw {
        RawTime::Epoch(v) => from_epoch(*v),
        RawTime::Text(s) => parse_time_text(s),
    }
}

fn from_epoch(value: f64) -> Option<DateTime<Utc>> {
    if !value.is_finite() {
        return None;
    }
    let millis = if value.abs() < EPOCH_MILLIS_THRESHOLD {
        value * 1000.0
    } else {
        value
    };
    DateTime::from_timestamp_millis(millis.round() as i64)
}

fn parse_time_text(text: &str) -> Option<DateTime<Utc>> {
    let s = text.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
    }
    // Epochs occasionally arrive quoted.
    s.parse::<f64>().ok().and_then(from_epoch)
}

/// Decodes a `/data/{symbol}` response body into bars, in response order.
///
/// Errors:
/// - [`FeedError::NotASequence`] when the body is not a JSON array
/// - [`FeedError::Record`] when a record misses a field or has a non-numeric price
/// - [`FeedError::Timestamp`] when a record's `time` cannot be resolved
pub fn decode_bars(body: Value) -> Result<Vec<Bar>, FeedError> {
    let Value::Array(records) = body else {
        return NotASequenceSnafu {
            found: json_kind(&body),
        }
        .fail();
    };

    records
        .into_iter()
        .enumerate()
        .map(|(index, record)| {
            let raw: RawBar = serde_json::from_value(record).context(RecordSnafu { index })?;
            let timestamp = resolve_time(&raw.time).with_context(|| TimestampSnafu {
                index,
                raw: raw.time.to_string(),
            })?;
            Ok(Bar {
                timestamp,
                open: raw.open,
                high: raw.high,
                low: raw.low,
                close: raw.close,
                volume: raw.volume,
            })
        })
        .collect()
}
