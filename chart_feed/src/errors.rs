//! Error types for the chart data pipeline.
//!
//! [`FeedError`] covers a single fetch against the data service, and
//! [`FeedInitError`] covers building a source from configuration. Neither is
//! ever allowed to escape the panel: callers log them and move on with an
//! empty catalog or no chart.

use shared_utils::config::ConfigError;
use snafu::{Backtrace, Snafu};

/// Errors that can occur while fetching or decoding data from the chart API.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum FeedError {
    /// The request never produced a response (connection refused, timeout, ...).
    #[snafu(display("HTTP request failed: {source}"))]
    Request {
        source: reqwest::Error,
        backtrace: Backtrace,
    },

    /// The service answered with a non-success status.
    #[snafu(display("{url} answered with status {status}: {body}"))]
    Status {
        url: String,
        status: u16,
        body: String,
        backtrace: Backtrace,
    },

    /// The body is not JSON at all.
    #[snafu(display("Response body is not valid JSON: {source}"))]
    InvalidJson {
        source: serde_json::Error,
        backtrace: Backtrace,
    },

    /// The data endpoint returned JSON that is not an array of records.
    #[snafu(display("Expected a JSON array of bars, found {found}"))]
    NotASequence {
        found: &'static str,
        backtrace: Backtrace,
    },

    /// One record is missing a field or has a non-numeric price.
    #[snafu(display("Bar record {index} is malformed: {source}"))]
    Record {
        index: usize,
        source: serde_json::Error,
        backtrace: Backtrace,
    },

    /// One record carries a `time` value we cannot resolve to an instant.
    #[snafu(display("Bar record {index} has an unreadable time value: {raw}"))]
    Timestamp {
        index: usize,
        raw: String,
        backtrace: Backtrace,
    },

    /// The request URL could not be assembled from the base URL.
    #[snafu(display("Cannot build request URL: {message}"))]
    Url {
        message: String,
        backtrace: Backtrace,
    },
}

/// Errors that can occur while building a source from configuration.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum FeedInitError {
    /// failed to init reqwest client
    #[snafu(display("Failed to build HTTP client: {source}"))]
    ClientBuild {
        source: reqwest::Error,
        backtrace: Backtrace,
    },

    #[snafu(display("Invalid base URL {url:?}: {reason}"))]
    InvalidBaseUrl {
        url: String,
        reason: String,
        backtrace: Backtrace,
    },

    #[snafu(display("Failed to read config file {path}: {source}"))]
    ConfigRead {
        path: String,
        source: std::io::Error,
        backtrace: Backtrace,
    },

    #[snafu(display("Failed to parse config TOML: {source}"))]
    ConfigParse {
        source: toml::de::Error,
        backtrace: Backtrace,
    },

    #[snafu(display("Invalid setting: {message}"))]
    InvalidSetting {
        message: String,
        backtrace: Backtrace,
    },

    /// An environment override is present but unusable.
    #[snafu(display("Environment override rejected: {source}"))]
    Env {
        source: ConfigError,
        backtrace: Backtrace,
    },
}

/// Short name of a JSON value's kind, for error messages.
pub(crate) fn json_kind(value: &serde_json::Value) -> &'static str {
    use serde_json::Value;
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
