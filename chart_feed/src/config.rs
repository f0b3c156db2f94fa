//! Feed configuration: where the data service lives and how charts are laid out.
//!
//! Loaded from a small TOML file, every key optional:
//!
//! ```toml
//! base_url = "http://127.0.0.1:8000"
//! request_timeout_secs = 10
//! volume_band = 0.8
//! ```
//!
//! `CHART_FEED_BASE_URL` and `CHART_FEED_TIMEOUT_SECS` override the file via
//! [`FeedConfig::with_env_overrides`].

use std::{path::Path, time::Duration};

use serde::Deserialize;
use shared_utils::env::{optional_env_var, parse_env_var};
use snafu::ResultExt;
use url::Url;

use crate::errors::{
    ConfigParseSnafu, ConfigReadSnafu, EnvSnafu, FeedInitError, InvalidBaseUrlSnafu,
    InvalidSettingSnafu,
};

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
/// Share of the chart height above the volume band.
pub const DEFAULT_VOLUME_BAND: f64 = 0.8;

pub const BASE_URL_ENV: &str = "CHART_FEED_BASE_URL";
pub const TIMEOUT_ENV: &str = "CHART_FEED_TIMEOUT_SECS";

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawFeedConfig {
    base_url: Option<String>,
    request_timeout_secs: Option<u64>,
    volume_band: Option<f64>,
}

/// Validated feed configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedConfig {
    /// Base of the data service; `/metadata` and `/data/{symbol}` hang off it.
    pub base_url: Url,
    /// Per-request timeout applied to every HTTP call.
    pub request_timeout: Duration,
    /// Top margin of the volume track, in `[0, 1)`. `0.8` confines volume to
    /// the bottom 20% of the chart.
    pub volume_band: f64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse(DEFAULT_BASE_URL).expect("default base URL is valid"),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            volume_band: DEFAULT_VOLUME_BAND,
        }
    }
}

impl FeedConfig {
    /// Parse and validate a config from a TOML string.
    pub fn from_toml_str(toml_str: &str) -> Result<Self, FeedInitError> {
        let raw: RawFeedConfig = toml::from_str(toml_str).context(ConfigParseSnafu)?;
        Self::from_raw(raw)
    }

    /// Read a config TOML file from disk, parse, and validate it.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, FeedInitError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).context(ConfigReadSnafu {
            path: path.display().to_string(),
        })?;
        Self::from_toml_str(&text)
    }

    /// Replace the base URL, validating it.
    pub fn with_base_url(mut self, raw: &str) -> Result<Self, FeedInitError> {
        self.base_url = parse_base_url(raw)?;
        Ok(self)
    }

    /// Apply `CHART_FEED_BASE_URL` / `CHART_FEED_TIMEOUT_SECS` when set.
    pub fn with_env_overrides(mut self) -> Result<Self, FeedInitError> {
        if let Some(raw) = optional_env_var(BASE_URL_ENV) {
            self.base_url = parse_base_url(&raw)?;
        }
        if let Some(secs) = parse_env_var::<u64>(TIMEOUT_ENV).context(EnvSnafu)? {
            self.request_timeout = timeout_from_secs(secs)?;
        }
        Ok(self)
    }

    fn from_raw(raw: RawFeedConfig) -> Result<Self, FeedInitError> {
        let mut config = Self::default();
        if let Some(url) = raw.base_url {
            config.base_url = parse_base_url(&url)?;
        }
        if let Some(secs) = raw.request_timeout_secs {
            config.request_timeout = timeout_from_secs(secs)?;
        }
        if let Some(band) = raw.volume_band {
            if !(0.0..1.0).contains(&band) {
                return InvalidSettingSnafu {
                    message: format!("volume_band must be in [0, 1), got {band}"),
                }
                .fail();
            }
            config.volume_band = band;
        }
        Ok(config)
    }
}

fn timeout_from_secs(secs: u64) -> Result<Duration, FeedInitError> {
    if secs == 0 {
        return InvalidSettingSnafu {
            message: "request timeout must be at least one second",
        }
        .fail();
    }
    Ok(Duration::from_secs(secs))
}

/// Parses a base URL and checks it can carry the API paths.
pub fn parse_base_url(raw: &str) -> Result<Url, FeedInitError> {
    let url = Url::parse(raw.trim()).map_err(|e| {
        InvalidBaseUrlSnafu {
            url: raw,
            reason: e.to_string(),
        }
        .build()
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return InvalidBaseUrlSnafu {
            url: raw,
            reason: format!("unsupported scheme {}", url.scheme()),
        }
        .fail();
    }
    if url.query().is_some() || url.fragment().is_some() {
        return InvalidBaseUrlSnafu {
            url: raw,
            reason: "base URL must not carry a query or fragment",
        }
        .fail();
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    #[test]
    fn empty_file_gives_defaults() {
        let config = FeedConfig::from_toml_str("").unwrap();
        assert_eq!(config, FeedConfig::default());
        assert_eq!(config.base_url.as_str(), "http://127.0.0.1:8000/");
        assert_eq!(config.request_timeout, Duration::from_secs(10));
    }

    #[test]
    fn reads_all_keys_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            base_url = "https://charts.internal:9000/api/"
            request_timeout_secs = 3
            volume_band = 0.7
            "#
        )
        .unwrap();

        let config = FeedConfig::load(file.path()).unwrap();
        assert_eq!(config.base_url.as_str(), "https://charts.internal:9000/api/");
        assert_eq!(config.request_timeout, Duration::from_secs(3));
        assert_eq!(config.volume_band, 0.7);
    }

    #[test]
    fn rejects_bad_values() {
        let err = FeedConfig::from_toml_str("volume_band = 1.5").unwrap_err();
        assert!(err.to_string().contains("volume_band"));

        let err = FeedConfig::from_toml_str("request_timeout_secs = 0").unwrap_err();
        assert!(matches!(err, FeedInitError::InvalidSetting { .. }));

        let err = FeedConfig::from_toml_str(r#"base_url = "ftp://host""#).unwrap_err();
        assert!(matches!(err, FeedInitError::InvalidBaseUrl { .. }));

        let err = FeedConfig::from_toml_str("colour = 'red'").unwrap_err();
        assert!(matches!(err, FeedInitError::ConfigParse { .. }));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = FeedConfig::load("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, FeedInitError::ConfigRead { .. }));
    }

    #[test]
    #[serial]
    fn env_overrides_win_over_file() {
        // SAFETY: env tests are serialized.
        unsafe {
            std::env::set_var(BASE_URL_ENV, "http://localhost:5173");
            std::env::set_var(TIMEOUT_ENV, "4");
        }
        let config = FeedConfig::from_toml_str(r#"base_url = "http://10.0.0.1:8000""#)
            .unwrap()
            .with_env_overrides()
            .unwrap();
        assert_eq!(config.base_url.as_str(), "http://localhost:5173/");
        assert_eq!(config.request_timeout, Duration::from_secs(4));

        unsafe { std::env::set_var(TIMEOUT_ENV, "later") };
        let err = FeedConfig::default().with_env_overrides().unwrap_err();
        assert!(matches!(err, FeedInitError::Env { .. }));

        unsafe {
            std::env::remove_var(BASE_URL_ENV);
            std::env::remove_var(TIMEOUT_ENV);
        }
    }
}
