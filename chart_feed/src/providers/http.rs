use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use snafu::ResultExt;
use tracing::debug;
use url::{Url, form_urlencoded};

use crate::{
    config::FeedConfig,
    errors::{ClientBuildSnafu, FeedError, FeedInitError, InvalidJsonSnafu, RequestSnafu, StatusSnafu, UrlSnafu},
    models::bar::{Bar, decode_bars},
    providers::ChartDataSource,
};

/// [`ChartDataSource`] backed by the HTTP metadata/data API.
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: Client,
    base_url: Url,
}

impl HttpSource {
    /// Creates a source for `config.base_url` with the configured timeout.
    pub fn new(config: &FeedConfig) -> Result<Self, FeedInitError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .context(ClientBuildSnafu)?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `{base}/metadata`
    pub fn metadata_url(&self) -> Result<Url, FeedError> {
        self.endpoint(&["metadata"])
    }

    /// `{base}/data/{symbol}?bar_size={label}`.
    ///
    /// The symbol is encoded as a path segment and the label is
    /// percent-encoded, so `1 day` travels as `1%20day`.
    pub fn bars_url(&self, symbol: &str, bar_size: &str) -> Result<Url, FeedError> {
        let mut url = self.endpoint(&["data", symbol])?;
        // form encoding writes spaces as '+' and escapes literal '+' as %2B,
        // so swapping back yields plain percent-encoding.
        let label: String = form_urlencoded::byte_serialize(bar_size.as_bytes())
            .collect::<String>()
            .replace('+', "%20");
        url.set_query(Some(&format!("bar_size={label}")));
        Ok(url)
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, FeedError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                UrlSnafu {
                    message: format!("{} cannot be a base URL", self.base_url),
                }
                .build()
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json(&self, url: Url) -> Result<Value, FeedError> {
        debug!(%url, "GET");
        let response = self.client.get(url.clone()).send().await.context(RequestSnafu)?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown API error".to_string());
            return StatusSnafu {
                url: url.to_string(),
                status: status.as_u16(),
                body,
            }
            .fail();
        }

        let bytes = response.bytes().await.context(RequestSnafu)?;
        serde_json::from_slice(&bytes).context(InvalidJsonSnafu)
    }
}

#[async_trait]
impl ChartDataSource for HttpSource {
    async fn fetch_metadata(&self) -> Result<Value, FeedError> {
        let url = self.metadata_url()?;
        self.get_json(url).await
    }

    async fn fetch_bars(&self, symbol: &str, bar_size: &str) -> Result<Vec<Bar>, FeedError> {
        let url = self.bars_url(symbol, bar_size)?;
        let body = self.get_json(url).await?;
        decode_bars(body)
    }
}
