//! Source abstraction for the chart data service.
//!
//! [`ChartDataSource`] is the seam between the panel and whatever serves the
//! catalog and bars. [`http::HttpSource`] talks to the real HTTP API; tests
//! plug in in-memory fakes.
//!
//! # Example
//!
//! ```rust
//! use async_trait::async_trait;
//! use chart_feed::errors::FeedError;
//! use chart_feed::models::bar::Bar;
//! use chart_feed::providers::ChartDataSource;
//! use serde_json::{Value, json};
//!
//! struct Offline;
//!
//! #[async_trait]
//! impl ChartDataSource for Offline {
//!     async fn fetch_metadata(&self) -> Result<Value, FeedError> {
//!         Ok(json!({}))
//!     }
//!
//!     async fn fetch_bars(&self, _symbol: &str, _bar_size: &str) -> Result<Vec<Bar>, FeedError> {
//!         Ok(vec![])
//!     }
//! }
//! ```

pub mod http;

use async_trait::async_trait;
use serde_json::Value;

use crate::{errors::FeedError, models::bar::Bar};

/// Trait for fetching the catalog payload and OHLCV bars.
///
/// Implementations must be shareable across activation tasks.
#[async_trait]
pub trait ChartDataSource: Send + Sync {
    /// Fetches the raw `/metadata` payload. Shape normalization is the
    /// caller's job (see [`crate::models::catalog::normalize_metadata`]).
    async fn fetch_metadata(&self) -> Result<Value, FeedError>;

    /// Fetches the bars for one `(symbol, bar_size)` pair, in response order.
    async fn fetch_bars(&self, symbol: &str, bar_size: &str) -> Result<Vec<Bar>, FeedError>;
}
