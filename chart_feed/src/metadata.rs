//! Metadata store: one-shot catalog load that never fails outward.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::{
    models::catalog::{Catalog, normalize_metadata},
    providers::ChartDataSource,
};

/// Loads and normalizes the symbol → bar-size catalog.
pub struct MetadataStore {
    source: Arc<dyn ChartDataSource>,
}

impl MetadataStore {
    pub fn new(source: Arc<dyn ChartDataSource>) -> Self {
        Self { source }
    }

    /// Fetches `/metadata` once and normalizes it.
    ///
    /// Network, status and JSON failures are logged and yield an empty
    /// catalog, so selectors simply offer no options. There is no retry.
    pub async fn load_catalog(&self) -> Catalog {
        let raw = match self.source.fetch_metadata().await {
            Ok(raw) => raw,
            Err(error) => {
                warn!(%error, "metadata fetch failed; continuing with an empty catalog");
                return Catalog::default();
            }
        };

        let (catalog, report) = normalize_metadata(&raw);
        if report.unrecognized_shape {
            warn!("metadata payload is neither an object nor an array; ignoring it");
        } else if !report.is_clean() {
            debug!(?report, "metadata normalized with dropped entries");
        }
        debug!(symbols = catalog.len(), "catalog loaded");
        catalog
    }
}
