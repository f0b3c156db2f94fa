//! The chart panel: catalog, selectors, and the chart behind them.
//!
//! A [`ChartPanel`] is mounted once, loads the catalog, and then reacts to
//! selector changes:
//! - picking a symbol resets the bar size and tears down the chart
//! - picking a bar size that completes the selection disposes the previous
//!   activation and starts a new one
//! - unmounting (or dropping the panel) disposes everything
//!
//! The manual fetch action is independent of all of the above.

use std::sync::Arc;

use tracing::debug;

use crate::{
    loader::{Activation, ActivationOutcome, SeriesLoader},
    manual::{ManualFetchStatus, fetch_selection},
    metadata::MetadataStore,
    providers::ChartDataSource,
    selection::SelectionController,
    surface::{ChartLayout, SurfaceFactory},
};

pub struct ChartPanel {
    source: Arc<dyn ChartDataSource>,
    selection: SelectionController,
    loader: SeriesLoader,
    active: Option<Activation>,
    manual: ManualFetchStatus,
}

impl ChartPanel {
    /// Loads the catalog once and prepares an empty selection.
    pub async fn mount(
        source: Arc<dyn ChartDataSource>,
        factory: Arc<dyn SurfaceFactory>,
        layout: ChartLayout,
    ) -> Self {
        let catalog = MetadataStore::new(Arc::clone(&source)).load_catalog().await;
        let loader = SeriesLoader::new(Arc::clone(&source), factory, layout);
        Self {
            source,
            selection: SelectionController::new(Arc::new(catalog)),
            loader,
            active: None,
            manual: ManualFetchStatus::Idle,
        }
    }

    pub fn selection(&self) -> &SelectionController {
        &self.selection
    }

    pub fn loader(&self) -> &SeriesLoader {
        &self.loader
    }

    /// The activation behind the chart, if the selection is complete.
    pub fn active(&self) -> Option<&Activation> {
        self.active.as_ref()
    }

    /// Symbol selector changed. The bar size is cleared, so the chart goes.
    pub fn select_symbol(&mut self, symbol: Option<&str>) {
        self.selection.set_symbol(symbol);
        self.release_active();
    }

    /// Bar-size selector changed.
    ///
    /// Returns `false` (and changes nothing) when the label is not offered for
    /// the current symbol.
    pub fn select_bar_size(&mut self, bar_size: Option<&str>) -> bool {
        let unchanged = self.selection.selected_bar_size() == bar_size.filter(|b| !b.is_empty());
        if !self.selection.set_bar_size(bar_size) {
            debug!(?bar_size, "ignoring bar size not offered for the current symbol");
            return false;
        }
        if unchanged && self.active.is_some() {
            return true;
        }

        self.release_active();
        if let Some((symbol, bar_size)) = self.selection.complete_selection() {
            self.active = Some(self.loader.activate(symbol, bar_size));
        }
        true
    }

    /// Waits for the current activation to end and returns its outcome.
    ///
    /// `None` when there is no activation or its outcome was already taken.
    pub async fn settle(&mut self) -> Option<ActivationOutcome> {
        self.active.as_mut()?.wait().await
    }

    /// Fetches the current selection's series without touching the chart and
    /// records the result as an inline status.
    pub async fn run_manual_fetch(&mut self) -> &ManualFetchStatus {
        self.manual = fetch_selection(self.source.as_ref(), &self.selection).await;
        &self.manual
    }

    pub fn manual_status(&self) -> &ManualFetchStatus {
        &self.manual
    }

    /// Disposes the chart and suppresses anything still in flight.
    pub fn unmount(&mut self) {
        self.release_active();
        self.loader.shutdown();
    }

    fn release_active(&mut self) {
        if let Some(activation) = self.active.take() {
            activation.dispose();
        }
    }
}

impl Drop for ChartPanel {
    fn drop(&mut self) {
        self.unmount();
    }
}
