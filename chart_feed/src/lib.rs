//! Chart feed: a stock-chart panel backed by a metadata/data HTTP service.
//!
//! The panel loads a catalog of symbols and their bar sizes, lets a caller
//! pick a `(symbol, bar_size)` pair, and keeps exactly one chart surface in
//! sync with the latest complete selection.

#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod errors;
pub mod loader;
pub mod manual;
pub mod metadata;
pub mod models;
pub mod panel;
pub mod providers;
pub mod selection;
pub mod surface;
