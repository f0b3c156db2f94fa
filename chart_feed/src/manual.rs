//! Manual fetch: pull the current selection's series outside the chart path
//! and summarize it as an inline status line.

use std::fmt;

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::{models::bar::Bar, providers::ChartDataSource, selection::SelectionController};

/// Summary of one manually fetched series.
#[derive(Debug, Clone, PartialEq)]
pub struct ManualFetchReport {
    pub symbol: String,
    pub bar_size: String,
    pub bars: usize,
    pub first: Option<DateTime<Utc>>,
    pub last: Option<DateTime<Utc>>,
    /// `last.close / first.close - 1` over the chronologically ordered bars.
    pub buy_and_hold_return: Option<f64>,
}

impl ManualFetchReport {
    pub fn from_bars(symbol: &str, bar_size: &str, bars: &[Bar]) -> Self {
        let first = bars.iter().min_by_key(|b| b.timestamp);
        let last = bars.iter().max_by_key(|b| b.timestamp);
        let buy_and_hold_return = match (first, last) {
            (Some(f), Some(l)) if f.close != 0.0 => Some(l.close / f.close - 1.0),
            _ => None,
        };
        Self {
            symbol: symbol.to_string(),
            bar_size: bar_size.to_string(),
            bars: bars.len(),
            first: first.map(|b| b.timestamp),
            last: last.map(|b| b.timestamp),
            buy_and_hold_return,
        }
    }
}

impl fmt::Display for ManualFetchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Loaded {} bars for {} ({})", self.bars, self.symbol, self.bar_size)?;
        if let (Some(first), Some(last)) = (self.first, self.last) {
            write!(
                f,
                ", {} to {}",
                first.format("%Y-%m-%d %H:%M"),
                last.format("%Y-%m-%d %H:%M")
            )?;
        }
        if let Some(ret) = self.buy_and_hold_return {
            write!(f, ", buy & hold {:+.2}%", ret * 100.0)?;
        }
        Ok(())
    }
}

/// Inline, non-blocking status of the manual fetch action.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ManualFetchStatus {
    #[default]
    Idle,
    /// The action was triggered without a complete selection.
    NoSelection,
    Loaded(ManualFetchReport),
    Failed(String),
}

impl fmt::Display for ManualFetchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ManualFetchStatus::Idle => Ok(()),
            ManualFetchStatus::NoSelection => f.write_str("Select a symbol and a bar size first"),
            ManualFetchStatus::Loaded(report) => write!(f, "{report}"),
            ManualFetchStatus::Failed(reason) => write!(f, "Fetch failed: {reason}"),
        }
    }
}

/// Fetches the selection's series without any chart involvement.
///
/// Issues exactly one request when the selection is complete and none
/// otherwise. Failures become [`ManualFetchStatus::Failed`].
pub async fn fetch_selection(
    source: &dyn ChartDataSource,
    selection: &SelectionController,
) -> ManualFetchStatus {
    let Some((symbol, bar_size)) = selection.complete_selection() else {
        return ManualFetchStatus::NoSelection;
    };

    match source.fetch_bars(symbol, bar_size).await {
        Ok(bars) => ManualFetchStatus::Loaded(ManualFetchReport::from_bars(symbol, bar_size, &bars)),
        Err(error) => {
            warn!(%symbol, %bar_size, %error, "manual fetch failed");
            ManualFetchStatus::Failed(error.to_string())
        }
    }
}
