//! Chart-ready series derived from one fetch: candles plus toned volume.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::bar::Bar;

/// Direction of a bar, used to color its volume column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Up,
    Down,
}

impl Tone {
    pub fn as_str(self) -> &'static str {
        match self {
            Tone::Up => "up",
            Tone::Down => "down",
        }
    }
}

/// One column of the volume histogram.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VolumePoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
    pub tone: Tone,
}

/// Price bars and their volume columns, index-aligned.
///
/// Both vectors have the same length and the same timestamp at every index,
/// ordered by time.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChartSeries {
    pub price: Vec<Bar>,
    pub volume: Vec<VolumePoint>,
}

impl ChartSeries {
    /// Builds the series from bars in any order.
    ///
    /// Bars are sorted by timestamp (stable, so equal timestamps keep response
    /// order) before the volume track is derived.
    pub fn from_bars(mut bars: Vec<Bar>) -> Self {
        bars.sort_by_key(|bar| bar.timestamp);
        let volume = bars
            .iter()
            .map(|bar| VolumePoint {
                timestamp: bar.timestamp,
                value: bar.volume,
                tone: if bar.is_up() { Tone::Up } else { Tone::Down },
            })
            .collect();
        Self {
            price: bars,
            volume,
        }
    }

    pub fn len(&self) -> usize {
        self.price.len()
    }

    pub fn is_empty(&self) -> bool {
        self.price.is_empty()
    }

    /// First and last timestamps, if any.
    pub fn time_range(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        Some((self.price.first()?.timestamp, self.price.last()?.timestamp))
    }
}
