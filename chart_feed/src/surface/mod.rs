//! Chart surface seam and the exclusive slot that owns the live surface.
//!
//! The charting widget is external. It is reached through [`SurfaceFactory`]
//! (create a surface on the mount point) and [`ChartSurface`] (add tracks,
//! push data, fit, dispose). [`SurfaceSlot`] is the single owner of the live
//! surface: installing a new one always disposes the old one first.

pub mod headless;

use thiserror::Error;

use crate::{
    config::FeedConfig,
    models::{bar::Bar, series::VolumePoint},
};

/// Failures reported by a chart surface.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SurfaceError {
    #[error("chart surface could not be created: {0}")]
    Create(String),

    #[error("track {track:?} could not be added: {message}")]
    Track { track: String, message: String },

    #[error("data could not be pushed to track {track}: {message}")]
    Data { track: usize, message: String },

    #[error("chart surface rejected {operation}: {message}")]
    Rejected { operation: String, message: String },

    #[error("chart surface was already disposed")]
    Disposed,
}

/// Handle to a track on one surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TrackId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    Candlestick,
    Histogram,
}

/// Vertical margins of a price scale, as fractions of the chart height.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleMargins {
    pub top: f64,
    pub bottom: f64,
}

/// Description of one display track.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackSpec {
    pub name: String,
    pub kind: TrackKind,
    /// Scale the track is plotted against. Tracks on different scales never
    /// share a vertical axis.
    pub price_scale: String,
    /// `None` keeps the surface's default scale area.
    pub margins: Option<ScaleMargins>,
}

pub const PRICE_SCALE: &str = "right";
pub const VOLUME_SCALE: &str = "volume";

/// The two tracks every chart gets: candles on the default scale and volume
/// confined to a bottom band on its own scale.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartLayout {
    pub price: TrackSpec,
    pub volume: TrackSpec,
}

impl ChartLayout {
    /// Layout whose volume track starts `band` of the way down the chart.
    pub fn with_volume_band(band: f64) -> Self {
        Self {
            price: TrackSpec {
                name: "price".to_string(),
                kind: TrackKind::Candlestick,
                price_scale: PRICE_SCALE.to_string(),
                margins: None,
            },
            volume: TrackSpec {
                name: "volume".to_string(),
                kind: TrackKind::Histogram,
                price_scale: VOLUME_SCALE.to_string(),
                margins: Some(ScaleMargins {
                    top: band,
                    bottom: 0.0,
                }),
            },
        }
    }

    pub fn from_config(config: &FeedConfig) -> Self {
        Self::with_volume_band(config.volume_band)
    }
}

impl Default for ChartLayout {
    fn default() -> Self {
        Self::from_config(&FeedConfig::default())
    }
}

/// One live visualization bound to the mount point.
pub trait ChartSurface: Send {
    fn add_track(&mut self, spec: &TrackSpec) -> Result<TrackId, SurfaceError>;

    fn set_candles(&mut self, track: TrackId, bars: &[Bar]) -> Result<(), SurfaceError>;

    fn set_histogram(&mut self, track: TrackId, points: &[VolumePoint]) -> Result<(), SurfaceError>;

    /// Fit the visible time range to the loaded data.
    fn fit_content(&mut self) -> Result<(), SurfaceError>;

    /// Release the surface. Must tolerate repeated calls.
    fn dispose(&mut self);
}

/// Creates surfaces on the mount point.
pub trait SurfaceFactory: Send + Sync {
    fn create(&self) -> Result<Box<dyn ChartSurface>, SurfaceError>;
}

/// Exclusive owner of the at-most-one live surface, tagged with the
/// activation generation that built it.
#[derive(Default)]
pub struct SurfaceSlot {
    live: Option<(u64, Box<dyn ChartSurface>)>,
}

impl SurfaceSlot {
    /// Disposes whatever is live, then takes ownership of `surface`.
    pub fn install(&mut self, generation: u64, surface: Box<dyn ChartSurface>) {
        self.clear();
        self.live = Some((generation, surface));
    }

    /// Disposes the live surface, if any. Returns whether one was disposed.
    pub fn clear(&mut self) -> bool {
        match self.live.take() {
            Some((_, mut surface)) => {
                surface.dispose();
                true
            }
            None => false,
        }
    }

    /// Disposes the live surface only if `generation` built it.
    pub fn clear_if_owned(&mut self, generation: u64) -> bool {
        if self.owner() == Some(generation) {
            self.clear()
        } else {
            false
        }
    }

    pub fn owner(&self) -> Option<u64> {
        self.live.as_ref().map(|(generation, _)| *generation)
    }

    pub fn is_live(&self) -> bool {
        self.live.is_some()
    }
}

impl std::fmt::Debug for SurfaceSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SurfaceSlot").field("owner", &self.owner()).finish()
    }
}
