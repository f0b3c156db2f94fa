//! A surface that renders nothing and records everything.
//!
//! Used by the CLI to summarize what a chart would show, and by tests to
//! inspect surface lifecycles. Every surface a [`HeadlessFactory`] creates
//! writes into the factory's shared [`SurfaceLog`].

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::{
    models::{bar::Bar, series::VolumePoint},
    surface::{ChartSurface, SurfaceError, SurfaceFactory, TrackId, TrackKind, TrackSpec},
};

/// Operations a [`HeadlessFactory`] can be told to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceOp {
    AddTrack,
    SetCandles,
    SetHistogram,
    FitContent,
}

/// Everything one headless surface was asked to do.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SurfaceRecord {
    pub id: usize,
    pub tracks: Vec<TrackSpec>,
    pub candles: Vec<Bar>,
    pub volume: Vec<VolumePoint>,
    pub fitted: bool,
    pub disposed: bool,
}

/// Shared, cloneable view of every surface a factory created.
#[derive(Debug, Clone, Default)]
pub struct SurfaceLog {
    records: Arc<Mutex<Vec<SurfaceRecord>>>,
}

impl SurfaceLog {
    fn lock(&self) -> MutexGuard<'_, Vec<SurfaceRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn update(&self, id: usize, f: impl FnOnce(&mut SurfaceRecord)) {
        if let Some(record) = self.lock().get_mut(id) {
            f(record);
        }
    }

    /// Number of surfaces ever created.
    pub fn created(&self) -> usize {
        self.lock().len()
    }

    /// Number of surfaces not yet disposed.
    pub fn live_surfaces(&self) -> usize {
        self.lock().iter().filter(|r| !r.disposed).count()
    }

    pub fn surfaces(&self) -> Vec<SurfaceRecord> {
        self.lock().clone()
    }

    /// The most recently created surface that is still live.
    pub fn live_surface(&self) -> Option<SurfaceRecord> {
        self.lock().iter().rev().find(|r| !r.disposed).cloned()
    }
}

/// Factory for [`HeadlessSurface`]s.
#[derive(Debug, Clone, Default)]
pub struct HeadlessFactory {
    log: SurfaceLog,
    fail_create: bool,
    fail_on: Option<SurfaceOp>,
}

impl HeadlessFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `create` call fails.
    pub fn failing_create(mut self) -> Self {
        self.fail_create = true;
        self
    }

    /// Every surface fails when asked to perform `op`.
    pub fn failing_on(mut self, op: SurfaceOp) -> Self {
        self.fail_on = Some(op);
        self
    }

    pub fn log(&self) -> SurfaceLog {
        self.log.clone()
    }
}

impl SurfaceFactory for HeadlessFactory {
    fn create(&self) -> Result<Box<dyn ChartSurface>, SurfaceError> {
        if self.fail_create {
            return Err(SurfaceError::Create("mount point unavailable".to_string()));
        }
        let id = {
            let mut records = self.log.lock();
            let id = records.len();
            records.push(SurfaceRecord {
                id,
                ..SurfaceRecord::default()
            });
            id
        };
        Ok(Box::new(HeadlessSurface {
            id,
            log: self.log.clone(),
            fail_on: self.fail_on,
            kinds: Vec::new(),
            disposed: false,
        }))
    }
}

/// Recording [`ChartSurface`].
#[derive(Debug)]
pub struct HeadlessSurface {
    id: usize,
    log: SurfaceLog,
    fail_on: Option<SurfaceOp>,
    kinds: Vec<TrackKind>,
    disposed: bool,
}

impl HeadlessSurface {
    fn check(&self, op: SurfaceOp) -> Result<(), SurfaceError> {
        if self.disposed {
            return Err(SurfaceError::Disposed);
        }
        if self.fail_on == Some(op) {
            return Err(SurfaceError::Rejected {
                operation: format!("{op:?}"),
                message: "injected failure".to_string(),
            });
        }
        Ok(())
    }

    fn check_track(&self, track: TrackId, kind: TrackKind) -> Result<(), SurfaceError> {
        match self.kinds.get(track.0) {
            Some(k) if *k == kind => Ok(()),
            Some(k) => Err(SurfaceError::Data {
                track: track.0,
                message: format!("track is {k:?}, not {kind:?}"),
            }),
            None => Err(SurfaceError::Data {
                track: track.0,
                message: "no such track".to_string(),
            }),
        }
    }
}

impl ChartSurface for HeadlessSurface {
    fn add_track(&mut self, spec: &TrackSpec) -> Result<TrackId, SurfaceError> {
        self.check(SurfaceOp::AddTrack).map_err(|e| SurfaceError::Track {
            track: spec.name.clone(),
            message: e.to_string(),
        })?;
        self.kinds.push(spec.kind);
        self.log.update(self.id, |r| r.tracks.push(spec.clone()));
        Ok(TrackId(self.kinds.len() - 1))
    }

    fn set_candles(&mut self, track: TrackId, bars: &[Bar]) -> Result<(), SurfaceError> {
        self.check(SurfaceOp::SetCandles)?;
        self.check_track(track, TrackKind::Candlestick)?;
        self.log.update(self.id, |r| r.candles = bars.to_vec());
        Ok(())
    }

    fn set_histogram(&mut self, track: TrackId, points: &[VolumePoint]) -> Result<(), SurfaceError> {
        self.check(SurfaceOp::SetHistogram)?;
        self.check_track(track, TrackKind::Histogram)?;
        self.log.update(self.id, |r| r.volume = points.to_vec());
        Ok(())
    }

    fn fit_content(&mut self) -> Result<(), SurfaceError> {
        self.check(SurfaceOp::FitContent)?;
        self.log.update(self.id, |r| r.fitted = true);
        Ok(())
    }

    fn dispose(&mut self) {
        if !self.disposed {
            self.disposed = true;
            self.log.update(self.id, |r| r.disposed = true);
        }
    }
}
