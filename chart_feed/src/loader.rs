//! Series loader and chart lifecycle.
//!
//! Each call to [`SeriesLoader::activate`] starts one *activation*: fetch the
//! bars for a `(symbol, bar_size)` pair, derive the aligned price/volume
//! series, and build a chart surface for it.
//!
//! ## Staleness
//! Every activation takes a fresh generation number and becomes the current
//! one. When its fetch completes, the result is applied only if that
//! generation is still current; otherwise it is dropped as
//! [`ActivationOutcome::Stale`]. A slow response for an old selection can
//! therefore never replace the chart of a newer one.
//!
//! ## Ownership
//! The loader state (generation counter, current generation, surface slot)
//! sits behind one mutex. The generation check and the surface swap happen
//! under that lock with no await in between, so there is never more than one
//! live surface and never a window where a stale result can slip in.
//!
//! ## Disposal
//! [`Disposer::dispose`] suppresses the activation's pending effect, aborts
//! its task, and disposes the surface it built (and only that surface). It
//! is idempotent.

use std::sync::{
    Arc, Mutex, MutexGuard, PoisonError, Weak,
    atomic::{AtomicBool, Ordering},
};

use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, error, info, warn};

use crate::{
    errors::FeedError,
    models::series::ChartSeries,
    providers::ChartDataSource,
    surface::{ChartLayout, ChartSurface, SurfaceError, SurfaceFactory, SurfaceSlot},
};

/// How one activation ended.
#[derive(Debug)]
pub enum ActivationOutcome {
    /// A surface with `bars` bars is now live.
    Rendered { bars: usize },
    /// A newer activation (or a disposer) superseded this one before its
    /// result arrived. Nothing was touched.
    Stale,
    /// The fetch or decode failed. The mount point is left empty.
    FetchFailed(FeedError),
    /// Building or filling the surface failed. The mount point is left empty.
    RenderFailed(SurfaceError),
    /// The task was aborted by its disposer before it finished.
    Aborted,
}

impl ActivationOutcome {
    pub fn is_rendered(&self) -> bool {
        matches!(self, ActivationOutcome::Rendered { .. })
    }
}

#[derive(Debug, Default)]
struct LoaderState {
    next_generation: u64,
    current: Option<u64>,
    slot: SurfaceSlot,
}

struct Shared {
    source: Arc<dyn ChartDataSource>,
    factory: Arc<dyn SurfaceFactory>,
    layout: ChartLayout,
    state: Mutex<LoaderState>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, LoaderState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn run(&self, generation: u64, symbol: String, bar_size: String) -> ActivationOutcome {
        let fetched = self.source.fetch_bars(&symbol, &bar_size).await;

        let mut state = self.lock();
        if state.current != Some(generation) {
            debug!(generation, %symbol, %bar_size, "discarding stale series response");
            return ActivationOutcome::Stale;
        }

        let bars = match fetched {
            Ok(bars) => bars,
            Err(error) => {
                warn!(generation, %symbol, %bar_size, %error, "series fetch failed; no chart");
                state.slot.clear();
                return ActivationOutcome::FetchFailed(error);
            }
        };

        let series = ChartSeries::from_bars(bars);
        state.slot.clear();
        match self.build_surface(&series) {
            Ok(surface) => {
                state.slot.install(generation, surface);
                info!(generation, %symbol, %bar_size, bars = series.len(), "chart rendered");
                ActivationOutcome::Rendered { bars: series.len() }
            }
            Err(error) => {
                error!(generation, %symbol, %bar_size, %error, "chart construction failed");
                ActivationOutcome::RenderFailed(error)
            }
        }
    }

    /// Creates a surface and fills it. A surface that fails midway is
    /// disposed before the error is returned.
    fn build_surface(&self, series: &ChartSeries) -> Result<Box<dyn ChartSurface>, SurfaceError> {
        let mut surface = self.factory.create()?;
        match render_into(surface.as_mut(), &self.layout, series) {
            Ok(()) => Ok(surface),
            Err(error) => {
                surface.dispose();
                Err(error)
            }
        }
    }
}

/// Adds the price and volume tracks, pushes the series, and fits the view.
pub fn render_into(
    surface: &mut dyn ChartSurface,
    layout: &ChartLayout,
    series: &ChartSeries,
) -> Result<(), SurfaceError> {
    let price = surface.add_track(&layout.price)?;
    let volume = surface.add_track(&layout.volume)?;
    surface.set_candles(price, &series.price)?;
    surface.set_histogram(volume, &series.volume)?;
    surface.fit_content()
}

/// Owner of the mount point and its at-most-one chart surface.
#[derive(Clone)]
pub struct SeriesLoader {
    shared: Arc<Shared>,
}

impl SeriesLoader {
    pub fn new(
        source: Arc<dyn ChartDataSource>,
        factory: Arc<dyn SurfaceFactory>,
        layout: ChartLayout,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                source,
                factory,
                layout,
                state: Mutex::new(LoaderState::default()),
            }),
        }
    }

    /// Starts an activation for `(symbol, bar_size)` on the current tokio
    /// runtime and makes it the current generation.
    ///
    /// Callers should dispose the previous activation first; if they don't,
    /// the previous one is still superseded and its result discarded.
    pub fn activate(&self, symbol: &str, bar_size: &str) -> Activation {
        let generation = {
            let mut state = self.shared.lock();
            state.next_generation += 1;
            state.current = Some(state.next_generation);
            state.next_generation
        };
        debug!(generation, symbol, bar_size, "activation started");

        let shared = Arc::clone(&self.shared);
        let (symbol, bar_size) = (symbol.to_string(), bar_size.to_string());
        let task = tokio::spawn(async move { shared.run(generation, symbol, bar_size).await });

        Activation {
            generation,
            disposer: Disposer {
                inner: Arc::new(DisposerInner {
                    generation,
                    shared: Arc::downgrade(&self.shared),
                    abort: task.abort_handle(),
                    disposed: AtomicBool::new(false),
                }),
            },
            task: Some(task),
        }
    }

    /// Generation whose result would currently be applied, if any.
    pub fn current_generation(&self) -> Option<u64> {
        self.shared.lock().current
    }

    pub fn has_live_surface(&self) -> bool {
        self.shared.lock().slot.is_live()
    }

    /// Generation that built the live surface.
    pub fn live_generation(&self) -> Option<u64> {
        self.shared.lock().slot.owner()
    }

    /// Teardown: suppresses any pending activation and disposes the live
    /// surface.
    pub fn shutdown(&self) {
        let mut state = self.shared.lock();
        state.current = None;
        if state.slot.clear() {
            debug!("chart surface disposed on shutdown");
        }
    }
}

/// Handle to one running activation.
#[derive(Debug)]
pub struct Activation {
    generation: u64,
    disposer: Disposer,
    task: Option<JoinHandle<ActivationOutcome>>,
}

impl Activation {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// A cloneable disposer for this activation.
    pub fn disposer(&self) -> Disposer {
        self.disposer.clone()
    }

    pub fn dispose(&self) {
        self.disposer.dispose();
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Waits for the activation to end. Returns `None` if the outcome was
    /// already taken.
    pub async fn wait(&mut self) -> Option<ActivationOutcome> {
        let task = self.task.take()?;
        Some(match task.await {
            Ok(outcome) => outcome,
            Err(join_error) if join_error.is_cancelled() => ActivationOutcome::Aborted,
            Err(join_error) => {
                error!(generation = self.generation, %join_error, "activation task panicked");
                ActivationOutcome::Aborted
            }
        })
    }
}

/// Tears down what one activation created. Safe to call any number of times.
#[derive(Debug, Clone)]
pub struct Disposer {
    inner: Arc<DisposerInner>,
}

#[derive(Debug)]
struct DisposerInner {
    generation: u64,
    shared: Weak<Shared>,
    abort: AbortHandle,
    disposed: AtomicBool,
}

impl Disposer {
    pub fn dispose(&self) {
        if self.inner.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        let generation = self.inner.generation;
        self.inner.abort.abort();

        let Some(shared) = self.inner.shared.upgrade() else {
            return;
        };
        let mut state = shared.lock();
        if state.current == Some(generation) {
            state.current = None;
        }
        if state.slot.clear_if_owned(generation) {
            debug!(generation, "chart surface disposed");
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::Acquire)
    }
}
