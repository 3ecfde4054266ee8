//! Observable forecast state for the currently selected location.
//!
//! Selecting a new coordinate while an older fetch is still in flight
//! supersedes it: the older result is dropped when it arrives.

use parking_lot::Mutex;
use std::sync::Arc;

use crate::alerts::{derive_alerts, AlertRecord};
use crate::error::WeatherError;
use crate::fetcher::{DataSource, FetchOutcome, ForecastFetcher};
use crate::types::{Coordinate, ForecastSnapshot};

/// What a presentation layer renders.
#[derive(Debug, Clone)]
pub struct FetchState {
    pub coordinate: Option<Coordinate>,
    pub data: Option<ForecastSnapshot>,
    pub loading: bool,
    pub error: Option<Arc<WeatherError>>,
    pub source: DataSource,
}

impl Default for FetchState {
    fn default() -> Self {
        Self {
            coordinate: None,
            data: None,
            loading: false,
            error: None,
            source: DataSource::None,
        }
    }
}

impl FetchState {
    /// Alerts for the current data; empty while there is none.
    pub fn alerts(&self) -> Vec<AlertRecord> {
        self.data.as_ref().map(derive_alerts).unwrap_or_default()
    }

    pub fn is_stale(&self) -> bool {
        self.source == DataSource::StaleCache
    }

    fn apply(&mut self, outcome: FetchOutcome) {
        self.data = outcome.snapshot;
        self.error = outcome.error.map(Arc::new);
        self.source = outcome.source;
        self.loading = false;
    }
}

#[derive(Default)]
struct SessionInner {
    generation: u64,
    state: FetchState,
}

pub struct ForecastSession {
    fetcher: Arc<ForecastFetcher>,
    inner: Mutex<SessionInner>,
}

impl ForecastSession {
    pub fn new(fetcher: Arc<ForecastFetcher>) -> Self {
        Self {
            fetcher,
            inner: Mutex::new(SessionInner::default()),
        }
    }

    /// Current state snapshot.
    pub fn state(&self) -> FetchState {
        self.inner.lock().state.clone()
    }

    /// Select a coordinate and fetch its forecast.
    ///
    /// Returns `false` when a later selection superseded this one before its
    /// fetch finished; the state is then left to the later selection.
    pub async fn select(&self, coordinate: Coordinate) -> bool {
        // The ticket and the coordinate change together, so the highest
        // ticket always belongs to the coordinate left in the state.
        let ticket = {
            let mut inner = self.inner.lock();
            inner.generation += 1;
            inner.state.coordinate = Some(coordinate);
            inner.state.loading = true;
            inner.state.error = None;
            inner.generation
        };

        let outcome = self.fetcher.fetch(coordinate).await;

        let mut inner = self.inner.lock();
        if inner.generation != ticket {
            tracing::debug!("Discarding superseded forecast for {}", coordinate);
            return false;
        }
        inner.state.apply(outcome);
        true
    }
}
