#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use axum::{
    Router,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::IntoResponse,
    routing::get,
};
use chart_feed::{
    config::FeedConfig,
    errors::{FeedError, StatusSnafu},
    models::bar::Bar,
    providers::{ChartDataSource, http::HttpSource},
};
use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tokio::{net::TcpListener, sync::Notify};

/// A canned HTTP answer. The body is served verbatim so tests can send
/// malformed JSON too.
#[derive(Debug, Clone)]
struct Canned {
    status: StatusCode,
    body: String,
}

impl Canned {
    fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status: StatusCode::from_u16(status).expect("valid status"),
            body: body.into(),
        }
    }
}

#[derive(Default)]
struct ServiceState {
    metadata: Option<Canned>,
    series: HashMap<(String, String), Canned>,
    requests: Mutex<Vec<(String, String)>>,
}

/// In-process fake of the metadata/data service.
#[derive(Default)]
pub struct FakeService {
    state: ServiceState,
}

/// A spawned [`FakeService`].
pub struct RunningService {
    pub base_url: String,
    state: Arc<ServiceState>,
}

impl RunningService {
    /// `(symbol, bar_size)` of every `/data` request, decoded.
    pub fn data_requests(&self) -> Vec<(String, String)> {
        self.state.requests.lock().unwrap().clone()
    }

    pub fn source(&self) -> HttpSource {
        let config = FeedConfig::default().with_base_url(&self.base_url).unwrap();
        HttpSource::new(&config).unwrap()
    }
}

#[derive(Deserialize)]
struct DataQuery {
    bar_size: String,
}

async fn metadata(State(state): State<Arc<ServiceState>>) -> impl IntoResponse {
    respond(state.metadata.clone())
}

async fn data(
    State(state): State<Arc<ServiceState>>,
    Path(symbol): Path<String>,
    Query(query): Query<DataQuery>,
) -> impl IntoResponse {
    state
        .requests
        .lock()
        .unwrap()
        .push((symbol.clone(), query.bar_size.clone()));
    respond(state.series.get(&(symbol, query.bar_size)).cloned())
}

fn respond(canned: Option<Canned>) -> impl IntoResponse {
    let canned = canned.unwrap_or_else(|| Canned::new(404, r#"{"detail":"Not Found"}"#));
    (
        canned.status,
        [(header::CONTENT_TYPE, "application/json")],
        canned.body,
    )
}

impl FakeService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn metadata(mut self, status: u16, body: impl Into<String>) -> Self {
        self.state.metadata = Some(Canned::new(status, body));
        self
    }

    pub fn metadata_json(self, body: Value) -> Self {
        self.metadata(200, body.to_string())
    }

    pub fn series(mut self, symbol: &str, bar_size: &str, status: u16, body: impl Into<String>) -> Self {
        self.state.series.insert(
            (symbol.to_string(), bar_size.to_string()),
            Canned::new(status, body),
        );
        self
    }

    pub fn series_json(self, symbol: &str, bar_size: &str, body: Value) -> Self {
        self.series(symbol, bar_size, 200, body.to_string())
    }

    pub async fn spawn(self) -> RunningService {
        let state = Arc::new(self.state);
        let app = Router::new()
            .route("/metadata", get(metadata))
            .route("/data/{symbol}", get(data))
            .with_state(Arc::clone(&state));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        RunningService {
            base_url: format!("http://{addr}"),
            state,
        }
    }
}

pub fn day(d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, d, 0, 0, 0).unwrap()
}

pub fn bar(d: u32, open: f64, close: f64) -> Bar {
    Bar {
        timestamp: day(d),
        open,
        high: open.max(close) + 1.0,
        low: open.min(close) - 1.0,
        close,
        volume: 1000.0 * d as f64,
    }
}

type Key = (String, String);

/// In-memory source whose series can be held back until a test releases
/// them, to force a particular completion order.
#[derive(Default)]
pub struct GatedSource {
    series: Vec<(Key, Vec<Bar>)>,
    gates: HashMap<Key, Arc<Notify>>,
    calls: Mutex<Vec<Key>>,
}

impl GatedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_series(mut self, symbol: &str, bar_size: &str, bars: Vec<Bar>) -> Self {
        self.series.push(((symbol.to_string(), bar_size.to_string()), bars));
        self
    }

    /// Holds `(symbol, bar_size)` responses until the returned gate is
    /// notified. Each `notify_one` releases one request.
    pub fn gate(&mut self, symbol: &str, bar_size: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.gates
            .insert((symbol.to_string(), bar_size.to_string()), Arc::clone(&gate));
        gate
    }

    pub fn calls(&self) -> Vec<Key> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChartDataSource for GatedSource {
    async fn fetch_metadata(&self) -> Result<Value, FeedError> {
        let mut catalog = Map::new();
        for ((symbol, bar_size), _) in &self.series {
            let labels = catalog.entry(symbol.clone()).or_insert_with(|| json!([]));
            if let Value::Array(labels) = labels {
                labels.push(json!(bar_size));
            }
        }
        Ok(Value::Object(catalog))
    }

    async fn fetch_bars(&self, symbol: &str, bar_size: &str) -> Result<Vec<Bar>, FeedError> {
        let key = (symbol.to_string(), bar_size.to_string());
        self.calls.lock().unwrap().push(key.clone());
        if let Some(gate) = self.gates.get(&key) {
            gate.notified().await;
        }
        match self.series.iter().find(|(k, _)| *k == key) {
            Some((_, bars)) => Ok(bars.clone()),
            None => StatusSnafu {
                url: format!("/data/{symbol}"),
                status: 404u16,
                body: "no such series",
            }
            .fail(),
        }
    }
}
