mod common;

use std::sync::Arc;

use chart_feed::{
    errors::FeedError,
    loader::ActivationOutcome,
    manual::{ManualFetchStatus, fetch_selection},
    metadata::MetadataStore,
    models::series::Tone,
    panel::ChartPanel,
    providers::ChartDataSource,
    selection::SelectionController,
    surface::{ChartLayout, VOLUME_SCALE, headless::HeadlessFactory},
};
use chrono::{TimeZone, Utc};
use common::FakeService;
use serde_json::json;

#[tokio::test]
async fn aapl_daily_renders_one_up_bar() {
    let service = FakeService::new()
        .metadata_json(json!({"AAPL": {"bar_sizes": ["1 hour", "1 day"]}}))
        .series_json(
            "AAPL",
            "1 day",
            json!([{"time": "2024-01-02T00:00:00Z", "open": 10, "high": 12, "low": 9, "close": 11, "volume": 1000}]),
        )
        .spawn()
        .await;

    let factory = HeadlessFactory::new();
    let log = factory.log();
    let mut panel = ChartPanel::mount(
        Arc::new(service.source()),
        Arc::new(factory),
        ChartLayout::default(),
    )
    .await;

    panel.select_symbol(Some("AAPL"));
    assert_eq!(panel.selection().available_bar_sizes(), ["1 hour", "1 day"]);
    assert!(panel.select_bar_size(Some("1 day")));

    let outcome = panel.settle().await.unwrap();
    assert!(matches!(outcome, ActivationOutcome::Rendered { bars: 1 }), "{outcome:?}");
    assert_eq!(service.data_requests(), [("AAPL".to_string(), "1 day".to_string())]);

    let chart = log.live_surface().unwrap();
    let instant = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
    assert_eq!(chart.candles.len(), 1);
    assert_eq!(chart.candles[0].timestamp, instant);
    assert_eq!(chart.candles[0].close, 11.0);
    assert_eq!(chart.volume.len(), 1);
    assert_eq!(chart.volume[0].timestamp, instant);
    assert_eq!(chart.volume[0].value, 1000.0);
    assert_eq!(chart.volume[0].tone, Tone::Up);
    assert_eq!(chart.tracks[1].price_scale, VOLUME_SCALE);
    assert!(chart.fitted);
}

#[tokio::test]
async fn record_shaped_metadata_normalizes() {
    let service = FakeService::new()
        .metadata_json(json!([{"MSFT": ["5 mins"]}]))
        .spawn()
        .await;

    let catalog = MetadataStore::new(Arc::new(service.source()))
        .load_catalog()
        .await;
    assert_eq!(serde_json::to_value(&catalog).unwrap(), json!({"MSFT": ["5 mins"]}));
}

#[tokio::test]
async fn broken_metadata_gives_empty_selectors() {
    for service in [
        FakeService::new().metadata(500, "oops"),
        FakeService::new().metadata(200, "{not json"),
        FakeService::new(),
    ] {
        let service = service.spawn().await;
        let panel = ChartPanel::mount(
            Arc::new(service.source()),
            Arc::new(HeadlessFactory::new()),
            ChartLayout::default(),
        )
        .await;
        assert_eq!(panel.selection().symbol_options().count(), 0);
        assert!(!panel.selection().bar_size_selector_visible());
    }
}

#[tokio::test]
async fn server_error_builds_no_chart() {
    let service = FakeService::new()
        .metadata_json(json!({"AAPL": ["1 day"]}))
        .series("AAPL", "1 day", 500, r#"{"detail":"upstream down"}"#)
        .spawn()
        .await;

    let factory = HeadlessFactory::new();
    let log = factory.log();
    let mut panel = ChartPanel::mount(
        Arc::new(service.source()),
        Arc::new(factory),
        ChartLayout::default(),
    )
    .await;
    panel.select_symbol(Some("AAPL"));
    panel.select_bar_size(Some("1 day"));

    let outcome = panel.settle().await.unwrap();
    assert!(
        matches!(outcome, ActivationOutcome::FetchFailed(FeedError::Status { status: 500, .. })),
        "{outcome:?}"
    );
    assert_eq!(log.created(), 0);
    assert!(!panel.loader().has_live_surface());
}

#[tokio::test]
async fn non_array_and_bad_records_are_rejected() {
    let service = FakeService::new()
        .series_json("AAPL", "object", json!({"bars": []}))
        .series_json("AAPL", "no-close", json!([{"time": "2024-01-02", "open": 1, "high": 1, "low": 1, "volume": 1}]))
        .series_json("AAPL", "bad-time", json!([{"time": "soon", "open": 1, "high": 1, "low": 1, "close": 1, "volume": 1}]))
        .spawn()
        .await;
    let source = service.source();

    let err = source.fetch_bars("AAPL", "object").await.unwrap_err();
    assert!(matches!(err, FeedError::NotASequence { found: "an object", .. }), "{err}");

    let err = source.fetch_bars("AAPL", "no-close").await.unwrap_err();
    assert!(matches!(err, FeedError::Record { index: 0, .. }), "{err}");

    let err = source.fetch_bars("AAPL", "bad-time").await.unwrap_err();
    assert!(matches!(err, FeedError::Timestamp { index: 0, .. }), "{err}");
}

#[tokio::test]
async fn labels_and_symbols_survive_encoding() {
    let service = FakeService::new()
        .series_json(
            "BRK/B",
            "1+1 & co",
            json!([{"time": 1704153600, "open": 2, "high": 2, "low": 1, "close": 1, "volume": 5}]),
        )
        .spawn()
        .await;

    let bars = service.source().fetch_bars("BRK/B", "1+1 & co").await.unwrap();
    assert_eq!(bars.len(), 1);
    assert!(!bars[0].is_up());
    assert_eq!(
        service.data_requests(),
        [("BRK/B".to_string(), "1+1 & co".to_string())]
    );
}

#[tokio::test]
async fn unreachable_service_is_a_request_error() {
    // Bind then drop a listener so the port is very likely closed.
    let addr = {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };
    let config = chart_feed::config::FeedConfig::default()
        .with_base_url(&format!("http://{addr}"))
        .unwrap();
    let source = chart_feed::providers::http::HttpSource::new(&config).unwrap();

    let err = source.fetch_metadata().await.unwrap_err();
    assert!(matches!(err, FeedError::Request { .. }), "{err}");
}

#[tokio::test]
async fn manual_fetch_failure_is_reported_inline() {
    let service = FakeService::new()
        .metadata_json(json!({"AAPL": ["1 day"]}))
        .series("AAPL", "1 day", 500, "boom")
        .spawn()
        .await;
    let mut panel = ChartPanel::mount(
        Arc::new(service.source()),
        Arc::new(HeadlessFactory::new()),
        ChartLayout::default(),
    )
    .await;
    panel.select_symbol(Some("AAPL"));
    panel.select_bar_size(Some("1 day"));
    panel.settle().await;

    let status = panel.run_manual_fetch().await.to_string();
    assert!(status.starts_with("Fetch failed: "), "{status}");
    assert!(status.contains("500"), "{status}");
    assert_eq!(service.data_requests().len(), 2);
}

#[tokio::test]
async fn standalone_fetch_sends_a_single_data_request() {
    let service = FakeService::new()
        .metadata_json(json!({"AAPL": ["1 day"]}))
        .series_json(
            "AAPL",
            "1 day",
            json!([
                {"time": "2024-01-02", "open": 10, "high": 11, "low": 9, "close": 10, "volume": 1},
                {"time": "2024-01-03", "open": 10, "high": 16, "low": 9, "close": 15, "volume": 1}
            ]),
        )
        .spawn()
        .await;
    let source = service.source();

    let catalog = MetadataStore::new(Arc::new(service.source())).load_catalog().await;
    let mut selection = SelectionController::new(Arc::new(catalog));
    selection.set_symbol(Some("AAPL"));
    assert!(!selection.set_bar_size(Some("1 week")));
    assert_eq!(fetch_selection(&source, &selection).await, ManualFetchStatus::NoSelection);
    assert!(service.data_requests().is_empty());

    assert!(selection.set_bar_size(Some("1 day")));
    let ManualFetchStatus::Loaded(report) = fetch_selection(&source, &selection).await else {
        panic!("expected a loaded report");
    };
    assert_eq!(report.bars, 2);
    assert_eq!(report.buy_and_hold_return, Some(0.5));
    assert_eq!(service.data_requests(), [("AAPL".to_string(), "1 day".to_string())]);
}
