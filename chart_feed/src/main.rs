use std::sync::Arc;

use anyhow::{Context, Result, bail};
use chart_feed::{
    cli::{Cli, Commands},
    config::FeedConfig,
    loader::ActivationOutcome,
    manual::{ManualFetchStatus, fetch_selection},
    metadata::MetadataStore,
    panel::ChartPanel,
    providers::{ChartDataSource, http::HttpSource},
    selection::SelectionController,
    surface::{ChartLayout, headless::HeadlessFactory},
};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn load_config(cli: &Cli) -> Result<FeedConfig> {
    let config = match &cli.config {
        Some(path) => FeedConfig::load(path)?,
        None => FeedConfig::default(),
    };
    let config = config.with_env_overrides()?;
    Ok(match &cli.base_url {
        Some(url) => config.with_base_url(url)?,
        None => config,
    })
}

fn not_offered(selection: &SelectionController, symbol: &str, bar_size: &str) -> anyhow::Error {
    let offered = selection.available_bar_sizes().join(", ");
    anyhow::anyhow!("{symbol} does not offer bar size {bar_size:?} (offered: [{offered}])")
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let http = HttpSource::new(&config).context("building HTTP client")?;
    info!(base_url = %http.base_url(), "using data service");

    let source: Arc<dyn ChartDataSource> = Arc::new(http);
    let layout = ChartLayout::from_config(&config);

    match cli.command {
        Commands::Catalog => {
            let factory = HeadlessFactory::new();
            let panel = ChartPanel::mount(source, Arc::new(factory), layout).await;
            println!("{}", serde_json::to_string_pretty(panel.selection().catalog())?);
        }
        Commands::Render { symbol, bar_size } => {
            let factory = HeadlessFactory::new();
            let log = factory.log();
            let mut panel = ChartPanel::mount(source, Arc::new(factory), layout).await;
            panel.select_symbol(Some(&symbol));
            if !panel.select_bar_size(Some(&bar_size)) {
                return Err(not_offered(panel.selection(), &symbol, &bar_size));
            }

            match panel.settle().await {
                Some(ActivationOutcome::Rendered { .. }) => {}
                Some(ActivationOutcome::FetchFailed(error)) => {
                    return Err(error).context(format!("loading {symbol} ({bar_size})"));
                }
                Some(ActivationOutcome::RenderFailed(error)) => {
                    return Err(error).context("building the chart");
                }
                other => bail!("chart was not rendered: {other:?}"),
            }

            let record = log.live_surface().context("no live chart after rendering")?;
            println!(
                "{symbol} ({bar_size}): {} candles, {} volume bars",
                record.candles.len(),
                record.volume.len()
            );
            for track in &record.tracks {
                println!("  track {:<6} {:?} on scale {:?}", track.name, track.kind, track.price_scale);
            }
            if let (Some(first), Some(last)) = (record.candles.first(), record.candles.last()) {
                println!("  range {} .. {}", first.timestamp, last.timestamp);
            }
            if let Some(point) = record.volume.last() {
                println!("  last volume {} ({})", point.value, point.tone.as_str());
            }
            panel.unmount();
        }
        Commands::Fetch { symbol, bar_size } => {
            // No chart here: validate against the catalog, then fetch once.
            let catalog = MetadataStore::new(Arc::clone(&source)).load_catalog().await;
            let mut selection = SelectionController::new(Arc::new(catalog));
            selection.set_symbol(Some(&symbol));
            if !selection.set_bar_size(Some(&bar_size)) {
                return Err(not_offered(&selection, &symbol, &bar_size));
            }
            match fetch_selection(source.as_ref(), &selection).await {
                ManualFetchStatus::Loaded(report) => println!("{report}"),
                status => bail!("{status}"),
            }
        }
    }

    Ok(())
}
