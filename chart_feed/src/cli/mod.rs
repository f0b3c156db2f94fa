use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to the config file (chart_feed.toml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Base URL of the data service; overrides the config file and environment
    #[arg(long)]
    pub base_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the normalized symbol catalog as JSON
    Catalog,

    /// Load a series into a headless chart and summarize what it shows
    Render {
        /// Ticker symbol (e.g. "AAPL")
        #[arg(long)]
        symbol: String,

        /// Bar size label exactly as the catalog lists it (e.g. "1 day")
        #[arg(long)]
        bar_size: String,
    },

    /// Fetch a series without charting it and report on it
    Fetch {
        /// Ticker symbol (e.g. "AAPL")
        #[arg(long)]
        symbol: String,

        /// Bar size label exactly as the catalog lists it (e.g. "1 day")
        #[arg(long)]
        bar_size: String,
    },
}
