//! CLI argument definitions for agrilink.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `sources` | List registered data sources |
//! | `regions` | List built-in regions |
//! | `aggregate` | Fetch and merge data for a region or location |
//! | `prompt` | Build the recommendation prompt for a region |
//! | `recommend` | Generate crop recommendations for a region |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--pretty` | `false` | Pretty-print JSON output |
//! | `--offline` | `false` | Refuse all upstream calls; every source falls back |
//! | `--timeout-ms` | `AGRILINK_REQUEST_TIMEOUT_MS` or `3000` | Per-source timeout |
//! | `-v` | warn | Log verbosity on stderr (`-v` info, `-vv` debug) |
//!
//! # Examples
//!
//! ```bash
//! agrilink aggregate --region Bavaria --pretty
//! agrilink aggregate --lat 48.79 --lon 11.50 --sources weather
//! agrilink --offline prompt --region Tuscany
//! ```

use clap::{ArgAction, Args, Parser, Subcommand};

/// Agricultural data aggregation CLI
#[derive(Debug, Parser)]
#[command(
    name = "agrilink",
    author,
    version,
    about = "Cached, degradable aggregation of agricultural data sources",
    long_about = "agrilink gathers sustainability metrics, farm practice advice, market prices \
and current weather for a region, caches them for a day, and substitutes fallback values \
for any source that cannot be reached.\n\
\n\
Use 'agrilink <command> --help' for command-specific help."
)]
pub struct Cli {
    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Do not contact any upstream; every source returns its fallback payload.
    #[arg(long, global = true, default_value_t = false)]
    pub offline: bool,

    /// Per-source request timeout in milliseconds.
    #[arg(long, global = true, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout_ms: Option<u64>,

    /// Increase log verbosity on stderr.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List registered data sources and their endpoints.
    Sources,
    /// List built-in regions.
    Regions,
    /// Fetch and merge data from the selected sources.
    Aggregate(AggregateArgs),
    /// Aggregate data for a region and print the recommendation prompt.
    Prompt(RegionArgs),
    /// Aggregate data for a region and generate crop recommendations.
    ///
    /// The recommendation is printed only; nothing is persisted.
    Recommend(RegionArgs),
}

#[derive(Debug, Args)]
pub struct AggregateArgs {
    /// Region name; catalog regions also supply coordinates.
    #[arg(long)]
    pub region: Option<String>,

    /// Latitude in decimal degrees.
    #[arg(long, requires = "lon", allow_hyphen_values = true)]
    pub lat: Option<f64>,

    /// Longitude in decimal degrees.
    #[arg(long, requires = "lat", allow_hyphen_values = true)]
    pub lon: Option<f64>,

    /// Comma-separated sources (default: all).
    #[arg(long)]
    pub sources: Option<String>,
}

#[derive(Debug, Args)]
pub struct RegionArgs {
    /// Catalog region, e.g. Tuscany or Bavaria.
    #[arg(long)]
    pub region: String,

    /// Override the catalog soil type.
    #[arg(long)]
    pub soil_type: Option<String>,
}
