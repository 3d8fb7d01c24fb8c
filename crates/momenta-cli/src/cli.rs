use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "momenta",
    version,
    about = "Market-data sync for the momentum report"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Sync grouped daily bars for the anchor implied by an as-of date.
    Sync(SyncArgs),
    /// Report how many bars the store holds for a date.
    Coverage(CoverageArgs),
}

#[derive(Debug, Args)]
pub struct SyncArgs {
    /// As-of date (YYYY-MM-DD); defaults to today in UTC. The sync targets
    /// the most recent Thursday on or before this date.
    #[arg(long, value_name = "DATE")]
    pub as_of: Option<String>,

    /// Universe file: one ticker per line, '#' starts a comment.
    #[arg(long, value_name = "FILE")]
    pub universe: PathBuf,

    /// Benchmark ETF kept alongside the universe.
    #[arg(long, default_value = "VOO")]
    pub benchmark: String,

    /// Weekday attempts beyond the anchor before giving up.
    #[arg(long, default_value_t = 5)]
    pub lookback: u32,

    /// Fraction of the universe already stored above which the grouped
    /// fetch is skipped.
    #[arg(long, default_value_t = 0.9)]
    pub coverage_threshold: f64,

    /// Database file; defaults to $MOMENTA_HOME/data/market.duckdb.
    #[arg(long, value_name = "PATH")]
    pub db: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct CoverageArgs {
    /// Date to inspect (YYYY-MM-DD).
    #[arg(long, value_name = "DATE")]
    pub date: String,

    /// Database file; defaults to $MOMENTA_HOME/data/market.duckdb.
    #[arg(long, value_name = "PATH")]
    pub db: Option<PathBuf>,
}
