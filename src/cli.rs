//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

/// Fetch the Oscar films dataset and write it as CSV tables.
///
/// Filmfetch downloads the year-grouped film listing, fetches every film's
/// detail page concurrently with retry, and writes a raw and a cleaned table.
/// Flags override the config file, which overrides built-in defaults.
#[derive(Parser, Debug)]
#[command(name = "filmfetch")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Listing URL [default: http://oscars.yipitdata.com/]
    #[arg(long)]
    pub base_url: Option<String>,

    /// Directory for the output tables [default: data]
    #[arg(short = 'o', long)]
    pub output_dir: Option<PathBuf>,

    /// Maximum concurrent detail requests (1-100) [default: 20]
    #[arg(short = 'c', long, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub concurrency: Option<u8>,

    /// Attempts per URL, first try included (1-10) [default: 5]
    #[arg(short = 'r', long, value_parser = clap::value_parser!(u8).range(1..=10))]
    pub max_attempts: Option<u8>,

    /// Connect timeout in seconds (1-3600) [default: 10]
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub connect_timeout: Option<u64>,

    /// Read timeout in seconds (1-3600) [default: 30]
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub read_timeout: Option<u64>,

    /// Config file path [default: $XDG_CONFIG_HOME/filmfetch/config.toml]
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Write only the raw table
    #[arg(long)]
    pub skip_clean: bool,

    /// Print the run summary as JSON on stdout
    #[arg(long)]
    pub json: bool,
}
