//! Command-line argument definitions for the Folio CLI.
//!
//! [`Args`] is parsed with [`clap`]. Arguments select the input document,
//! where the block summary goes, the configuration file and the log level.

use clap::Parser;

/// Command-line arguments for the Folio document checker
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the input Folio document
    #[arg(help = "Path to the input file")]
    pub input: String,

    /// Write the block summary to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<String>,

    /// Path to configuration file (TOML)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}
