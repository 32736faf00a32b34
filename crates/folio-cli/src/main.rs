use std::{process, str::FromStr};

use clap::Parser;
use log::{LevelFilter, debug, error, info};

use folio_cli::{Args, render, reports};

fn main() {
    miette::set_panic_hook();

    let args = Args::parse();

    let log_level = LevelFilter::from_str(&args.log_level).unwrap_or_else(|_| {
        eprintln!(
            "Invalid log level: {}. Using 'info' instead.",
            args.log_level
        );
        LevelFilter::Info
    });

    // RUST_LOG, when set, overrides --log-level.
    env_logger::Builder::new()
        .filter_level(log_level)
        .parse_env(env_logger::Env::default())
        .init();

    info!(log_level:?; "Starting Folio");
    debug!(args:?; "Parsed arguments");

    if let Err(err) = folio_cli::run(&args) {
        let rendered: Vec<String> = reports(&err).iter().map(render).collect();
        error!("Failed\n{}", rendered.join("\n"));
        process::exit(1);
    }

    info!("Completed successfully");
}
