use clap::Parser;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::prelude::*;

mod cli;
mod config;
mod core;
mod utils;

use cli::Cli;
use config::Config;
use crate::core::{Reporter, SystemRunner, EXIT_USAGE};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::load()?;

    // Trivially-wrong invocations fail before anything is probed or logged.
    let request = match cli.request().and_then(|request| {
        request.prepare_dest()?;
        Ok(request)
    }) {
        Ok(request) => request,
        Err(err) => {
            eprintln!("error: {err}");
            eprintln!("usage: ytgrab --url <URL> --type <video|playlist> [--path <DIR>] [--audio-only]");
            std::process::exit(EXIT_USAGE.into());
        }
    };

    init_logging(&config, cli.verbose)?;
    info!("starting ytgrab v{}", env!("CARGO_PKG_VERSION"));

    let runner = SystemRunner::new();
    let (outcome, deps) = cli.run(&runner, &config, &request).await?;

    let sink = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_file)?;
    let mut reporter = Reporter::new(sink);
    let code = reporter.report(&outcome, &deps, &request);
    std::process::exit(code.into());
}

/// Two sinks: the terminal for the operator, an append-only file for the
/// full record including forwarded downloader output.
fn init_logging(config: &Config, verbose: bool) -> anyhow::Result<()> {
    if let Some(dir) = config.log_file.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_file)?;

    let stderr_level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr)
                .with_filter(stderr_level),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Arc::new(file))
                .with_filter(LevelFilter::DEBUG),
        )
        .init();
    Ok(())
}
