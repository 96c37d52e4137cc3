use std::process::ExitCode;

use audio::AudioDownloader;
use clap::Parser;
use config::Config;
use site::PlayerExtractor;
use tracing_subscriber::EnvFilter;

use crate::parse_args::ArgConfig;
mod audio;
mod config;
mod download;
mod error;
mod fileops;
mod parse_args;
mod site;
mod utils;

/// diagnostics go to stderr, `RUST_LOG` wins over the verbosity flag
fn init_tracing(verbose: bool) {
    let default = if verbose { "freesound=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let c = ArgConfig::parse();
    init_tracing(c.verbose);
    let config = Config::from_args(&c);
    tracing::debug!(?config, "starting run");
    let downloader = match AudioDownloader::new(config, PlayerExtractor) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    if downloader.operate(&c.urls).await.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
