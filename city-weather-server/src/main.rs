//! Binary crate for the `city-weather` service.
//!
//! This crate focuses on:
//! - Parsing CLI arguments and interactive configuration
//! - Logging setup
//! - The HTTP surface: routing, API-key checks, response encoding

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod auth;
mod cli;
mod error;
mod handlers;
mod server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let dotenv = dotenvy::dotenv();

    let cmd = cli::Cli::parse();
    init_tracing(&cmd.log_level);

    if let Some(e) = dotenv_error(dotenv) {
        tracing::warn!(error = %e, "Ignoring unreadable .env file");
    }

    cmd.run().await
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

/// A missing `.env` is normal; anything else is worth reporting.
fn dotenv_error<T>(result: Result<T, dotenvy::Error>) -> Option<dotenvy::Error> {
    match result {
        Err(e) if !e.not_found() => Some(e),
        _ => None,
    }
}
