//! valstats - weekly Valorant statistics scraper and read API.
//!
//! Scrapes agent, map, and weapon statistics from public stat pages,
//! stores one snapshot per calendar week, and serves the stored data
//! over a small JSON API.

mod cli;
mod config;
mod error;
mod models;
mod repository;
mod scheduler;
mod scrapers;
mod server;
mod services;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (before anything else)
    let _ = dotenvy::dotenv();

    // Initialize logging based on verbosity
    let default_filter = if cli::is_verbose() {
        "valstats=debug"
    } else {
        "valstats=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Run CLI
    cli::run().await
}
