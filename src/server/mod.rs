//! Read-only HTTP API over the stats store.
//!
//! Thin by design: request validation and JSON serialization over the
//! repository, consumed by the dashboard front end. All writes happen in
//! the scrape pipeline, never here.

mod handlers;
mod routes;

pub use routes::create_router;

use std::net::SocketAddr;
use std::sync::Arc;

use crate::config::Settings;
use crate::repository::StatsRepository;

/// Shared state for the API server.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<StatsRepository>,
}

impl AppState {
    pub fn new(settings: &Settings) -> anyhow::Result<Self> {
        let repo = StatsRepository::new(&settings.database_path)?;
        repo.ensure_indexes()?;
        Ok(Self {
            repo: Arc::new(repo),
        })
    }
}

/// Start the API server.
pub async fn serve(settings: &Settings, host: &str, port: u16) -> anyhow::Result<()> {
    let state = AppState::new(settings)?;
    let app = create_router(state);

    let addr: SocketAddr = format!("{host}:{port}").parse()?;
    tracing::info!("starting API server at http://{addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
