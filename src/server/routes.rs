//! Router configuration for the read API.

use axum::{routing::get, Router};
use tower_http::cors::CorsLayer;

use super::handlers;
use super::AppState;

/// Create the API router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/stats/latest", get(handlers::latest))
        .route("/api/stats/agents", get(handlers::agents))
        .route("/api/stats/agents/:week", get(handlers::agents_for_week))
        .route("/api/stats/maps", get(handlers::maps))
        .route("/api/stats/maps/:week", get(handlers::maps_for_week))
        .route("/api/stats/weapons", get(handlers::weapons))
        .route("/api/stats/weapons/:week", get(handlers::weapons_for_week))
        .route("/api/stats/weeks", get(handlers::weeks))
        .route("/api/health", get(handlers::health))
        .fallback(handlers::not_found)
        .layer(CorsLayer::permissive())
        .with_state(state)
}
