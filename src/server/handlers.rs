//! Read API endpoint handlers.
//!
//! The API never surfaces storage failures: missing data is a 404 or an
//! empty array, and anything unexpected maps to a generic 500 with no
//! internal detail.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde_json::json;

use super::AppState;
use crate::scrapers::sanitize::is_valid_week_param;

fn error_response(status: StatusCode, error: &str, message: &str) -> Response {
    (status, Json(json!({ "error": error, "message": message }))).into_response()
}

fn bad_week(week: &str) -> Response {
    error_response(
        StatusCode::BAD_REQUEST,
        "Invalid week",
        &format!("week must match YYYY-Wnn, got {week:?}"),
    )
}

/// `GET /api/health`
pub async fn health() -> Response {
    Json(json!({
        "status": "OK",
        "timestamp": Utc::now().to_rfc3339(),
        "message": "API is up",
    }))
    .into_response()
}

/// `GET /api/stats/latest`
pub async fn latest(State(state): State<AppState>) -> Response {
    match state.repo.get_latest() {
        Some(snapshot) => Json(snapshot).into_response(),
        None => error_response(
            StatusCode::NOT_FOUND,
            "No data found",
            "no snapshots have been stored yet",
        ),
    }
}

/// `GET /api/stats/weeks`
pub async fn weeks(State(state): State<AppState>) -> Response {
    Json(state.repo.list_weeks()).into_response()
}

/// `GET /api/stats/agents`
pub async fn agents(State(state): State<AppState>) -> Response {
    Json(state.repo.get_agents(None)).into_response()
}

/// `GET /api/stats/agents/:week`
pub async fn agents_for_week(
    State(state): State<AppState>,
    Path(week): Path<String>,
) -> Response {
    if !is_valid_week_param(&week) {
        return bad_week(&week);
    }
    Json(state.repo.get_agents(Some(&week))).into_response()
}

/// `GET /api/stats/maps`
pub async fn maps(State(state): State<AppState>) -> Response {
    Json(state.repo.get_maps(None)).into_response()
}

/// `GET /api/stats/maps/:week`
pub async fn maps_for_week(State(state): State<AppState>, Path(week): Path<String>) -> Response {
    if !is_valid_week_param(&week) {
        return bad_week(&week);
    }
    Json(state.repo.get_maps(Some(&week))).into_response()
}

/// `GET /api/stats/weapons`
pub async fn weapons(State(state): State<AppState>) -> Response {
    Json(state.repo.get_weapons(None)).into_response()
}

/// `GET /api/stats/weapons/:week`
pub async fn weapons_for_week(
    State(state): State<AppState>,
    Path(week): Path<String>,
) -> Response {
    if !is_valid_week_param(&week) {
        return bad_week(&week);
    }
    Json(state.repo.get_weapons(Some(&week))).into_response()
}

/// Fallback for unknown routes.
pub async fn not_found() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found", "unknown route")
}
