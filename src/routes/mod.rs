use axum::{
    Json, Router,
    http::{StatusCode, Uri},
    routing::get,
};

use crate::{
    response::{ApiResponse, Meta},
    state::AppState,
};

pub mod admin;
pub mod auth;
pub mod courier;
pub mod doc;
pub mod health;
pub mod panel;
pub mod params;
pub mod public;
pub mod reservations;

// Build the API router without binding state; it will be provided at the top level.
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .route("/games", get(public::games_feed))
        .nest("/auth", auth::api_router())
        .nest("/admin", admin::router().merge(reservations::router()))
        .nest("/courier", courier::router())
}

/// Every route the server answers, still waiting for its state.
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health_check))
        .merge(public::router())
        .merge(auth::router())
        .merge(panel::router())
        .nest("/api", create_api_router())
        .merge(doc::scalar_docs())
        .fallback(not_found)
}

async fn not_found(uri: Uri) -> (StatusCode, Json<ApiResponse<serde_json::Value>>) {
    let body = ApiResponse::success(
        "Not Found",
        serde_json::json!({ "path": uri.path() }),
        Some(Meta::empty()),
    );
    (StatusCode::NOT_FOUND, Json(body))
}
