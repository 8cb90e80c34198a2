use axum::{http::StatusCode, response::IntoResponse, routing::get, Router};
use tower_http::cors::CorsLayer;

use crate::app_state::AppState;

/// Build the main application router
pub fn app_router() -> Router<AppState> {
    // Charts, capture, notes, import, settings, system live under /api/v1
    let api_v1 = Router::new()
        .nest("/charts", crate::api::routes::chart_routes::chart_routes())
        .nest("/capture", crate::api::routes::capture_routes::capture_routes())
        .nest("/notes", crate::api::routes::note_routes::note_routes())
        .nest("/import", crate::api::routes::import_routes::import_routes())
        .nest("/settings", crate::api::routes::setting_routes::setting_routes())
        .nest("/system", crate::api::routes::system_routes::system_routes());

    Router::new()
        // Root route
        .route("/", get(root))
        // Health check
        .route("/health", get(health_check))
        // API v1
        .nest("/api/v1", api_v1)
        // Fallback handler for 404
        .fallback(handler_404)
        // CORS for the dashboard and the interception host
        .layer(CorsLayer::very_permissive())
}

// Handler for root
async fn root() -> &'static str {
    "Server is running!"
}

// Handler for health check
async fn health_check() -> &'static str {
    "OK"
}

// Handler for 404 Not Found
async fn handler_404() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        "The requested resource was not found",
    )
}
