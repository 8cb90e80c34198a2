//! System routes (e.g., /api/v1/system/*)

use axum::{routing::get, Router};

use crate::api::controller::system::SystemController;
use crate::app_state::AppState;

pub fn system_routes() -> Router<AppState> {
    Router::new()
        .route("/status", get(SystemController::status))
        .route("/health", get(SystemController::health))
        .route("/logs", get(SystemController::list_logs).delete(SystemController::clear_logs))
}
