//! Capture routes (e.g., /api/v1/capture/*)

use axum::{
    routing::{get, post},
    Router,
};

use crate::api::controller::capture::CaptureController;
use crate::app_state::AppState;

pub fn capture_routes() -> Router<AppState> {
    Router::new()
        .route("/observe", post(CaptureController::observe))
        .route("/last-write", get(CaptureController::last_write))
}
