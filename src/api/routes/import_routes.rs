//! Import routes (e.g., /api/v1/import/*)

use axum::{routing::post, Router};

use crate::api::controller::import::ImportController;
use crate::app_state::AppState;

pub fn import_routes() -> Router<AppState> {
    Router::new().route("/sheet", post(ImportController::import_sheet))
}
