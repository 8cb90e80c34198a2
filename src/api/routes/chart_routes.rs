//! Chart routes (e.g., /api/v1/charts/*)

use axum::{routing::get, Router};

use crate::api::controller::chart::ChartController;
use crate::app_state::AppState;

pub fn chart_routes() -> Router<AppState> {
    Router::new()
        .route("/day", get(ChartController::get_day_chart))
        .route("/cart/fine", get(ChartController::get_cart_fine))
        .route("/rank", get(ChartController::get_rank_chart))
        .route("/rank/trend", get(ChartController::get_rank_trend))
        .route("/overlay", get(ChartController::get_overlay))
        .route("/trend", get(ChartController::get_trend))
}
