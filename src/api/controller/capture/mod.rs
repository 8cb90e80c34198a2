//! Capture controller: entry point for the interception host.

use axum::extract::State;
use axum::Json;
use serde_json::Value;

use crate::api::dto::capture_dto::{ObserveRequest, ObserveResponse};
use crate::api::dto::ApiResponse;
use crate::api::util::json::to_json;
use crate::app_state::AppState;
use crate::errors::AppError;

pub struct CaptureController;

impl CaptureController {
    pub async fn observe(
        State(state): State<AppState>,
        Json(req): Json<ObserveRequest>,
    ) -> Result<Json<ApiResponse<ObserveResponse>>, AppError> {
        let (source_id, outcome) = state
            .capture_service
            .observe(&req.url, &req.body, req.recorded_at)
            .await;
        to_json(Ok(ObserveResponse {
            matched: source_id.is_some(),
            source_id: source_id.map(str::to_string),
            outcome: outcome
                .map(|o| o.as_str().to_string())
                .unwrap_or_else(|| "no_match".to_string()),
        }))
    }

    pub async fn last_write(
        State(state): State<AppState>,
    ) -> Result<Json<ApiResponse<Value>>, AppError> {
        let last = state.capture_service.last_write().await;
        to_json(Ok(serde_json::json!({ "last_write": last })))
    }
}
