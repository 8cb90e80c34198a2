//! Import controller: one-shot sheet ingestion.

use axum::extract::State;
use axum::Json;

use crate::api::dto::import_dto::SheetImportRequest;
use crate::api::dto::ApiResponse;
use crate::api::util::json::to_json;
use crate::app_state::AppState;
use crate::domain::chart::model::ChartData;
use crate::errors::AppError;

pub struct ImportController;

impl ImportController {
    pub async fn import_sheet(
        State(state): State<AppState>,
        Json(req): Json<SheetImportRequest>,
    ) -> Result<Json<ApiResponse<ChartData>>, AppError> {
        to_json(state.import_service.parse_sheet(&req.rows).await)
    }
}
