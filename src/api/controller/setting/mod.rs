//! Settings controller: runtime-tunable capture settings.

use axum::extract::State;
use axum::Json;
use serde_json::Value;

use crate::api::dto::setting_dto::SettingsUpsertRequest;
use crate::api::dto::ApiResponse;
use crate::api::util::json::to_json;
use crate::app_state::AppState;
use crate::core::state::settings::SettingsEntity;
use crate::errors::AppError;

pub struct SettingController;

impl SettingController {
    pub async fn get_settings(
        State(state): State<AppState>,
    ) -> Result<Json<ApiResponse<SettingsEntity>>, AppError> {
        to_json(state.setting_service.get_settings().await)
    }

    pub async fn upsert_settings(
        State(state): State<AppState>,
        Json(req): Json<SettingsUpsertRequest>,
    ) -> Result<Json<ApiResponse<Value>>, AppError> {
        to_json(state.setting_service.upsert_settings(req.throttle_minutes).await)
    }
}
