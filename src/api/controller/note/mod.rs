//! Note controller: chart-point annotations.

use std::collections::BTreeMap;

use axum::extract::{Query, State};
use axum::Json;
use serde_json::Value;

use crate::api::dto::note_dto::NoteQuery;
use crate::api::dto::ApiResponse;
use crate::api::util::json::to_json;
use crate::app_state::AppState;
use crate::domain::note::note_upsert_request::NoteUpsertRequest;
use crate::errors::AppError;

pub struct NoteController;

impl NoteController {
    pub async fn list_notes(
        State(state): State<AppState>,
        Query(query): Query<NoteQuery>,
    ) -> Result<Json<ApiResponse<BTreeMap<String, BTreeMap<String, String>>>>, AppError> {
        to_json(
            state
                .note_service
                .fetch(&query.chart_key_list(), &query.date_list())
                .await,
        )
    }

    pub async fn upsert_note(
        State(state): State<AppState>,
        Json(req): Json<NoteUpsertRequest>,
    ) -> Result<Json<ApiResponse<Value>>, AppError> {
        to_json(state.note_service.upsert(req).await)
    }
}
