//! Note routes (e.g., /api/v1/notes)

use axum::{routing::get, Router};

use crate::api::controller::note::NoteController;
use crate::app_state::AppState;

pub fn note_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(NoteController::list_notes).post(NoteController::upsert_note))
}
