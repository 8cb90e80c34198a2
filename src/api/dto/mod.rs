//! API envelope and request/response DTOs.

pub mod capture_dto;
pub mod chart_dto;
pub mod import_dto;
pub mod note_dto;
pub mod setting_dto;

use serde::Serialize;

#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self { success: true, data }
    }
}
