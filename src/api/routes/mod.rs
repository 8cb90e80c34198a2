//! API route declarations (e.g., /api/v1/*)

pub mod capture_routes;
pub mod chart_routes;
pub mod import_routes;
pub mod note_routes;
pub mod setting_routes;
pub mod system_routes;
