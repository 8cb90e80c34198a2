//! Sheet import DTOs
use serde::Deserialize;
use serde_json::Value;

/// Decoded spreadsheet cells, outer rows then columns, header row included.
#[derive(Deserialize)]
pub struct SheetImportRequest {
    pub rows: Vec<Vec<Value>>,
}
