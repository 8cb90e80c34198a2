use serde::Deserialize;
use validator::Validate;

/// Upsert payload for one chart-point note. The `(chart_key, point_date,
/// point_slot)` triple is the store's unique key.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NoteUpsertRequest {
    #[validate(length(min = 1, max = 128))]
    pub chart_key: String,

    #[validate(length(min = 10, max = 10))]
    pub point_date: String,

    /// Bucket label ("9".."24" or "09:00".."24:00"); empty for day-level notes.
    #[validate(length(max = 16))]
    #[serde(default)]
    pub point_slot: String,

    #[validate(length(max = 2000))]
    #[serde(default)]
    pub note: String,
}
