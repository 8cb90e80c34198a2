//! Note API DTOs
use serde::Deserialize;

/// Both fields are comma-separated lists.
#[derive(Deserialize)]
pub struct NoteQuery {
    pub chart_keys: String,
    pub dates: String,
}

impl NoteQuery {
    fn split(raw: &str) -> Vec<String> {
        raw.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn chart_key_list(&self) -> Vec<String> {
        Self::split(&self.chart_keys)
    }

    pub fn date_list(&self) -> Vec<String> {
        Self::split(&self.dates)
    }
}
