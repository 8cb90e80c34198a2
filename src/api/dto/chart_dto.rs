//! Chart API DTOs
use serde::{Deserialize, Serialize};

use crate::domain::chart::model::ChartData;

/// `dates` is a comma-separated list of `YYYY-MM-DD` values.
#[derive(Deserialize)]
pub struct DatesQuery {
    pub dates: String,
}

impl DatesQuery {
    pub fn date_list(&self) -> Vec<String> {
        self.dates
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}

#[derive(Deserialize)]
pub struct FineQuery {
    pub date: String,
}

#[derive(Deserialize)]
pub struct MetricDatesQuery {
    pub metric: String,
    pub dates: String,
}

impl MetricDatesQuery {
    pub fn date_list(&self) -> Vec<String> {
        self.dates
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}

#[derive(Serialize)]
pub struct DayChartResponse {
    pub chart: ChartData,
    /// Full first-seen-order metric key union across the requested dates.
    pub template_keys: Vec<String>,
    /// `template_keys` truncated to the display cap.
    pub visible_keys: Vec<String>,
}
