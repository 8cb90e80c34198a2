//! Merger: combines per-date charts across sources and derives overlay and
//! template shapes.

use std::collections::BTreeMap;

use crate::core::time;

use super::model::{CanonicalSeries, ChartData, DaySeries, MergedChart};

/// Presentation cap on how many metrics a view lists. Applied at the API
/// edge; the merger itself always returns the full set.
pub const MAX_TEMPLATE_SERIES: usize = 12;

/// Union two day series. Series are re-sorted by metric key so the result
/// does not depend on which source was merged first; annotations union
/// bucket-wise.
pub fn merge_day(mut left: DaySeries, right: DaySeries) -> DaySeries {
    left.series.extend(right.series);
    left.series.sort_by_key(CanonicalSeries::metric_key);
    for (label, mut notes) in right.actions {
        left.actions.entry(label).or_default().append(&mut notes);
    }
    left
}

/// Union two charts by date. Associative and commutative over the set of
/// sources.
pub fn merge_chart_data(left: ChartData, right: ChartData) -> ChartData {
    let mut dates: Vec<String> = left
        .dates
        .iter()
        .chain(right.dates.iter())
        .filter_map(|d| time::date_only(d))
        .map(str::to_string)
        .collect();
    dates.sort_unstable();
    dates.dedup();

    let mut by_date: BTreeMap<String, DaySeries> = left.by_date;
    for (date, day) in right.by_date {
        match by_date.remove(&date) {
            Some(existing) => {
                by_date.insert(date, merge_day(existing, day));
            }
            None => {
                by_date.insert(date, day);
            }
        }
    }
    ChartData { dates, by_date }
}

/// Metric keys available across the requested dates, in first-seen order.
/// Returns the full set; callers cap at [`MAX_TEMPLATE_SERIES`] for display.
pub fn template_keys(chart: &ChartData, dates: &[String]) -> Vec<String> {
    let mut keys: Vec<String> = Vec::new();
    for date in dates {
        let Some(day) = chart.by_date.get(date) else { continue };
        for series in &day.series {
            let key = series.metric_key();
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
    }
    keys
}

/// Overlay one metric across the requested dates on a shared bucket axis.
/// Dates with no data get a null-only series. `None` when the metric key is
/// unknown to every requested date.
pub fn overlay(chart: &ChartData, dates: &[String], metric_key: &str) -> Option<MergedChart> {
    let prototype = dates.iter().find_map(|date| {
        chart
            .by_date
            .get(date)?
            .series
            .iter()
            .find(|s| s.metric_key() == metric_key)
    })?;

    let mut by_date = BTreeMap::new();
    for date in dates {
        let series = chart
            .by_date
            .get(date)
            .and_then(|day| day.series.iter().find(|s| s.metric_key() == metric_key))
            .cloned()
            .unwrap_or_else(|| {
                CanonicalSeries::empty(
                    prototype.category.clone(),
                    prototype.sub_category.clone(),
                    prototype.is_rate,
                    prototype.grid,
                )
            });
        by_date.insert(date.clone(), series);
    }
    Some(MergedChart {
        metric_key: metric_key.to_string(),
        grid: prototype.grid,
        by_date,
    })
}
