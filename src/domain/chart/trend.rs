//! Trend aggregation: one scalar per calendar date.

use super::model::{CanonicalSeries, ChartData, RankChart, TrendPoint};

/// Fine-grid slot used as the representative rank reading (19:00).
pub const RANK_TREND_SLOT: usize = 30;

/// Day aggregate: the day's final bucket when present, otherwise the mean
/// of all finite buckets, otherwise `None`.
pub fn day_aggregate(series: &CanonicalSeries) -> Option<f64> {
    if let Some(last) = series.values.last().copied().flatten() {
        return Some(last);
    }
    let finite: Vec<f64> = series.values.iter().filter_map(|v| *v).collect();
    if finite.is_empty() {
        None
    } else {
        Some(finite.iter().sum::<f64>() / finite.len() as f64)
    }
}

/// Trend for one metric across the requested dates. Dates without data get
/// a `None` point rather than being dropped, so the axis stays aligned.
pub fn trend_series(chart: &ChartData, metric_key: &str, dates: &[String]) -> Vec<TrendPoint> {
    dates
        .iter()
        .map(|date| {
            let value = chart
                .by_date
                .get(date)
                .and_then(|day| day.series.iter().find(|s| s.metric_key() == metric_key))
                .and_then(day_aggregate);
            TrendPoint { date: date.clone(), value }
        })
        .collect()
}

/// Rank trend for one shop: the 19:00 slot reading per date.
pub fn rank_trend(chart: &RankChart, shop: &str, dates: &[String]) -> Vec<TrendPoint> {
    dates
        .iter()
        .map(|date| {
            let value = chart
                .by_date_slot
                .get(date)
                .and_then(|slots| slots.get(&RANK_TREND_SLOT))
                .and_then(|ranks| ranks.get(shop))
                .copied();
            TrendPoint { date: date.clone(), value }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::time::Grid;
    use crate::domain::chart::canonicalizer::rank_chart;
    use crate::domain::chart::model::{DaySeries, RawRow, CART_CATEGORY, CART_SUB_CATEGORY};
    use serde_json::json;
    use std::collections::BTreeMap;

    fn series_with(values: &[(usize, f64)]) -> CanonicalSeries {
        let mut s = CanonicalSeries::empty(CART_CATEGORY, CART_SUB_CATEGORY, false, Grid::Fine);
        for (i, v) in values {
            s.values[*i] = Some(*v);
        }
        s
    }

    #[test]
    fn final_bucket_is_preferred() {
        let s = series_with(&[(10, 4.0), (45, 9.0)]);
        assert_eq!(day_aggregate(&s), Some(9.0));
    }

    #[test]
    fn mean_of_finite_buckets_when_final_is_null() {
        // A lone 19:00 reading is its own aggregate.
        let s = series_with(&[(30, 7.0)]);
        assert_eq!(day_aggregate(&s), Some(7.0));

        let s = series_with(&[(2, 4.0), (10, 8.0)]);
        assert_eq!(day_aggregate(&s), Some(6.0));
    }

    #[test]
    fn all_null_aggregates_to_none() {
        let s = CanonicalSeries::empty(CART_CATEGORY, CART_SUB_CATEGORY, false, Grid::Fine);
        assert_eq!(day_aggregate(&s), None);
    }

    #[test]
    fn trend_points_cover_every_requested_date() {
        let mut day = DaySeries::new();
        day.series.push(series_with(&[(45, 9.0)]));
        let mut by_date = BTreeMap::new();
        by_date.insert("2024-06-01".to_string(), day);
        let chart = ChartData { dates: vec!["2024-06-01".to_string()], by_date };

        let dates = vec!["2024-06-01".to_string(), "2024-06-02".to_string()];
        let trend = trend_series(&chart, "cart-adds", &dates);
        assert_eq!(trend.len(), 2);
        assert_eq!(trend[0].value, Some(9.0));
        assert_eq!(trend[1].value, None);
    }

    #[test]
    fn rank_trend_reads_the_nineteen_hundred_slot() {
        let rows = vec![
            RawRow::from_store_row(&json!({
                "shop_title": "Shop A", "rank": 4,
                "created_at": "2024-06-01:19:10:00",
            }))
            .unwrap(),
            RawRow::from_store_row(&json!({
                "shop_title": "Shop A", "rank": 2,
                "created_at": "2024-06-01:12:00:00",
            }))
            .unwrap(),
        ];
        let chart = rank_chart(&rows);
        let dates = vec!["2024-06-01".to_string(), "2024-06-02".to_string()];
        let trend = rank_trend(&chart, "Shop A", &dates);
        assert_eq!(trend[0].value, Some(4.0));
        assert_eq!(trend[1].value, None);
    }
}
