//! Canonicalizer: irregular, possibly-duplicated raw rows → fixed-length
//! per-day grids.
//!
//! Pure and stateless: the output is a function of the row multiset alone.
//! Rows whose timestamp fails to parse are dropped; within one `(date,
//! bucket)` the row with the greatest `recorded_at` wins.

use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};

use crate::core::time::{self, Bucket, Grid};

use super::model::{
    CanonicalSeries, ChartData, DaySeries, RawRow, RankChart, CART_CATEGORY,
    CART_SUB_CATEGORY, FLOW_CATEGORY, FLOW_COLUMNS, RANK_CATEGORY,
};

/// Column written by the cart-log source.
pub const CART_VALUE_COLUMN: &str = "item_cart_cnt";

/// Lexicographic comparison is chronological for both supported encodings
/// because they are fixed-width and zero-padded; if that ever stops holding,
/// swap this one comparator for a numeric comparison. Ties are broken on the
/// serialized columns so resolution is independent of arrival order.
fn beats(candidate: &RawRow, incumbent: &RawRow) -> bool {
    match candidate.recorded_at.cmp(&incumbent.recorded_at) {
        std::cmp::Ordering::Greater => true,
        std::cmp::Ordering::Less => false,
        std::cmp::Ordering::Equal => {
            serde_json::to_string(&candidate.columns).unwrap_or_default()
                > serde_json::to_string(&incumbent.columns).unwrap_or_default()
        }
    }
}

fn latest_per_bucket<'a, I>(rows: I, grid: Grid) -> HashMap<Bucket, &'a RawRow>
where
    I: IntoIterator<Item = &'a RawRow>,
{
    let mut winners: HashMap<Bucket, &RawRow> = HashMap::new();
    for row in rows {
        let Some(bucket) = time::parse_bucket(&row.recorded_at, grid) else {
            continue;
        };
        match winners.entry(bucket) {
            Entry::Vacant(slot) => {
                slot.insert(row);
            }
            Entry::Occupied(mut slot) => {
                if beats(row, slot.get()) {
                    slot.insert(row);
                }
            }
        }
    }
    winners
}

fn sorted_dates<V>(by_date: &BTreeMap<String, V>) -> Vec<String> {
    by_date.keys().cloned().collect()
}

/// Cart counter rows → one hourly series per date.
pub fn cart_day_chart(rows: &[RawRow]) -> ChartData {
    let usable = rows.iter().filter(|r| r.number(CART_VALUE_COLUMN).is_some());
    let winners = latest_per_bucket(usable, Grid::Hour);

    let mut grids: BTreeMap<String, Vec<Option<f64>>> = BTreeMap::new();
    for (bucket, row) in winners {
        let grid = grids
            .entry(bucket.date.to_string())
            .or_insert_with(|| vec![None; Grid::Hour.bucket_count()]);
        grid[bucket.index] = row.number(CART_VALUE_COLUMN);
    }

    let mut by_date = BTreeMap::new();
    for (date, values) in grids {
        let mut day = DaySeries::new();
        day.series.push(CanonicalSeries {
            category: CART_CATEGORY.to_string(),
            sub_category: CART_SUB_CATEGORY.to_string(),
            is_rate: false,
            grid: Grid::Hour,
            values,
        });
        by_date.insert(date, day);
    }
    ChartData { dates: sorted_dates(&by_date), by_date }
}

/// Cart counter rows for one date at the fine resolution (enlarged view).
pub fn cart_fine_series(rows: &[RawRow], date: &str) -> CanonicalSeries {
    let usable = rows.iter().filter(|r| r.number(CART_VALUE_COLUMN).is_some());
    let winners = latest_per_bucket(usable, Grid::Fine);

    let mut series =
        CanonicalSeries::empty(CART_CATEGORY, CART_SUB_CATEGORY, false, Grid::Fine);
    for (bucket, row) in winners {
        if bucket.date.to_string() == date {
            series.values[bucket.index] = row.number(CART_VALUE_COLUMN);
        }
    }
    series
}

/// Traffic-source rows → four fine-grid series per date. The winning row of
/// a bucket supplies every column; columns it lacks stay `None`.
pub fn flow_day_chart(rows: &[RawRow]) -> ChartData {
    let winners = latest_per_bucket(rows, Grid::Fine);

    type ColumnGrids = Vec<Vec<Option<f64>>>;
    let mut grids: BTreeMap<String, ColumnGrids> = BTreeMap::new();
    for (bucket, row) in winners {
        let per_column = grids
            .entry(bucket.date.to_string())
            .or_insert_with(|| {
                vec![vec![None; Grid::Fine.bucket_count()]; FLOW_COLUMNS.len()]
            });
        for (i, column) in FLOW_COLUMNS.iter().enumerate() {
            per_column[i][bucket.index] = row.number(column.column);
        }
    }

    let mut by_date = BTreeMap::new();
    for (date, per_column) in grids {
        let mut day = DaySeries::new();
        for (i, column) in FLOW_COLUMNS.iter().enumerate() {
            day.series.push(CanonicalSeries {
                category: FLOW_CATEGORY.to_string(),
                sub_category: column.sub_category.to_string(),
                is_rate: column.is_rate,
                grid: Grid::Fine,
                values: per_column[i].clone(),
            });
        }
        by_date.insert(date, day);
    }
    ChartData { dates: sorted_dates(&by_date), by_date }
}

/// Market-rank rows → per-shop slot values. Resolution is per
/// `(date, slot, shop)` since every capture writes one row per shop.
pub fn rank_chart(rows: &[RawRow]) -> RankChart {
    let mut winners: HashMap<(Bucket, String), &RawRow> = HashMap::new();
    for row in rows {
        let Some(bucket) = time::parse_bucket(&row.recorded_at, Grid::Fine) else {
            continue;
        };
        let shop = row.text("shop_title").unwrap_or("").to_string();
        if shop.is_empty() || row.number("rank").is_none() {
            continue;
        }
        match winners.entry((bucket, shop)) {
            Entry::Vacant(slot) => {
                slot.insert(row);
            }
            Entry::Occupied(mut slot) => {
                if beats(row, slot.get()) {
                    slot.insert(row);
                }
            }
        }
    }

    let mut chart = RankChart::default();
    let mut shops: Vec<String> = Vec::new();
    for ((bucket, shop), row) in winners {
        let Some(rank) = row.number("rank") else { continue };
        if !shops.contains(&shop) {
            shops.push(shop.clone());
        }
        chart
            .by_date_slot
            .entry(bucket.date.to_string())
            .or_default()
            .entry(bucket.index)
            .or_default()
            .insert(shop, rank);
    }
    shops.sort_unstable();
    chart.shop_names = shops;
    chart
}

/// Materialize one date of a rank chart as per-shop canonical series.
pub fn rank_day_series(chart: &RankChart, date: &str) -> Vec<CanonicalSeries> {
    let empty = BTreeMap::new();
    let day = chart.by_date_slot.get(date).unwrap_or(&empty);
    chart
        .shop_names
        .iter()
        .map(|shop| {
            let mut series =
                CanonicalSeries::empty(RANK_CATEGORY, shop.clone(), false, Grid::Fine);
            for (slot, ranks) in day {
                if let Some(rank) = ranks.get(shop) {
                    series.values[*slot] = Some(*rank);
                }
            }
            series
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cart_row(recorded_at: &str, cnt: impl Into<serde_json::Value>) -> RawRow {
        RawRow::from_store_row(&json!({
            "item_cart_cnt": cnt.into(),
            "created_at": recorded_at,
        }))
        .unwrap()
    }

    #[test]
    fn latest_recorded_at_wins_within_a_bucket() {
        let rows = vec![
            cart_row("2024-06-01T09:05:00+08:00", 3),
            cart_row("2024-06-01T09:18:00+08:00", 7),
        ];
        let series = cart_fine_series(&rows, "2024-06-01");
        assert_eq!(series.values.len(), 46);
        assert_eq!(series.values[0], Some(7.0));
        assert!(series.values[1..].iter().all(Option::is_none));
    }

    #[test]
    fn post_midnight_rows_land_on_previous_day_final_bucket() {
        let rows = vec![cart_row("2024-06-02T00:10:00+08:00", 5)];
        let series = cart_fine_series(&rows, "2024-06-01");
        assert_eq!(series.values[45], Some(5.0));

        let chart = cart_day_chart(&rows);
        assert_eq!(chart.dates, vec!["2024-06-01".to_string()]);
        let day = &chart.by_date["2024-06-01"];
        assert_eq!(day.series[0].values[15], Some(5.0));
    }

    #[test]
    fn canonicalization_is_order_independent_and_duplicate_tolerant() {
        let rows = vec![
            cart_row("2024-06-01:09:05:00", 3),
            cart_row("2024-06-01:10:40:00", 11),
            cart_row("2024-06-01:09:18:00", 7),
            cart_row("2024-06-02:00:02:00", 20),
        ];
        let mut shuffled = rows.clone();
        shuffled.reverse();
        assert_eq!(cart_day_chart(&rows), cart_day_chart(&shuffled));

        let mut doubled = rows.clone();
        doubled.extend(rows.clone());
        assert_eq!(cart_day_chart(&rows), cart_day_chart(&doubled));
    }

    #[test]
    fn unparseable_and_non_finite_rows_are_dropped() {
        let rows = vec![
            cart_row("garbage", 3),
            cart_row("2024-06-01:09:05:00", serde_json::Value::Null),
            cart_row("2024-06-01:10:05:00", 4),
        ];
        let chart = cart_day_chart(&rows);
        let values = &chart.by_date["2024-06-01"].series[0].values;
        assert_eq!(values[0], None);
        assert_eq!(values[1], Some(4.0));
    }

    #[test]
    fn a_null_row_does_not_shadow_an_earlier_reading() {
        // Rows without a usable value never enter latest-wins contention.
        let rows = vec![
            cart_row("2024-06-01:09:05:00", 3),
            cart_row("2024-06-01:09:18:00", serde_json::Value::Null),
        ];
        let series = cart_fine_series(&rows, "2024-06-01");
        assert_eq!(series.values[0], Some(3.0));
    }

    #[test]
    fn grids_are_full_length_even_with_no_rows() {
        let series = cart_fine_series(&[], "2024-06-01");
        assert_eq!(series.values.len(), 46);
        assert!(series.values.iter().all(Option::is_none));
        assert!(cart_day_chart(&[]).dates.is_empty());
        assert!(flow_day_chart(&[]).dates.is_empty());
    }

    fn flow_row(recorded_at: &str, search_uv: f64, cart_uv: f64) -> RawRow {
        RawRow::from_store_row(&json!({
            "search_uv": search_uv,
            "search_pay_rate": 0.05,
            "cart_uv": cart_uv,
            "cart_pay_rate": 0.12,
            "created_at": recorded_at,
        }))
        .unwrap()
    }

    #[test]
    fn flow_chart_emits_four_series_per_date() {
        let rows = vec![
            flow_row("2024-06-01T09:05:00+08:00", 100.0, 40.0),
            flow_row("2024-06-01T09:10:00+08:00", 120.0, 45.0),
            flow_row("2024-06-01T13:30:00+08:00", 300.0, 90.0),
        ];
        let chart = flow_day_chart(&rows);
        let day = &chart.by_date["2024-06-01"];
        assert_eq!(day.series.len(), 4);
        assert!(day.series.iter().all(|s| s.values.len() == 46));

        let search_uv = day
            .series
            .iter()
            .find(|s| s.metric_key() == "flow-search-uv")
            .unwrap();
        // Slot 0 resolves to the later 09:10 capture.
        assert_eq!(search_uv.values[0], Some(120.0));
        // 13:30 is slot 13 (270 minutes past 09:00).
        assert_eq!(search_uv.values[13], Some(300.0));

        let rate = day
            .series
            .iter()
            .find(|s| s.metric_key() == "flow-cart-pay-rate")
            .unwrap();
        assert!(rate.is_rate);
        assert_eq!(rate.values[0], Some(0.12));
    }

    #[test]
    fn flow_winner_row_supplies_all_columns() {
        let partial = RawRow::from_store_row(&json!({
            "search_uv": 50.0,
            "created_at": "2024-06-01T09:15:00+08:00",
        }))
        .unwrap();
        let rows = vec![flow_row("2024-06-01T09:05:00+08:00", 100.0, 40.0), partial];
        let chart = flow_day_chart(&rows);
        let day = &chart.by_date["2024-06-01"];
        let cart_uv = day
            .series
            .iter()
            .find(|s| s.metric_key() == "flow-cart-uv")
            .unwrap();
        // The later row wins the bucket; its missing column reads as null.
        assert_eq!(cart_uv.values[0], None);
    }

    fn rank_row(recorded_at: &str, shop: &str, rank: f64) -> RawRow {
        RawRow::from_store_row(&json!({
            "shop_title": shop,
            "rank": rank,
            "created_at": recorded_at,
        }))
        .unwrap()
    }

    #[test]
    fn rank_resolution_is_per_shop() {
        let rows = vec![
            rank_row("2024-06-01:19:05:00", "Shop A", 3.0),
            rank_row("2024-06-01:19:15:00", "Shop A", 2.0),
            rank_row("2024-06-01:19:05:00", "Shop B", 9.0),
            rank_row("2024-06-01:19:05:00", "", 1.0),
        ];
        let chart = rank_chart(&rows);
        assert_eq!(chart.shop_names, vec!["Shop A".to_string(), "Shop B".to_string()]);

        let series = rank_day_series(&chart, "2024-06-01");
        assert_eq!(series.len(), 2);
        let shop_a = &series[0];
        assert_eq!(shop_a.metric_key(), "market-rank-Shop A");
        // 19:05 and 19:15 share slot 30; the later capture wins.
        assert_eq!(shop_a.values[30], Some(2.0));
        assert_eq!(series[1].values[30], Some(9.0));
    }

    #[test]
    fn rank_series_for_an_unknown_date_is_all_null() {
        let chart = rank_chart(&[rank_row("2024-06-01:19:05:00", "Shop A", 3.0)]);
        let series = rank_day_series(&chart, "2024-07-15");
        assert_eq!(series.len(), 1);
        assert!(series[0].values.iter().all(Option::is_none));
    }
}
