//! Chart-ready shapes produced by the canonicalizer and merger.
//!
//! Metric keys are `"<category>-<subCategory>"`; annotation keys are
//! `"<date>|<bucketLabel>"`. Consumers rely on both formats staying stable.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::core::time::Grid;

pub const CART_CATEGORY: &str = "cart";
pub const CART_SUB_CATEGORY: &str = "adds";
pub const FLOW_CATEGORY: &str = "flow";
pub const RANK_CATEGORY: &str = "market-rank";

/// Column layout of the four-column traffic-source table.
pub struct FlowColumn {
    pub column: &'static str,
    pub sub_category: &'static str,
    pub is_rate: bool,
}

pub const FLOW_COLUMNS: &[FlowColumn] = &[
    FlowColumn { column: "search_uv", sub_category: "search-uv", is_rate: false },
    FlowColumn { column: "search_pay_rate", sub_category: "search-pay-rate", is_rate: true },
    FlowColumn { column: "cart_uv", sub_category: "cart-uv", is_rate: false },
    FlowColumn { column: "cart_pay_rate", sub_category: "cart-pay-rate", is_rate: true },
];

/// One metric's values across every bucket of a business day. The grid is
/// always materialized at full length; sparse data shows up as `None`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CanonicalSeries {
    pub category: String,
    pub sub_category: String,
    pub is_rate: bool,
    pub grid: Grid,
    pub values: Vec<Option<f64>>,
}

impl CanonicalSeries {
    pub fn empty(
        category: impl Into<String>,
        sub_category: impl Into<String>,
        is_rate: bool,
        grid: Grid,
    ) -> Self {
        Self {
            category: category.into(),
            sub_category: sub_category.into(),
            is_rate,
            grid,
            values: vec![None; grid.bucket_count()],
        }
    }

    pub fn metric_key(&self) -> String {
        format!("{}-{}", self.category, self.sub_category)
    }
}

/// All series and annotations for one calendar date. Hour labels are always
/// seeded so the annotation map has a stable key set.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DaySeries {
    pub series: Vec<CanonicalSeries>,
    pub actions: BTreeMap<String, Vec<String>>,
}

impl DaySeries {
    pub fn new() -> Self {
        let actions = Grid::Hour
            .labels()
            .into_iter()
            .map(|label| (label, Vec::new()))
            .collect();
        Self { series: Vec::new(), actions }
    }
}

impl Default for DaySeries {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Serialize, Default, PartialEq)]
pub struct ChartData {
    pub dates: Vec<String>,
    pub by_date: BTreeMap<String, DaySeries>,
}

/// One metric overlaid across several dates on a shared bucket axis.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MergedChart {
    pub metric_key: String,
    pub grid: Grid,
    pub by_date: BTreeMap<String, CanonicalSeries>,
}

/// Per-shop rank values keyed by date and fine-grid slot.
#[derive(Debug, Clone, Serialize, Default, PartialEq)]
pub struct RankChart {
    pub shop_names: Vec<String>,
    pub by_date_slot: BTreeMap<String, BTreeMap<usize, BTreeMap<String, f64>>>,
}

/// One scalar per date, for trend views.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TrendPoint {
    pub date: String,
    pub value: Option<f64>,
}

/// Per-shop rank series for a set of dates, plus the shop roster.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RankView {
    pub shop_names: Vec<String>,
    pub by_date: BTreeMap<String, Vec<CanonicalSeries>>,
}

/// One shop's trend line.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RankTrendView {
    pub key: String,
    pub shop_title: String,
    pub data: Vec<TrendPoint>,
}

pub fn annotation_key(date: &str, bucket_label: &str) -> String {
    format!("{date}|{bucket_label}")
}

/// A persisted store row reduced to its timestamp and columns.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    pub recorded_at: String,
    pub columns: Map<String, Value>,
}

fn lower_camel_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut upper_next = false;
    for ch in key.chars() {
        if ch == '_' {
            upper_next = true;
        } else if upper_next {
            out.extend(ch.to_uppercase());
            upper_next = false;
        } else {
            out.push(ch);
        }
    }
    out
}

impl RawRow {
    /// Pull the timestamp out of a store row. Rows carry `created_at`
    /// (store-written) or `recorded_at` (imported), in snake or camel case.
    pub fn from_store_row(row: &Value) -> Option<Self> {
        let obj = row.as_object()?;
        let recorded_at = ["created_at", "createdAt", "recorded_at", "recordedAt"]
            .iter()
            .find_map(|k| obj.get(*k).and_then(Value::as_str))
            .filter(|s| !s.trim().is_empty())?
            .to_string();
        Some(Self { recorded_at, columns: obj.clone() })
    }

    fn lookup(&self, key: &str) -> Option<&Value> {
        self.columns
            .get(key)
            .or_else(|| self.columns.get(&lower_camel_case(key)))
    }

    /// Finite numeric column value; anything else reads as absent.
    pub fn number(&self, key: &str) -> Option<f64> {
        match self.lookup(key)? {
            Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
            Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
            _ => None,
        }
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        self.lookup(key)?.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn raw_row_accepts_both_key_styles() {
        let snake = RawRow::from_store_row(&json!({
            "item_cart_cnt": 5, "created_at": "2024-06-01T09:05:00+08:00"
        }))
        .unwrap();
        assert_eq!(snake.number("item_cart_cnt"), Some(5.0));

        let camel = RawRow::from_store_row(&json!({
            "itemCartCnt": "7", "recordedAt": "2024-06-01:09:05:00"
        }))
        .unwrap();
        assert_eq!(camel.number("item_cart_cnt"), Some(7.0));
        assert_eq!(camel.recorded_at, "2024-06-01:09:05:00");
    }

    #[test]
    fn rows_without_a_timestamp_are_rejected() {
        assert_eq!(RawRow::from_store_row(&json!({"item_cart_cnt": 5})), None);
        assert_eq!(RawRow::from_store_row(&json!({"created_at": ""})), None);
        assert_eq!(RawRow::from_store_row(&json!(42)), None);
    }

    #[test]
    fn non_numeric_columns_read_as_absent() {
        let row = RawRow::from_store_row(&json!({
            "rank": null, "shop_title": "Shop A", "created_at": "2024-06-01:09:05:00"
        }))
        .unwrap();
        assert_eq!(row.number("rank"), None);
        assert_eq!(row.text("shop_title"), Some("Shop A"));
    }

    #[test]
    fn metric_and_annotation_key_formats() {
        let series = CanonicalSeries::empty(CART_CATEGORY, CART_SUB_CATEGORY, false, Grid::Hour);
        assert_eq!(series.metric_key(), "cart-adds");
        assert_eq!(series.values.len(), 16);
        assert_eq!(annotation_key("2024-06-01", "19:00"), "2024-06-01|19:00");
    }

    #[test]
    fn day_series_seeds_all_hour_labels() {
        let day = DaySeries::new();
        assert_eq!(day.actions.len(), 16);
        assert!(day.actions.contains_key("9"));
        assert!(day.actions.contains_key("24"));
        assert!(day.actions.values().all(Vec::is_empty));
    }
}
