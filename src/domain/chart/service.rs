//! Chart service: store query window → canonicalize → merge.
//!
//! Every view is rebuilt from raw rows on demand; there is no persisted
//! canonical cache. A failing or unconfigured store degrades to an empty
//! chart with a diagnostic entry, never an aborted request chain.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Result;
use chrono::NaiveDate;
use tracing::warn;

use crate::core::client::row_store::RowStore;
use crate::core::registry;
use crate::core::state::diag_log::DiagLog;
use crate::core::time;

use super::canonicalizer;
use super::merger;
use super::model::{
    CanonicalSeries, ChartData, MergedChart, RankView, RankTrendView, RawRow, TrendPoint,
    RANK_CATEGORY,
};
use super::trend;

fn source_table(source_id: &str) -> &'static str {
    registry::SOURCES
        .iter()
        .find(|s| s.id == source_id)
        .map(|s| s.table)
        .unwrap_or_default()
}

/// Valid `YYYY-MM-DD` strings only, sorted, deduplicated.
pub fn sanitize_dates(dates: &[String]) -> Vec<String> {
    let mut out: Vec<String> = dates
        .iter()
        .filter_map(|d| time::date_only(d))
        .map(str::to_string)
        .collect();
    out.sort_unstable();
    out.dedup();
    out
}

/// Half-open store window covering the dates plus the next morning, so
/// post-midnight residual rows of the last date are included.
fn query_window(dates: &[String]) -> Option<(String, String)> {
    let min = dates.first()?;
    let max = dates.last()?;
    let next = NaiveDate::parse_from_str(max, "%Y-%m-%d").ok()?.succ_opt()?;
    let start = time::compact_to_iso(&format!("{min}:00:00:00"));
    let end = time::compact_to_iso(&format!("{next}:09:00:00"));
    Some((start, end))
}

pub struct ChartService {
    store: Arc<dyn RowStore>,
    diag: Arc<DiagLog>,
}

impl ChartService {
    pub fn new(store: Arc<dyn RowStore>, diag: Arc<DiagLog>) -> Self {
        Self { store, diag }
    }

    async fn fetch_rows(&self, source_id: &str, dates: &[String]) -> Vec<RawRow> {
        let Some((start, end)) = query_window(dates) else {
            return Vec::new();
        };
        let table = source_table(source_id);
        match self.store.select_range(table, &start, &end).await {
            Ok(rows) => rows.iter().filter_map(RawRow::from_store_row).collect(),
            Err(err) => {
                warn!(table, error = %err, "store query failed, serving empty chart");
                self.diag.warn(format!("store query failed for {table}: {err}"));
                Vec::new()
            }
        }
    }

    fn restrict(chart: ChartData, dates: &[String]) -> ChartData {
        let by_date: BTreeMap<_, _> = chart
            .by_date
            .into_iter()
            .filter(|(date, _)| dates.contains(date))
            .collect();
        ChartData { dates: dates.to_vec(), by_date }
    }

    async fn combined_chart(&self, dates: &[String]) -> ChartData {
        let cart = canonicalizer::cart_day_chart(&self.fetch_rows("cart_log", dates).await);
        let flow = canonicalizer::flow_day_chart(&self.fetch_rows("flow_source", dates).await);
        Self::restrict(merger::merge_chart_data(cart, flow), dates)
    }

    /// Cart + flow day series for the requested dates.
    pub async fn day_chart(&self, dates: &[String]) -> Result<ChartData> {
        Ok(self.combined_chart(dates).await)
    }

    /// 46-point cart series for one date (enlarged view).
    pub async fn cart_fine(&self, date: &str) -> Result<CanonicalSeries> {
        let dates = vec![date.to_string()];
        let rows = self.fetch_rows("cart_log", &dates).await;
        Ok(canonicalizer::cart_fine_series(&rows, date))
    }

    /// One metric overlaid across dates; `None` for an unknown metric key.
    pub async fn overlay(&self, metric_key: &str, dates: &[String]) -> Result<Option<MergedChart>> {
        let chart = self.combined_chart(dates).await;
        Ok(merger::overlay(&chart, dates, metric_key))
    }

    /// Trend scalars per date for one cart/flow metric.
    pub async fn trend(&self, metric_key: &str, dates: &[String]) -> Result<Vec<TrendPoint>> {
        let chart = self.combined_chart(dates).await;
        Ok(trend::trend_series(&chart, metric_key, dates))
    }

    /// Per-shop rank series for each requested date.
    pub async fn rank_day(&self, dates: &[String]) -> Result<RankView> {
        let rows = self.fetch_rows("market_rank", dates).await;
        let chart = canonicalizer::rank_chart(&rows);
        let by_date = dates
            .iter()
            .map(|date| (date.clone(), canonicalizer::rank_day_series(&chart, date)))
            .collect();
        Ok(RankView { shop_names: chart.shop_names, by_date })
    }

    /// Per-shop trend across the requested dates (19:00 representative).
    pub async fn rank_trend(&self, dates: &[String]) -> Result<Vec<RankTrendView>> {
        let rows = self.fetch_rows("market_rank", dates).await;
        let chart = canonicalizer::rank_chart(&rows);
        Ok(chart
            .shop_names
            .iter()
            .map(|shop| RankTrendView {
                key: format!("{RANK_CATEGORY}-{shop}"),
                shop_title: shop.clone(),
                data: trend::rank_trend(&chart, shop, dates),
            })
            .collect())
    }
}
