//! One-shot import of a fixed-layout tracking sheet.
//!
//! Layout per row: date, category, sub-category, then 16 hourly cells
//! (09..24). Date and category live in merged cells, so only the first row
//! of a block carries them and later rows inherit. A dedicated action
//! category becomes per-hour annotations instead of a series. The output is
//! the same `ChartData` shape the canonicalizer produces, so everything
//! downstream is producer-agnostic.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use anyhow::{bail, Result};
use chrono::NaiveDate;
use serde_json::Value;

use crate::core::time::Grid;
use crate::domain::chart::model::{CanonicalSeries, ChartData, DaySeries};

/// First hourly cell column (0-based): date, category, sub-category precede it.
pub const COL_START_HOUR: usize = 3;

fn action_category() -> &'static str {
    static LABEL: OnceLock<String> = OnceLock::new();
    LABEL.get_or_init(|| {
        std::env::var("SHOPWATCH_SHEET_ACTION_LABEL").unwrap_or_else(|_| "actions".into())
    })
}

fn rate_marker() -> &'static str {
    static MARKER: OnceLock<String> = OnceLock::new();
    MARKER.get_or_init(|| {
        std::env::var("SHOPWATCH_SHEET_RATE_MARKER").unwrap_or_else(|_| "rate".into())
    })
}

fn cell_text(cell: Option<&Value>) -> String {
    match cell {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

/// Date cell: `YYYY-MM-DD`, `YYYY/MM/DD`, or a spreadsheet serial number.
fn parse_date_cell(cell: Option<&Value>) -> Option<String> {
    let text = cell_text(cell);
    if text.is_empty() {
        return None;
    }
    if let Ok(d) = NaiveDate::parse_from_str(&text, "%Y-%m-%d") {
        return Some(d.to_string());
    }
    if let Ok(d) = NaiveDate::parse_from_str(&text, "%Y/%m/%d") {
        return Some(d.to_string());
    }
    // Spreadsheet serial: days since 1899-12-30.
    let serial = text.parse::<f64>().ok()?;
    if !(20_000.0..60_000.0).contains(&serial) {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    Some((epoch + chrono::Duration::days(serial as i64)).to_string())
}

/// Numeric cell: empty and `-` read as absent, `"123+"` as 123, thousands
/// separators are stripped.
fn parse_value_cell(cell: Option<&Value>) -> Option<f64> {
    if let Some(Value::Number(n)) = cell {
        return n.as_f64().filter(|v| v.is_finite());
    }
    let text = cell_text(cell);
    if text.is_empty() || text == "-" {
        return None;
    }
    let trimmed = text.strip_suffix('+').unwrap_or(&text);
    trimmed
        .replace(',', "")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

fn is_rate_sub_category(sub_category: &str) -> bool {
    sub_category.contains(rate_marker())
}

/// Parse the decoded cell grid. The first row is the header and is skipped.
pub fn parse_sheet_grid(rows: &[Vec<Value>]) -> Result<ChartData> {
    if rows.len() < 2 {
        bail!("sheet has no data rows");
    }

    let mut by_date: BTreeMap<String, DaySeries> = BTreeMap::new();
    let mut last_date: Option<String> = None;
    let mut last_category = String::new();

    for row in &rows[1..] {
        if row.len() < COL_START_HOUR {
            continue;
        }

        // Merged cells: only the first row of a block carries the date.
        if let Some(date) = parse_date_cell(row.first()) {
            last_date = Some(date);
        }
        let Some(date) = last_date.clone() else { continue };

        let category_cell = cell_text(row.get(1));
        if !category_cell.is_empty() {
            last_category = category_cell;
        }
        let category = last_category.clone();

        let sub_category = cell_text(row.get(2));
        if sub_category.is_empty() {
            continue;
        }

        let day = by_date.entry(date).or_default();
        let hour_labels = Grid::Hour.labels();

        if category == action_category() {
            for (i, label) in hour_labels.iter().enumerate() {
                let text = cell_text(row.get(COL_START_HOUR + i));
                if !text.is_empty() {
                    day.actions
                        .entry(label.clone())
                        .or_default()
                        .push(format!("{sub_category}-{text}"));
                }
            }
            continue;
        }

        let is_rate = is_rate_sub_category(&sub_category);
        let values = (0..Grid::Hour.bucket_count())
            .map(|i| parse_value_cell(row.get(COL_START_HOUR + i)))
            .collect();
        day.series.push(CanonicalSeries {
            category,
            sub_category,
            is_rate,
            grid: Grid::Hour,
            values,
        });
    }

    let dates: Vec<String> = by_date.keys().cloned().collect();
    Ok(ChartData { dates, by_date })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(cells: Vec<Value>) -> Vec<Value> {
        cells
    }

    fn header() -> Vec<Value> {
        vec![json!("date"), json!("category"), json!("metric")]
    }

    #[test]
    fn carried_forward_date_and_category() {
        let mut sales = vec![json!("2024-06-01"), json!("shop"), json!("orders")];
        sales.extend((0..16).map(|i| json!(i)));
        // Second block row: merged date/category cells are empty.
        let mut rate = vec![json!(""), json!(""), json!("pay rate")];
        rate.extend((0..16).map(|_| json!("0.5")));

        let chart = parse_sheet_grid(&[header(), row(sales), row(rate)]).unwrap();
        assert_eq!(chart.dates, vec!["2024-06-01".to_string()]);
        let day = &chart.by_date["2024-06-01"];
        assert_eq!(day.series.len(), 2);
        assert_eq!(day.series[0].category, "shop");
        assert_eq!(day.series[1].category, "shop");
        assert!(day.series[1].is_rate);
        assert_eq!(day.series[0].values[3], Some(3.0));
    }

    #[test]
    fn value_cells_parse_dashes_plus_and_separators() {
        let mut cells = vec![json!("2024-06-01"), json!("shop"), json!("orders")];
        cells.extend([
            json!(""),
            json!("-"),
            json!("120+"),
            json!("1,250"),
            json!(7),
        ]);
        cells.extend((0..11).map(|_| json!("")));

        let chart = parse_sheet_grid(&[header(), row(cells)]).unwrap();
        let values = &chart.by_date["2024-06-01"].series[0].values;
        assert_eq!(values.len(), 16);
        assert_eq!(values[0], None);
        assert_eq!(values[1], None);
        assert_eq!(values[2], Some(120.0));
        assert_eq!(values[3], Some(1250.0));
        assert_eq!(values[4], Some(7.0));
    }

    #[test]
    fn action_rows_become_annotations() {
        let mut cells = vec![json!("2024-06-01"), json!("actions"), json!("ops")];
        cells.push(json!("restock"));
        cells.extend((0..15).map(|_| json!("")));

        let chart = parse_sheet_grid(&[header(), row(cells)]).unwrap();
        let day = &chart.by_date["2024-06-01"];
        assert!(day.series.is_empty());
        assert_eq!(day.actions["9"], vec!["ops-restock"]);
    }

    #[test]
    fn serial_dates_convert() {
        // 2024-06-01 is serial 45444.
        let mut cells = vec![json!(45444), json!("shop"), json!("orders")];
        cells.extend((0..16).map(|_| json!(1)));
        let chart = parse_sheet_grid(&[header(), row(cells)]).unwrap();
        assert_eq!(chart.dates, vec!["2024-06-01".to_string()]);
    }

    #[test]
    fn empty_sheet_is_an_error() {
        assert!(parse_sheet_grid(&[]).is_err());
        assert!(parse_sheet_grid(&[header()]).is_err());
    }

    #[test]
    fn rows_before_any_date_are_skipped() {
        let mut cells = vec![json!(""), json!("shop"), json!("orders")];
        cells.extend((0..16).map(|_| json!(1)));
        let chart = parse_sheet_grid(&[header(), row(cells)]).unwrap();
        assert!(chart.dates.is_empty());
    }
}
