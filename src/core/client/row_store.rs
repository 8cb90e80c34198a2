//! Row store client: a PostgREST-compatible remote table store.
//!
//! Writes are best-effort: without configured credentials they are skipped
//! (reported as `Ok(false)`) so the capture path keeps running; a failed
//! HTTP write surfaces as an error and the caller leaves its throttle
//! marker stale, which retries the window on the next observation.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

#[async_trait]
pub trait RowStore: Send + Sync {
    /// Insert one row. `Ok(false)` means the write was skipped (store not
    /// configured), not that it failed.
    async fn insert(&self, table: &str, record: &Value) -> Result<bool>;

    /// Insert several rows of one table in a single request.
    async fn insert_batch(&self, table: &str, records: &[Value]) -> Result<bool>;

    /// Rows with `created_at` in `[start, end)`, ascending.
    async fn select_range(&self, table: &str, start_iso: &str, end_iso: &str)
        -> Result<Vec<Value>>;

    /// Rows whose named columns take any of the given values.
    async fn select_in(&self, table: &str, filters: &[(&str, Vec<String>)])
        -> Result<Vec<Value>>;

    /// Insert-or-update by the table's unique key columns.
    async fn upsert(&self, table: &str, on_conflict: &str, record: &Value) -> Result<()>;
}

#[derive(Clone)]
struct Credentials {
    base_url: String,
    api_key: String,
}

/// REST implementation against `<base>/rest/v1/<table>`.
pub struct RestRowStore {
    credentials: Option<Credentials>,
    http: reqwest::Client,
}

impl RestRowStore {
    /// Reads `SHOPWATCH_STORE_URL` / `SHOPWATCH_STORE_KEY`. Both must be
    /// present for writes and reads to be attempted.
    pub fn from_env() -> Self {
        let credentials = match (
            std::env::var("SHOPWATCH_STORE_URL"),
            std::env::var("SHOPWATCH_STORE_KEY"),
        ) {
            (Ok(base_url), Ok(api_key)) if !base_url.is_empty() && !api_key.is_empty() => {
                Some(Credentials {
                    base_url: base_url.trim_end_matches('/').to_string(),
                    api_key,
                })
            }
            _ => None,
        };
        Self {
            credentials,
            http: reqwest::Client::new(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.credentials.is_some()
    }

    fn table_url(&self, creds: &Credentials, table: &str) -> String {
        format!("{}/rest/v1/{}", creds.base_url, urlencoding::encode(table))
    }

    fn authed(&self, req: reqwest::RequestBuilder, creds: &Credentials) -> reqwest::RequestBuilder {
        req.header("apikey", &creds.api_key)
            .header("Authorization", format!("Bearer {}", creds.api_key))
    }

    async fn post_rows(&self, table: &str, body: &Value, prefer: &str, query: &[(&str, &str)]) -> Result<bool> {
        let Some(creds) = &self.credentials else {
            warn!(table, "store not configured, skipping write");
            return Ok(false);
        };
        let req = self
            .http
            .post(self.table_url(creds, table))
            .query(query)
            .header("Prefer", prefer)
            .json(body);
        let res = self
            .authed(req, creds)
            .send()
            .await
            .with_context(|| format!("store request failed for {table}"))?;
        if res.status().is_success() {
            debug!(table, "store write acknowledged");
            return Ok(true);
        }
        let status = res.status();
        let detail = res.text().await.unwrap_or_default();
        bail!("store write rejected for {table}: {status} {detail}");
    }
}

#[async_trait]
impl RowStore for RestRowStore {
    async fn insert(&self, table: &str, record: &Value) -> Result<bool> {
        self.post_rows(table, record, "return=minimal", &[]).await
    }

    async fn insert_batch(&self, table: &str, records: &[Value]) -> Result<bool> {
        if records.is_empty() {
            return Ok(false);
        }
        let body = Value::Array(records.to_vec());
        self.post_rows(table, &body, "return=minimal", &[]).await
    }

    async fn select_range(&self, table: &str, start_iso: &str, end_iso: &str)
        -> Result<Vec<Value>> {
        let Some(creds) = &self.credentials else {
            bail!("store not configured");
        };
        let gte = format!("gte.{start_iso}");
        let lt = format!("lt.{end_iso}");
        let req = self.http.get(self.table_url(creds, table)).query(&[
            ("select", "*"),
            ("created_at", gte.as_str()),
            ("created_at", lt.as_str()),
            ("order", "created_at.asc"),
        ]);
        let res = self
            .authed(req, creds)
            .send()
            .await
            .with_context(|| format!("store query failed for {table}"))?;
        if !res.status().is_success() {
            let status = res.status();
            bail!("store query rejected for {table}: {status}");
        }
        Ok(res.json().await?)
    }

    async fn select_in(&self, table: &str, filters: &[(&str, Vec<String>)])
        -> Result<Vec<Value>> {
        let Some(creds) = &self.credentials else {
            bail!("store not configured");
        };
        let mut query: Vec<(String, String)> = vec![("select".into(), "*".into())];
        for (column, values) in filters {
            let list = values
                .iter()
                .map(|v| format!("\"{}\"", v.replace('"', "")))
                .collect::<Vec<_>>()
                .join(",");
            query.push(((*column).to_string(), format!("in.({list})")));
        }
        let req = self.http.get(self.table_url(creds, table)).query(&query);
        let res = self
            .authed(req, creds)
            .send()
            .await
            .with_context(|| format!("store query failed for {table}"))?;
        if !res.status().is_success() {
            let status = res.status();
            bail!("store query rejected for {table}: {status}");
        }
        Ok(res.json().await?)
    }

    async fn upsert(&self, table: &str, on_conflict: &str, record: &Value) -> Result<()> {
        let wrote = self
            .post_rows(
                table,
                record,
                "resolution=merge-duplicates,return=minimal",
                &[("on_conflict", on_conflict)],
            )
            .await?;
        if !wrote {
            bail!("store not configured");
        }
        Ok(())
    }
}

/// In-memory store used by tests and offline runs.
#[derive(Default)]
pub struct InMemoryRowStore {
    tables: tokio::sync::Mutex<std::collections::HashMap<String, Vec<Value>>>,
}

impl InMemoryRowStore {
    pub async fn rows(&self, table: &str) -> Vec<Value> {
        self.tables.lock().await.get(table).cloned().unwrap_or_default()
    }

    pub async fn seed(&self, table: &str, rows: Vec<Value>) {
        self.tables.lock().await.entry(table.to_string()).or_default().extend(rows);
    }
}

#[async_trait]
impl RowStore for InMemoryRowStore {
    async fn insert(&self, table: &str, record: &Value) -> Result<bool> {
        self.tables
            .lock()
            .await
            .entry(table.to_string())
            .or_default()
            .push(record.clone());
        Ok(true)
    }

    async fn insert_batch(&self, table: &str, records: &[Value]) -> Result<bool> {
        if records.is_empty() {
            return Ok(false);
        }
        self.tables
            .lock()
            .await
            .entry(table.to_string())
            .or_default()
            .extend(records.iter().cloned());
        Ok(true)
    }

    async fn select_range(&self, table: &str, start_iso: &str, end_iso: &str)
        -> Result<Vec<Value>> {
        let mut rows: Vec<Value> = self
            .rows(table)
            .await
            .into_iter()
            .filter(|row| {
                row.get("created_at")
                    .and_then(Value::as_str)
                    .map(|t| t >= start_iso && t < end_iso)
                    .unwrap_or(false)
            })
            .collect();
        rows.sort_by(|a, b| {
            let ka = a.get("created_at").and_then(Value::as_str).unwrap_or("");
            let kb = b.get("created_at").and_then(Value::as_str).unwrap_or("");
            ka.cmp(kb)
        });
        Ok(rows)
    }

    async fn select_in(&self, table: &str, filters: &[(&str, Vec<String>)])
        -> Result<Vec<Value>> {
        Ok(self
            .rows(table)
            .await
            .into_iter()
            .filter(|row| {
                filters.iter().all(|(column, values)| {
                    row.get(*column)
                        .and_then(Value::as_str)
                        .map(|v| values.iter().any(|want| want == v))
                        .unwrap_or(false)
                })
            })
            .collect())
    }

    async fn upsert(&self, table: &str, on_conflict: &str, record: &Value) -> Result<()> {
        let keys: Vec<&str> = on_conflict.split(',').collect();
        let mut tables = self.tables.lock().await;
        let rows = tables.entry(table.to_string()).or_default();
        let same_key = |row: &Value| {
            keys.iter().all(|k| row.get(*k) == record.get(*k))
        };
        if let Some(existing) = rows.iter_mut().find(|r| same_key(r)) {
            *existing = record.clone();
        } else {
            rows.push(record.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn unconfigured_rest_store_skips_writes() {
        let store = RestRowStore {
            credentials: None,
            http: reqwest::Client::new(),
        };
        let wrote = store.insert("shop_cart_log", &json!({"item_cart_cnt": 1})).await.unwrap();
        assert!(!wrote);
        assert!(store.select_range("shop_cart_log", "a", "b").await.is_err());
    }

    #[tokio::test]
    async fn in_memory_range_query_is_sorted_and_half_open() {
        let store = InMemoryRowStore::default();
        store
            .seed(
                "shop_cart_log",
                vec![
                    json!({"item_cart_cnt": 2, "created_at": "2024-06-01T10:00:00+08:00"}),
                    json!({"item_cart_cnt": 1, "created_at": "2024-06-01T09:00:00+08:00"}),
                    json!({"item_cart_cnt": 3, "created_at": "2024-06-02T09:00:00+08:00"}),
                ],
            )
            .await;
        let rows = store
            .select_range(
                "shop_cart_log",
                "2024-06-01T00:00:00+08:00",
                "2024-06-02T09:00:00+08:00",
            )
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["item_cart_cnt"], json!(1));
    }

    #[tokio::test]
    async fn in_memory_upsert_replaces_by_key() {
        let store = InMemoryRowStore::default();
        let key = "chart_key,point_date,point_slot";
        store
            .upsert(
                "shop_chart_point_notes",
                key,
                &json!({"chart_key": "cart-adds", "point_date": "2024-06-01", "point_slot": "9", "note": "a"}),
            )
            .await
            .unwrap();
        store
            .upsert(
                "shop_chart_point_notes",
                key,
                &json!({"chart_key": "cart-adds", "point_date": "2024-06-01", "point_slot": "9", "note": "b"}),
            )
            .await
            .unwrap();
        let rows = store.rows("shop_chart_point_notes").await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["note"], json!("b"));
    }
}
