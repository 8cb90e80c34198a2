//! Chart-point notes: fetch and upsert against the store's notes table.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Result;
use serde_json::{json, Value};
use validator::Validate;

use crate::core::client::row_store::RowStore;
use crate::domain::chart::model::annotation_key;

use super::note_upsert_request::NoteUpsertRequest;

pub const NOTES_TABLE: &str = "shop_chart_point_notes";
const NOTES_CONFLICT_KEY: &str = "chart_key,point_date,point_slot";

pub struct NoteService {
    store: Arc<dyn RowStore>,
}

impl NoteService {
    pub fn new(store: Arc<dyn RowStore>) -> Self {
        Self { store }
    }

    /// Notes for the given chart keys and dates, grouped per chart key and
    /// keyed `"<date>|<bucketLabel>"`.
    pub async fn fetch(
        &self,
        chart_keys: &[String],
        dates: &[String],
    ) -> Result<BTreeMap<String, BTreeMap<String, String>>> {
        if chart_keys.is_empty() || dates.is_empty() {
            return Ok(BTreeMap::new());
        }
        let rows = match self
            .store
            .select_in(
                NOTES_TABLE,
                &[("chart_key", chart_keys.to_vec()), ("point_date", dates.to_vec())],
            )
            .await
        {
            Ok(rows) => rows,
            // Notes are decoration; an unreachable store reads as none.
            Err(err) => {
                tracing::warn!(error = %err, "note query failed, serving none");
                return Ok(BTreeMap::new());
            }
        };

        let mut by_chart: BTreeMap<String, BTreeMap<String, String>> = BTreeMap::new();
        for row in rows {
            let Some(chart_key) = row.get("chart_key").and_then(Value::as_str) else {
                continue;
            };
            let Some(date) = row.get("point_date").and_then(Value::as_str) else {
                continue;
            };
            let slot = row.get("point_slot").and_then(Value::as_str).unwrap_or("");
            let note = row.get("note").and_then(Value::as_str).unwrap_or("");
            by_chart
                .entry(chart_key.to_string())
                .or_default()
                .insert(annotation_key(date, slot), note.to_string());
        }
        Ok(by_chart)
    }

    pub async fn upsert(&self, req: NoteUpsertRequest) -> Result<Value> {
        req.validate()?;
        let record = json!({
            "chart_key": req.chart_key,
            "point_date": req.point_date,
            "point_slot": req.point_slot,
            "note": req.note,
            "updated_at": chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
        });
        self.store.upsert(NOTES_TABLE, NOTES_CONFLICT_KEY, &record).await?;
        Ok(json!({ "message": "Note saved" }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::client::row_store::InMemoryRowStore;

    fn request(slot: &str, note: &str) -> NoteUpsertRequest {
        NoteUpsertRequest {
            chart_key: "cart-adds".into(),
            point_date: "2024-06-01".into(),
            point_slot: slot.into(),
            note: note.into(),
        }
    }

    #[tokio::test]
    async fn upsert_then_fetch_round_trips() {
        let store = Arc::new(InMemoryRowStore::default());
        let service = NoteService::new(store.clone());

        service.upsert(request("19:00", "competitor sale")).await.unwrap();
        service.upsert(request("19:00", "competitor flash sale")).await.unwrap();

        let notes = service
            .fetch(&["cart-adds".to_string()], &["2024-06-01".to_string()])
            .await
            .unwrap();
        let by_key = &notes["cart-adds"];
        assert_eq!(by_key.len(), 1);
        assert_eq!(by_key["2024-06-01|19:00"], "competitor flash sale");
    }

    #[tokio::test]
    async fn fetch_filters_by_key_and_date() {
        let store = Arc::new(InMemoryRowStore::default());
        let service = NoteService::new(store.clone());
        service.upsert(request("9", "a")).await.unwrap();

        let other_dates = service
            .fetch(&["cart-adds".to_string()], &["2030-01-01".to_string()])
            .await
            .unwrap();
        assert!(other_dates.is_empty());

        let no_inputs = service.fetch(&[], &[]).await.unwrap();
        assert!(no_inputs.is_empty());
    }

    #[tokio::test]
    async fn invalid_request_is_rejected() {
        let store = Arc::new(InMemoryRowStore::default());
        let service = NoteService::new(store.clone());
        let mut bad = request("9", "x");
        bad.chart_key = String::new();
        assert!(service.upsert(bad).await.is_err());
        assert!(store.rows(NOTES_TABLE).await.is_empty());
    }
}
