//! Throttled sink: decides per source whether a capture event becomes a
//! persisted row, and writes it.
//!
//! Per source the flow is marker check → skip or persist → marker update.
//! The marker is only advanced after the store acknowledges the write, so a
//! failed write leaves the slot open and the next observation in the same
//! window retries it. Two near-simultaneous events for one source can race
//! the marker and produce one redundant row; canonicalization resolves that
//! by latest-wins, so the race is tolerated rather than locked away.

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::core::capture::CaptureEvent;
use crate::core::client::row_store::RowStore;
use crate::core::registry::Extracted;
use crate::core::state::diag_log::DiagLog;
use crate::core::state::marker_store::{
    LastWrite, MarkerStore, LAST_SLOT_PREFIX, LAST_WRITE_KEY,
};
use crate::core::state::settings::{
    SettingsRepository, DEFAULT_THROTTLE_MINUTES, THROTTLE_OPTIONS,
};
use crate::core::time;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkOutcome {
    /// Row(s) written and the slot marker advanced.
    Persisted,
    /// Same slot already written for this source.
    Skipped,
    /// Write not acknowledged; marker left stale for an opportunistic retry.
    WriteFailed,
    /// Event unusable (bad stamp or registry misconfiguration).
    Dropped,
}

impl SinkOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            SinkOutcome::Persisted => "persisted",
            SinkOutcome::Skipped => "skipped",
            SinkOutcome::WriteFailed => "write_failed",
            SinkOutcome::Dropped => "dropped",
        }
    }
}

pub struct ThrottledSink {
    markers: Arc<dyn MarkerStore>,
    store: Arc<dyn RowStore>,
    settings: Arc<dyn SettingsRepository>,
    diag: Arc<DiagLog>,
}

impl ThrottledSink {
    pub fn new(
        markers: Arc<dyn MarkerStore>,
        store: Arc<dyn RowStore>,
        settings: Arc<dyn SettingsRepository>,
        diag: Arc<DiagLog>,
    ) -> Self {
        Self { markers, store, settings, diag }
    }

    fn throttle_minutes(&self) -> u32 {
        let minutes = self
            .settings
            .read()
            .map(|s| s.throttle_minutes)
            .unwrap_or(DEFAULT_THROTTLE_MINUTES);
        if THROTTLE_OPTIONS.contains(&minutes) {
            minutes
        } else {
            DEFAULT_THROTTLE_MINUTES
        }
    }

    pub async fn handle(&self, event: &CaptureEvent) -> SinkOutcome {
        let source = event.source;
        let Some(stamp) = time::parse_stamp(&event.recorded_at) else {
            warn!(source = source.id, recorded_at = %event.recorded_at, "unparseable stamp, dropping event");
            return SinkOutcome::Dropped;
        };

        let slot = time::slot_key(&stamp, self.throttle_minutes());
        let marker_key = format!("{LAST_SLOT_PREFIX}{}", source.id);
        let last_slot = match self.markers.get(&marker_key).await {
            Ok(v) => v,
            Err(err) => {
                // Treat an unreadable marker as absent: a redundant write is
                // safe, a silently suppressed one is not.
                warn!(source = source.id, error = %err, "marker read failed");
                None
            }
        };
        if last_slot.as_deref() == Some(slot.as_str()) {
            debug!(source = source.id, slot, "slot already written, skipping");
            self.diag
                .info(format!("captured [{}], slot {} already written", source.id, slot));
            return SinkOutcome::Skipped;
        }

        let created_at = time::compact_to_iso(&event.recorded_at);
        let written = match &event.data {
            Extracted::Rows(items) => {
                let records: Vec<Value> = items
                    .iter()
                    .map(|item| {
                        let mut record = item.clone();
                        record.insert("created_at".into(), created_at.clone().into());
                        Value::Object(record)
                    })
                    .collect();
                self.store.insert_batch(source.table, &records).await
            }
            Extracted::Record(payload) => {
                let mut record = payload.clone();
                record.insert("created_at".into(), created_at.clone().into());
                self.store.insert(source.table, &Value::Object(record)).await
            }
            Extracted::Value(value) => {
                let Some(value_key) = source.value_key else {
                    warn!(source = source.id, "single-value source without value_key");
                    return SinkOutcome::Dropped;
                };
                let mut record = Map::new();
                record.insert(value_key.into(), (*value).into());
                record.insert("created_at".into(), created_at.clone().into());
                self.store.insert(source.table, &Value::Object(record)).await
            }
        };

        match written {
            Ok(true) => {
                if let Err(err) = self.markers.set(&marker_key, &slot).await {
                    warn!(source = source.id, error = %err, "marker update failed");
                }
                let last_write = LastWrite {
                    at: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
                    slot_key: slot.clone(),
                    source_id: source.id.to_string(),
                };
                if let Ok(raw) = serde_json::to_string(&last_write) {
                    if let Err(err) = self.markers.set(LAST_WRITE_KEY, &raw).await {
                        warn!(source = source.id, error = %err, "last-write update failed");
                    }
                }
                self.diag
                    .info(format!("captured [{}], persisted slot {}", source.id, slot));
                SinkOutcome::Persisted
            }
            Ok(false) => {
                self.diag
                    .warn(format!("store not configured, write skipped for [{}]", source.id));
                SinkOutcome::WriteFailed
            }
            Err(err) => {
                warn!(source = source.id, error = %err, "store write failed");
                self.diag
                    .warn(format!("store write failed for [{}]: {err}", source.id));
                SinkOutcome::WriteFailed
            }
        }
    }

    /// Most recent acknowledged write, for the capture status endpoint.
    pub async fn last_write(&self) -> Option<LastWrite> {
        let raw = self.markers.get(LAST_WRITE_KEY).await.ok()??;
        serde_json::from_str(&raw).ok()
    }
}
