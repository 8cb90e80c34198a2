//! Capture API DTOs
use serde::{Deserialize, Serialize};

/// One observed network response forwarded by the interception host.
#[derive(Deserialize)]
pub struct ObserveRequest {
    pub url: String,
    pub body: serde_json::Value,
    /// Optional override: the host's parse-time stamp in the compact
    /// business-local encoding. Defaults to the service's clock.
    pub recorded_at: Option<String>,
}

#[derive(Serialize)]
pub struct ObserveResponse {
    pub matched: bool,
    pub source_id: Option<String>,
    pub outcome: String,
}
