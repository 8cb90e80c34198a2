//! Capture agent: turns an observed `(url, parsed body)` pair into at most
//! one `CaptureEvent`.
//!
//! The agent never alters the observed response and never retries an
//! extraction; a body the extractor cannot use is simply not an event, and
//! the next observation is processed normally.

use serde_json::Value;
use tracing::debug;

use crate::core::registry::{self, Extracted, MetricSource};
use crate::core::time;

/// One observation ready for the sink, stamped in the business timezone at
/// the moment the response was parsed.
#[derive(Debug, Clone)]
pub struct CaptureEvent {
    pub source: &'static MetricSource,
    /// Compact business-local encoding, `YYYY-MM-DD:HH:mm:ss`.
    pub recorded_at: String,
    pub data: Extracted,
}

/// Match the URL against the registry and extract. `None` when no source
/// matches or the matching source finds the body not applicable.
pub fn observe(url: &str, body: &Value) -> Option<CaptureEvent> {
    observe_at(url, body, time::now_compact())
}

/// `observe` with the observation stamp supplied by the caller (the
/// interception host parses the response, so it owns the instant).
pub fn observe_at(url: &str, body: &Value, recorded_at: String) -> Option<CaptureEvent> {
    let source = registry::match_url(url)?;
    let data = source.extract(body)?;
    debug!(source = source.id, recorded_at, "captured observation");
    Some(CaptureEvent { source, recorded_at, data })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cart_body(cnt: i64) -> Value {
        json!({"data": {"data": {"data": {"data": [
            {"itemCartCnt": {"value": cnt}}
        ]}}}})
    }

    #[test]
    fn matching_response_becomes_one_event() {
        let ev = observe_at(
            "https://shop.example.com/cc/item/live/view/top.json",
            &cart_body(12),
            "2024-06-01:09:05:00".into(),
        )
        .unwrap();
        assert_eq!(ev.source.id, "cart_log");
        assert_eq!(ev.data, Extracted::Value(12.0));
    }

    #[test]
    fn unmatched_url_is_silent() {
        assert!(observe_at(
            "https://shop.example.com/unrelated.json",
            &cart_body(12),
            "2024-06-01:09:05:00".into(),
        )
        .is_none());
    }

    #[test]
    fn malformed_body_is_treated_as_no_match() {
        assert!(observe_at(
            "https://shop.example.com/cc/item/live/view/top.json",
            &json!({"totally": "different"}),
            "2024-06-01:09:05:00".into(),
        )
        .is_none());
    }
}
