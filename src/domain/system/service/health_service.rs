use serde_json::{json, Value};

use crate::core::state;

/// Liveness plus local-state writability. The store is reported as
/// configured or not, never probed, so health stays cheap to poll.
pub fn health(store_configured: bool) -> Value {
    let data_dir = state::data_dir();
    let data_dir_writable = std::fs::create_dir_all(&data_dir).is_ok();
    json!({
        "healthy": data_dir_writable,
        "data_dir": data_dir.display().to_string(),
        "data_dir_writable": data_dir_writable,
        "store_configured": store_configured,
    })
}
