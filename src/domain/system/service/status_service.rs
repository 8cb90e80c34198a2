use serde_json::{json, Value};

use crate::core::time;

pub fn status(store_configured: bool) -> Value {
    json!({
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "store_configured": store_configured,
        "business_time": time::now_compact(),
    })
}
