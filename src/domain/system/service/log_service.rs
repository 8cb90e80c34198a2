use std::sync::Arc;

use anyhow::Result;
use serde_json::{json, Value};

use crate::core::state::diag_log::DiagLog;

pub struct LogService {
    diag: Arc<DiagLog>,
}

impl LogService {
    pub fn new(diag: Arc<DiagLog>) -> Self {
        Self { diag }
    }

    pub async fn list_logs(&self) -> Result<Value> {
        Ok(json!({ "logs": self.diag.entries() }))
    }

    pub async fn clear_logs(&self) -> Result<Value> {
        self.diag.clear()?;
        Ok(json!({ "message": "Logs cleared" }))
    }
}
