//! Bounded diagnostic log, surfaced over the system API.
//!
//! This is the operator-visible trail of capture/persist activity; the
//! ambient `tracing` output stays separate. Appends must never take the
//! pipeline down, so failures here are logged and swallowed.

use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::Result;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::error;

/// Ring capacity; older entries are discarded.
pub const MAX_ENTRIES: usize = 100;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiagEntry {
    pub t: String,
    pub level: String,
    pub msg: String,
}

pub struct DiagLog {
    path: PathBuf,
    lock: Mutex<()>,
}

impl DiagLog {
    pub fn new(path: PathBuf) -> Self {
        Self { path, lock: Mutex::new(()) }
    }

    fn load(&self) -> Vec<DiagEntry> {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_default(),
            Err(_) => Vec::new(),
        }
    }

    fn save(&self, entries: &[DiagEntry]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_vec(entries)?)?;
        Ok(())
    }

    pub fn append(&self, level: &str, msg: impl Into<String>) {
        let entry = DiagEntry {
            t: Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
            level: level.to_string(),
            msg: msg.into(),
        };
        let guard = self.lock.lock();
        let mut entries = self.load();
        entries.push(entry);
        if entries.len() > MAX_ENTRIES {
            let excess = entries.len() - MAX_ENTRIES;
            entries.drain(0..excess);
        }
        if let Err(err) = self.save(&entries) {
            error!(error = %err, "failed to persist diagnostic entry");
        }
        drop(guard);
    }

    pub fn info(&self, msg: impl Into<String>) {
        self.append("log", msg);
    }

    pub fn warn(&self, msg: impl Into<String>) {
        self.append("warn", msg);
    }

    pub fn entries(&self) -> Vec<DiagEntry> {
        let _guard = self.lock.lock();
        self.load()
    }

    pub fn clear(&self) -> Result<()> {
        let _guard = self.lock.lock();
        self.save(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_log(name: &str) -> DiagLog {
        let path = std::env::temp_dir().join("shopwatch-diag-test").join(name);
        let _ = std::fs::remove_file(&path);
        DiagLog::new(path)
    }

    #[test]
    fn appends_in_order_and_clears() {
        let log = temp_log("basic.json");
        log.info("first");
        log.warn("second");
        let entries = log.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].msg, "first");
        assert_eq!(entries[1].level, "warn");

        log.clear().unwrap();
        assert!(log.entries().is_empty());
    }

    #[test]
    fn ring_drops_oldest_beyond_capacity() {
        let log = temp_log("ring.json");
        for i in 0..(MAX_ENTRIES + 5) {
            log.info(format!("entry {i}"));
        }
        let entries = log.entries();
        assert_eq!(entries.len(), MAX_ENTRIES);
        assert_eq!(entries[0].msg, "entry 5");
    }
}
