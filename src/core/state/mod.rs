//! Local key-value state: throttle markers, diagnostics, settings.

pub mod diag_log;
pub mod marker_store;
pub mod settings;

use std::path::PathBuf;

/// Base directory for local state files (`SHOPWATCH_DATA_DIR`, default `./data`).
pub fn data_dir() -> PathBuf {
    std::env::var("SHOPWATCH_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("./data"))
}
