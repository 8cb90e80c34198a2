//! Runtime-tunable capture settings, file-backed.

use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Granularities the throttle may be set to, in minutes.
pub const THROTTLE_OPTIONS: [u32; 4] = [10, 20, 30, 60];
pub const DEFAULT_THROTTLE_MINUTES: u32 = 20;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SettingsEntity {
    pub throttle_minutes: u32,
    pub updated_at: DateTime<Utc>,
}

impl Default for SettingsEntity {
    fn default() -> Self {
        Self {
            throttle_minutes: DEFAULT_THROTTLE_MINUTES,
            updated_at: Utc::now(),
        }
    }
}

pub trait SettingsRepository: Send + Sync {
    fn read(&self) -> Result<SettingsEntity>;
    fn update(&self, settings: &SettingsEntity) -> Result<()>;
}

/// JSON file under the data directory; a missing file reads as defaults.
pub struct FsSettingsRepository {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FsSettingsRepository {
    pub fn new(path: PathBuf) -> Self {
        Self { path, lock: Mutex::new(()) }
    }
}

impl SettingsRepository for FsSettingsRepository {
    fn read(&self) -> Result<SettingsEntity> {
        let _guard = self.lock.lock();
        match std::fs::read_to_string(&self.path) {
            Ok(raw) => Ok(serde_json::from_str(&raw).unwrap_or_default()),
            Err(_) => Ok(SettingsEntity::default()),
        }
    }

    fn update(&self, settings: &SettingsEntity) -> Result<()> {
        let _guard = self.lock.lock();
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_vec_pretty(settings)?)?;
        Ok(())
    }
}

/// In-memory repository for tests.
#[derive(Default)]
pub struct InMemorySettingsRepository {
    state: Mutex<SettingsEntity>,
}

impl InMemorySettingsRepository {
    pub fn with_throttle(minutes: u32) -> Self {
        Self {
            state: Mutex::new(SettingsEntity {
                throttle_minutes: minutes,
                updated_at: Utc::now(),
            }),
        }
    }
}

impl SettingsRepository for InMemorySettingsRepository {
    fn read(&self) -> Result<SettingsEntity> {
        Ok(self.state.lock().unwrap().clone())
    }

    fn update(&self, settings: &SettingsEntity) -> Result<()> {
        *self.state.lock().unwrap() = settings.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_reads_as_defaults() {
        let path = std::env::temp_dir().join("shopwatch-settings-test").join("none.json");
        let _ = std::fs::remove_file(&path);
        let repo = FsSettingsRepository::new(path);
        assert_eq!(repo.read().unwrap().throttle_minutes, DEFAULT_THROTTLE_MINUTES);
    }

    #[test]
    fn update_round_trips() {
        let path = std::env::temp_dir().join("shopwatch-settings-test").join("rw.json");
        let _ = std::fs::remove_file(&path);
        let repo = FsSettingsRepository::new(path);
        let mut settings = repo.read().unwrap();
        settings.throttle_minutes = 30;
        repo.update(&settings).unwrap();
        assert_eq!(repo.read().unwrap().throttle_minutes, 30);
    }
}
