//! Settings DTOs
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct SettingsUpsertRequest {
    pub throttle_minutes: u32,
}
