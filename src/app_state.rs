use std::sync::Arc;

use anyhow::{bail, Result};
use serde_json::Value;

use crate::core::capture;
use crate::core::client::row_store::{RestRowStore, RowStore};
use crate::core::sink::{SinkOutcome, ThrottledSink};
use crate::core::state;
use crate::core::state::diag_log::DiagLog;
use crate::core::state::marker_store::{FsMarkerStore, LastWrite, MarkerStore};
use crate::core::state::settings::{
    FsSettingsRepository, SettingsEntity, SettingsRepository, THROTTLE_OPTIONS,
};
use crate::domain::chart::model::ChartData;
use crate::domain::chart::service::ChartService;
use crate::domain::import::sheet_grid;
use crate::domain::note::service::NoteService;
use crate::domain::system::service::log_service::LogService;
use crate::domain::system::service::{health_service, status_service};

#[derive(Clone)]
pub struct AppState {
    pub capture_service: Arc<CaptureService>,
    pub chart_service: Arc<ChartService>,
    pub note_service: Arc<NoteService>,
    pub import_service: Arc<ImportService>,
    pub setting_service: Arc<SettingService>,
    pub system_service: Arc<SystemService>,
    pub log_service: Arc<LogService>,
}

pub fn build_app_state() -> AppState {
    let data_dir = state::data_dir();
    let diag = Arc::new(DiagLog::new(data_dir.join("diag_log.json")));
    let markers: Arc<dyn MarkerStore> =
        Arc::new(FsMarkerStore::new(data_dir.join("markers.json")));
    let settings: Arc<dyn SettingsRepository> =
        Arc::new(FsSettingsRepository::new(data_dir.join("settings.json")));

    let rest = RestRowStore::from_env();
    let store_configured = rest.is_configured();
    let store: Arc<dyn RowStore> = Arc::new(rest);

    let sink = ThrottledSink::new(markers, store.clone(), settings.clone(), diag.clone());

    AppState {
        capture_service: Arc::new(CaptureService::new(sink)),
        chart_service: Arc::new(ChartService::new(store.clone(), diag.clone())),
        note_service: Arc::new(NoteService::new(store)),
        import_service: Arc::new(ImportService),
        setting_service: Arc::new(SettingService::new(settings)),
        system_service: Arc::new(SystemService { store_configured }),
        log_service: Arc::new(LogService::new(diag)),
    }
}

/// Capture agent + throttled sink behind one call.
pub struct CaptureService {
    sink: ThrottledSink,
}

impl CaptureService {
    pub fn new(sink: ThrottledSink) -> Self {
        Self { sink }
    }

    pub async fn observe(
        &self,
        url: &str,
        body: &Value,
        recorded_at: Option<String>,
    ) -> (Option<&'static str>, Option<SinkOutcome>) {
        let event = match recorded_at {
            Some(at) => capture::observe_at(url, body, at),
            None => capture::observe(url, body),
        };
        match event {
            Some(event) => {
                let outcome = self.sink.handle(&event).await;
                (Some(event.source.id), Some(outcome))
            }
            None => (None, None),
        }
    }

    pub async fn last_write(&self) -> Option<LastWrite> {
        self.sink.last_write().await
    }
}

pub struct ImportService;

impl ImportService {
    pub async fn parse_sheet(&self, rows: &[Vec<Value>]) -> Result<ChartData> {
        sheet_grid::parse_sheet_grid(rows)
    }
}

pub struct SettingService {
    repo: Arc<dyn SettingsRepository>,
}

impl SettingService {
    pub fn new(repo: Arc<dyn SettingsRepository>) -> Self {
        Self { repo }
    }

    pub async fn get_settings(&self) -> Result<SettingsEntity> {
        self.repo.read()
    }

    pub async fn upsert_settings(&self, throttle_minutes: u32) -> Result<Value> {
        if !THROTTLE_OPTIONS.contains(&throttle_minutes) {
            bail!("throttle_minutes must be one of {THROTTLE_OPTIONS:?}");
        }
        let mut settings = self.repo.read()?;
        settings.throttle_minutes = throttle_minutes;
        settings.updated_at = chrono::Utc::now();
        self.repo.update(&settings)?;
        Ok(serde_json::json!({
            "message": "Settings updated successfully",
            "updated_at": settings.updated_at.to_rfc3339(),
        }))
    }
}

pub struct SystemService {
    pub store_configured: bool,
}

impl SystemService {
    pub async fn status(&self) -> Result<Value> {
        Ok(status_service::status(self.store_configured))
    }

    pub async fn health(&self) -> Result<Value> {
        Ok(health_service::health(self.store_configured))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::state::settings::InMemorySettingsRepository;

    #[tokio::test]
    async fn settings_upsert_rejects_unknown_granularities() {
        let repo = Arc::new(InMemorySettingsRepository::default());
        let service = SettingService::new(repo.clone());

        assert!(service.upsert_settings(25).await.is_err());
        assert_eq!(repo.read().unwrap().throttle_minutes, 20);

        service.upsert_settings(60).await.unwrap();
        assert_eq!(repo.read().unwrap().throttle_minutes, 60);
    }
}
