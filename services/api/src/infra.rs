use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use form_intake::config::AppConfig;
use form_intake::error::AppError;
use form_intake::intake::{ConfiguredTransport, CsvRecordStore, FileIntake, IntakeService, Notifier};

pub(crate) type AppIntakeService = IntakeService<CsvRecordStore, ConfiguredTransport>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Wire the store, upload directory and notifier from configuration.
pub(crate) fn build_intake_service(config: &AppConfig) -> Result<AppIntakeService, AppError> {
    let store = Arc::new(CsvRecordStore::new(&config.storage.data_dir));
    let uploads = FileIntake::prepare(&config.storage.upload_dir)?;
    let notifier = Arc::new(Notifier::from_config(&config.mail)?);

    Ok(IntakeService::new(store, uploads, notifier))
}
