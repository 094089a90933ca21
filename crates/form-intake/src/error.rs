use crate::config::ConfigError;
use crate::intake::{DeliveryError, UploadError};
use crate::telemetry::TelemetryError;

/// Start-up and process-level failures. Per-request failures are `IntakeError`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("mail error: {0}")]
    Mail(#[from] DeliveryError),
    #[error("upload directory error: {0}")]
    Upload(#[from] UploadError),
}
