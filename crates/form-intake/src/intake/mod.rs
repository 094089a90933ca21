//! Submission intake: validation, upload storage, flat-file records and mail notifications.
//!
//! Each request runs `validate -> [store upload] -> append record -> notify` in order.
//! Validation and persistence failures are returned to the caller; notification is best
//! effort and only logged when it fails.

pub mod domain;
pub mod notifier;
pub mod router;
pub mod service;
pub mod store;
pub mod uploads;
pub mod validation;

#[cfg(test)]
mod tests;

pub use domain::{
    ApplicationEnquiry, ContactMessage, FormFields, JobApplication, Submission, SubmissionForm,
    SubmissionKind, UploadedFile,
};
pub use notifier::{ConfiguredTransport, DeliveryError, MailTransport, Notification, Notifier};
pub use router::{intake_router, IntakeResponse};
pub use service::{IntakeError, IntakeReceipt, IntakeService, IntakeStage, PersistenceError};
pub use store::{CsvRecordStore, RecordStore, StoreError, StoreKind, StoredRecord};
pub use uploads::{FileIntake, UploadError};
pub use validation::ValidationError;
