use std::path::PathBuf;
use std::sync::Arc;

use tokio::task::JoinError;
use tracing::{debug, error, info, warn};

use super::domain::{
    ApplicationEnquiry, ContactMessage, JobApplication, Submission, SubmissionForm, SubmissionKind,
};
use super::notifier::{MailTransport, Notification, Notifier};
use super::store::{RecordStore, StoreError, StoreKind, StoredRecord};
use super::uploads::{FileIntake, UploadError};
use super::validation::{self, ValidationError};

/// Stages a submission passes through; used for logging and error context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntakeStage {
    Received,
    Validating,
    Rejected,
    Validated,
    StoringFile,
    Recording,
    RecordFailed,
    Recorded,
    Notifying,
    Responded,
}

impl IntakeStage {
    pub const fn label(self) -> &'static str {
        match self {
            IntakeStage::Received => "received",
            IntakeStage::Validating => "validating",
            IntakeStage::Rejected => "rejected",
            IntakeStage::Validated => "validated",
            IntakeStage::StoringFile => "storing_file",
            IntakeStage::Recording => "recording",
            IntakeStage::RecordFailed => "record_failed",
            IntakeStage::Recorded => "recorded",
            IntakeStage::Notifying => "notifying",
            IntakeStage::Responded => "responded",
        }
    }
}

impl std::fmt::Display for IntakeStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Outcome of a successful intake. Delivery status is informational only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntakeReceipt {
    pub kind: SubmissionKind,
    pub stored_file: Option<PathBuf>,
    pub notified: bool,
}

impl IntakeReceipt {
    pub fn message(&self) -> &'static str {
        self.kind.success_message()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error(transparent)]
    Upload(#[from] UploadError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("blocking storage task did not complete: {0}")]
    Worker(#[from] JoinError),
}

/// Error raised by the intake service. Delivery failures never surface here.
#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    #[error("{kind} submission rejected: {source}")]
    Validation {
        kind: SubmissionKind,
        source: ValidationError,
    },
    #[error("{kind} submission failed while {stage}: {source}")]
    Persistence {
        kind: SubmissionKind,
        stage: IntakeStage,
        source: PersistenceError,
    },
}

impl IntakeError {
    pub fn kind(&self) -> SubmissionKind {
        match self {
            IntakeError::Validation { kind, .. } | IntakeError::Persistence { kind, .. } => *kind,
        }
    }

    /// Fixed client-facing text; internal detail stays in the logs.
    pub fn client_message(&self) -> &'static str {
        match self {
            IntakeError::Validation { kind, .. } => kind.validation_message(),
            IntakeError::Persistence { kind, .. } => kind.failure_message(),
        }
    }
}

/// Drives validation, file intake, record storage and notification for each form kind.
pub struct IntakeService<S, T> {
    store: Arc<S>,
    uploads: FileIntake,
    notifier: Arc<Notifier<T>>,
}

impl<S, T> IntakeService<S, T>
where
    S: RecordStore + 'static,
    T: MailTransport + 'static,
{
    pub fn new(store: Arc<S>, uploads: FileIntake, notifier: Arc<Notifier<T>>) -> Self {
        Self {
            store,
            uploads,
            notifier,
        }
    }

    /// Validate a raw form for `kind` and run the matching pipeline.
    pub async fn handle(
        &self,
        kind: SubmissionKind,
        form: SubmissionForm,
    ) -> Result<IntakeReceipt, IntakeError> {
        debug!(%kind, stage = %IntakeStage::Received, "submission received");
        debug!(%kind, stage = %IntakeStage::Validating, "validating submission");

        let submission = validation::validate(kind, form).map_err(|source| {
            info!(%kind, stage = %IntakeStage::Rejected, error = %source, "submission rejected");
            IntakeError::Validation { kind, source }
        })?;

        self.process(submission).await
    }

    /// Run an already validated submission through persistence and notification.
    pub async fn process(&self, submission: Submission) -> Result<IntakeReceipt, IntakeError> {
        let kind = submission.kind();
        debug!(%kind, stage = %IntakeStage::Validated, "submission validated");

        let result = match submission {
            Submission::Contact(contact) => Ok(self.process_contact(contact).await),
            Submission::JobApplication(application) => {
                self.process_job_application(application).await
            }
            Submission::Enquiry(enquiry) => self.process_enquiry(enquiry).await,
        };

        match &result {
            Ok(receipt) => info!(
                %kind,
                stage = %IntakeStage::Responded,
                notified = receipt.notified,
                "submission accepted"
            ),
            Err(err) => error!(%kind, stage = %IntakeStage::RecordFailed, error = %err, "submission failed"),
        }
        result
    }

    /// Contact messages are relayed by mail only; nothing is persisted for them.
    async fn process_contact(&self, contact: ContactMessage) -> IntakeReceipt {
        let notified = self
            .dispatch(SubmissionKind::Contact, Notification::contact(&contact))
            .await;

        IntakeReceipt {
            kind: SubmissionKind::Contact,
            stored_file: None,
            notified,
        }
    }

    async fn process_job_application(
        &self,
        application: JobApplication,
    ) -> Result<IntakeReceipt, IntakeError> {
        let kind = SubmissionKind::JobApplication;

        debug!(%kind, stage = %IntakeStage::StoringFile, file = %application.resume.file_name, "storing resume");
        let uploads = self.uploads.clone();
        let (application, saved) = run_blocking(kind, IntakeStage::StoringFile, move || {
            let saved = uploads.save(&application.resume);
            (application, saved)
        })
        .await?;
        let resume_path = saved.map_err(|err| persistence(kind, IntakeStage::StoringFile, err))?;

        self.record(
            kind,
            StoreKind::JobApplications,
            StoredRecord::job_application(&application, &resume_path),
        )
        .await?;

        let notification = Notification::job_application(&application, &resume_path);
        let notified = self.dispatch(kind, notification).await;

        Ok(IntakeReceipt {
            kind,
            stored_file: Some(resume_path),
            notified,
        })
    }

    async fn process_enquiry(
        &self,
        enquiry: ApplicationEnquiry,
    ) -> Result<IntakeReceipt, IntakeError> {
        let kind = SubmissionKind::Enquiry;
        self.record(kind, StoreKind::Enquiries, StoredRecord::enquiry(&enquiry))
            .await?;

        let notified = self.dispatch(kind, Notification::enquiry(&enquiry)).await;

        Ok(IntakeReceipt {
            kind,
            stored_file: None,
            notified,
        })
    }

    async fn record(
        &self,
        kind: SubmissionKind,
        store_kind: StoreKind,
        record: StoredRecord,
    ) -> Result<(), IntakeError> {
        debug!(%kind, stage = %IntakeStage::Recording, "appending record");
        let store = Arc::clone(&self.store);
        run_blocking(kind, IntakeStage::Recording, move || {
            store.append(store_kind, &record)
        })
        .await?
        .map_err(|err| persistence(kind, IntakeStage::Recording, err))?;
        debug!(%kind, stage = %IntakeStage::Recorded, "record appended");
        Ok(())
    }

    /// Best effort: failures are logged and reported as `false`.
    async fn dispatch(&self, kind: SubmissionKind, notification: Notification) -> bool {
        debug!(%kind, stage = %IntakeStage::Notifying, subject = %notification.subject, "sending notification");
        match self.notifier.send(&notification).await {
            Ok(()) => true,
            Err(err) => {
                warn!(%kind, stage = %IntakeStage::Notifying, error = %err, "notification failed");
                false
            }
        }
    }
}

/// Run a blocking file or store write on the blocking pool.
async fn run_blocking<F, R>(kind: SubmissionKind, stage: IntakeStage, task: F) -> Result<R, IntakeError>
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|err| persistence(kind, stage, err))
}

fn persistence(
    kind: SubmissionKind,
    stage: IntakeStage,
    source: impl Into<PersistenceError>,
) -> IntakeError {
    IntakeError::Persistence {
        kind,
        stage,
        source: source.into(),
    }
}
