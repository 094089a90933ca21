use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::response::Response;
use lettre::message::Mailbox;
use lettre::Message;
use serde_json::Value;
use tempfile::TempDir;

use crate::intake::domain::{FormFields, SubmissionForm, UploadedFile};
use crate::intake::notifier::{DeliveryError, MailTransport, Notifier};
use crate::intake::service::IntakeService;
use crate::intake::store::{CsvRecordStore, StoreKind};
use crate::intake::uploads::FileIntake;

/// Captures every message handed to the transport.
#[derive(Default, Clone)]
pub(super) struct RecordingTransport {
    sent: Arc<Mutex<Vec<String>>>,
}

impl RecordingTransport {
    pub(super) fn sent(&self) -> Vec<String> {
        self.sent.lock().expect("transport mutex poisoned").clone()
    }
}

#[async_trait]
impl MailTransport for RecordingTransport {
    async fn send(&self, message: Message) -> Result<(), DeliveryError> {
        let raw = String::from_utf8_lossy(&message.formatted()).into_owned();
        self.sent.lock().expect("transport mutex poisoned").push(raw);
        Ok(())
    }
}

/// Counts attempts and fails every one of them, like an unreachable relay.
#[derive(Default, Clone)]
pub(super) struct FailingTransport {
    attempts: Arc<AtomicUsize>,
}

impl FailingTransport {
    pub(super) fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MailTransport for FailingTransport {
    async fn send(&self, _message: Message) -> Result<(), DeliveryError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(DeliveryError::Transport("connection refused".to_string()))
    }
}

/// Never completes, so only the notifier timeout can end the attempt.
#[derive(Default, Clone)]
pub(super) struct StalledTransport;

#[async_trait]
impl MailTransport for StalledTransport {
    async fn send(&self, _message: Message) -> Result<(), DeliveryError> {
        std::future::pending::<()>().await;
        Ok(())
    }
}

pub(super) fn mailbox(raw: &str) -> Mailbox {
    raw.parse().expect("valid mailbox")
}

pub(super) fn notifier<T: MailTransport>(transport: T) -> Notifier<T> {
    notifier_with_timeout(transport, Duration::from_secs(5))
}

pub(super) fn notifier_with_timeout<T: MailTransport>(
    transport: T,
    timeout: Duration,
) -> Notifier<T> {
    Notifier::new(
        transport,
        mailbox("Website <forms@example.com>"),
        mailbox("office@example.com"),
        timeout,
    )
}

/// Temporary data and upload directories for one test.
pub(super) struct Workspace {
    dir: TempDir,
}

impl Workspace {
    pub(super) fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("temp dir"),
        }
    }

    pub(super) fn path(&self) -> &Path {
        self.dir.path()
    }

    pub(super) fn data_dir(&self) -> PathBuf {
        self.dir.path().join("data")
    }

    pub(super) fn upload_dir(&self) -> PathBuf {
        self.dir.path().join("uploads")
    }

    pub(super) fn store(&self) -> CsvRecordStore {
        CsvRecordStore::new(self.data_dir())
    }

    /// A store rooted at a regular file, so every append fails.
    pub(super) fn blocked_store(&self) -> CsvRecordStore {
        let blocker = self.dir.path().join("blocked");
        std::fs::write(&blocker, b"not a directory").expect("write blocker");
        CsvRecordStore::new(blocker)
    }

    pub(super) fn store_path(&self, kind: StoreKind) -> PathBuf {
        self.data_dir().join(kind.file_name())
    }

    pub(super) fn service<T: MailTransport + 'static>(
        &self,
        transport: T,
    ) -> IntakeService<CsvRecordStore, T> {
        self.service_with_store(self.store(), transport)
    }

    pub(super) fn service_with_store<T: MailTransport + 'static>(
        &self,
        store: CsvRecordStore,
        transport: T,
    ) -> IntakeService<CsvRecordStore, T> {
        IntakeService::new(
            Arc::new(store),
            FileIntake::new(self.upload_dir()),
            Arc::new(notifier(transport)),
        )
    }
}

pub(super) fn read_rows(path: &Path) -> Vec<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_path(path)
        .expect("open store");
    reader
        .records()
        .map(|record| {
            record
                .expect("valid row")
                .iter()
                .map(str::to_string)
                .collect()
        })
        .collect()
}

pub(super) fn row_count(path: &Path) -> usize {
    if path.exists() {
        read_rows(path).len()
    } else {
        0
    }
}

pub(super) fn contact_fields() -> FormFields {
    [
        ("name", "A"),
        ("email", "a@x.com"),
        ("subject", "S"),
        ("message", "M"),
    ]
    .into_iter()
    .collect()
}

pub(super) fn contact_form() -> SubmissionForm {
    SubmissionForm::new(contact_fields())
}

pub(super) fn job_fields() -> FormFields {
    [
        ("name", "Asha Rao"),
        ("email", "asha@example.com"),
        ("phone", "555-0100"),
        ("position", "Instructor"),
    ]
    .into_iter()
    .collect()
}

pub(super) fn job_form(file_name: &str, content: &[u8]) -> SubmissionForm {
    SubmissionForm::new(job_fields()).with_file("resume", UploadedFile::new(file_name, content))
}

pub(super) fn enquiry_fields() -> FormFields {
    [
        ("application_type", "admission"),
        ("full_name", "Ravi Kumar"),
        ("email", "ravi@example.com"),
        ("phone", "555-0101"),
        ("course", "Data Science"),
        ("message", "Is there a weekend batch?"),
    ]
    .into_iter()
    .collect()
}

pub(super) fn enquiry_form() -> SubmissionForm {
    SubmissionForm::new(enquiry_fields())
}

/// Copy of `fields` with `name` replaced by `value`, or dropped when `value` is `None`.
pub(super) fn with_field(fields: &FormFields, names: &[&str], name: &str, value: Option<&str>) -> FormFields {
    names
        .iter()
        .filter_map(|key| {
            if *key == name {
                value.map(|value| (key.to_string(), value.to_string()))
            } else {
                fields
                    .get(key)
                    .map(|existing| (key.to_string(), existing.to_string()))
            }
        })
        .collect()
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
