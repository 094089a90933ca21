use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;

use super::domain::{ApplicationEnquiry, JobApplication};

/// One flat store per persisted submission kind. Contact messages have none.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKind {
    JobApplications,
    Enquiries,
}

impl StoreKind {
    pub const fn file_name(self) -> &'static str {
        match self {
            StoreKind::JobApplications => "job_applications.csv",
            StoreKind::Enquiries => "enquiries.csv",
        }
    }
}

/// Persisted projection of a submission: ordered column names with their values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRecord {
    fields: Vec<(&'static str, String)>,
}

impl StoredRecord {
    pub fn new(fields: Vec<(&'static str, String)>) -> Self {
        Self { fields }
    }

    pub fn job_application(application: &JobApplication, resume_path: &Path) -> Self {
        Self::new(vec![
            ("Name", application.name.clone()),
            ("Email", application.email.clone()),
            ("Phone", application.phone.clone()),
            ("Position", application.position.clone()),
            ("Resume", resume_path.display().to_string()),
        ])
    }

    pub fn enquiry(enquiry: &ApplicationEnquiry) -> Self {
        Self::new(vec![
            ("Type", enquiry.application_type.clone()),
            ("Name", enquiry.full_name.clone()),
            ("Email", enquiry.email.clone()),
            ("Phone", enquiry.phone.clone()),
            ("Course", enquiry.course.clone()),
            ("Message", enquiry.message.clone()),
        ])
    }

    pub fn header(&self) -> Vec<&'static str> {
        self.fields.iter().map(|(name, _)| *name).collect()
    }

    pub fn values(&self) -> Vec<&str> {
        self.fields.iter().map(|(_, value)| value.as_str()).collect()
    }
}

/// Append-only storage so the orchestrator can be exercised without touching disk.
pub trait RecordStore: Send + Sync {
    fn append(&self, kind: StoreKind, record: &StoredRecord) -> Result<(), StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store {path:?} unavailable: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("store {path:?} could not be encoded: {source}")]
    Csv { path: PathBuf, source: csv::Error },
    #[error("store {path:?} has header {found:?}, expected {expected:?}")]
    HeaderMismatch {
        path: PathBuf,
        expected: Vec<String>,
        found: Vec<String>,
    },
}

/// CSV-backed store: `<root>/<kind file>`, comma-delimited with a header row.
///
/// Appends to the same store are serialized through a per-store mutex so concurrent
/// requests in this process never interleave rows. Other processes are not coordinated.
#[derive(Debug)]
pub struct CsvRecordStore {
    root: PathBuf,
    job_applications: Mutex<()>,
    enquiries: Mutex<()>,
}

impl CsvRecordStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            job_applications: Mutex::new(()),
            enquiries: Mutex::new(()),
        }
    }

    pub fn path_for(&self, kind: StoreKind) -> PathBuf {
        self.root.join(kind.file_name())
    }

    fn lock(&self, kind: StoreKind) -> MutexGuard<'_, ()> {
        let lock = match kind {
            StoreKind::JobApplications => &self.job_applications,
            StoreKind::Enquiries => &self.enquiries,
        };
        // The guarded value is `()`, so a poisoned lock carries no broken state.
        lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn open(&self, path: &Path) -> Result<File, StoreError> {
        let io_error = |source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        };

        fs::create_dir_all(&self.root).map_err(io_error)?;
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(io_error)
    }

    fn confirm_header(path: &Path, header: &[&'static str]) -> Result<(), StoreError> {
        let csv_error = |source| StoreError::Csv {
            path: path.to_path_buf(),
            source,
        };

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_path(path)
            .map_err(csv_error)?;
        let mut existing = csv::StringRecord::new();
        reader.read_record(&mut existing).map_err(csv_error)?;

        if existing.iter().eq(header.iter().copied()) {
            Ok(())
        } else {
            Err(StoreError::HeaderMismatch {
                path: path.to_path_buf(),
                expected: header.iter().map(|name| name.to_string()).collect(),
                found: existing.iter().map(str::to_string).collect(),
            })
        }
    }

    fn ends_with_newline(path: &Path) -> io::Result<bool> {
        let mut reader = File::open(path)?;
        reader.seek(SeekFrom::End(-1))?;
        let mut last = [0u8; 1];
        reader.read_exact(&mut last)?;
        Ok(last[0] == b'\n')
    }
}

impl RecordStore for CsvRecordStore {
    fn append(&self, kind: StoreKind, record: &StoredRecord) -> Result<(), StoreError> {
        let _guard = self.lock(kind);
        let path = self.path_for(kind);
        let header = record.header();

        let mut file = self.open(&path)?;
        let io_error = |source| StoreError::Io {
            path: path.clone(),
            source,
        };
        let csv_error = |source| StoreError::Csv {
            path: path.clone(),
            source,
        };

        let fresh = file.metadata().map_err(io_error)?.len() == 0;
        if !fresh {
            Self::confirm_header(&path, &header)?;
            // An unterminated last row would otherwise absorb the new one.
            if !Self::ends_with_newline(&path).map_err(io_error)? {
                file.write_all(b"\n").map_err(io_error)?;
            }
        }

        {
            let mut writer = csv::WriterBuilder::new()
                .has_headers(false)
                .from_writer(&mut file);
            if fresh {
                writer.write_record(&header).map_err(csv_error)?;
            }
            writer.write_record(record.values()).map_err(csv_error)?;
            writer.flush().map_err(io_error)?;
        }
        file.sync_data().map_err(io_error)?;

        debug!(path = %path.display(), fresh, "appended record");
        Ok(())
    }
}
