use std::fs;
use std::path::{Component, Path, PathBuf};

use tracing::debug;

use super::domain::UploadedFile;

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("unable to create upload directory {path:?}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("unable to write upload {path:?}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("refusing to store upload under name {0:?}")]
    InvalidFileName(String),
}

/// True when `name` is a single normal path component (no separators, `.`, `..` or roots).
pub fn is_plain_file_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    ) && !name.contains(['/', '\\'])
}

/// Stores uploaded files under a fixed root using the client-supplied name.
///
/// A file with the same name is overwritten without warning; applications that reuse a
/// resume filename end up pointing at the latest upload.
#[derive(Debug, Clone)]
pub struct FileIntake {
    root: PathBuf,
}

impl FileIntake {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create the upload root up front so the first request does not pay for it.
    pub fn prepare(root: impl Into<PathBuf>) -> Result<Self, UploadError> {
        let intake = Self::new(root);
        intake.ensure_root()?;
        Ok(intake)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write the upload to `<root>/<file_name>` and return that path.
    pub fn save(&self, upload: &UploadedFile) -> Result<PathBuf, UploadError> {
        if !is_plain_file_name(&upload.file_name) {
            return Err(UploadError::InvalidFileName(upload.file_name.clone()));
        }

        self.ensure_root()?;

        let path = self.root.join(&upload.file_name);
        fs::write(&path, &upload.content).map_err(|source| UploadError::Write {
            path: path.clone(),
            source,
        })?;

        debug!(path = %path.display(), bytes = upload.content.len(), "stored upload");
        Ok(path)
    }

    fn ensure_root(&self) -> Result<(), UploadError> {
        fs::create_dir_all(&self.root).map_err(|source| UploadError::CreateDir {
            path: self.root.clone(),
            source,
        })
    }
}
