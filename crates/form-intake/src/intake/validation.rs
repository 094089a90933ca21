use super::domain::{Submission, SubmissionForm, SubmissionKind};
use super::uploads::is_plain_file_name;

/// Reasons a form is rejected before anything is written.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{kind} submission is missing required fields: {}", .missing.join(", "))]
    MissingFields {
        kind: SubmissionKind,
        missing: Vec<&'static str>,
    },
    #[error("uploaded file name {0:?} is not a plain file name")]
    UnsafeFileName(String),
}

/// Report every required field that is absent or empty. Values are not trimmed.
pub fn missing_fields(kind: SubmissionKind, form: &SubmissionForm) -> Vec<&'static str> {
    let mut missing: Vec<&'static str> = kind
        .required_fields()
        .iter()
        .copied()
        .filter(|name| form.fields.get(name).map_or(true, str::is_empty))
        .collect();

    if let Some(file_field) = kind.required_file() {
        let present = form
            .files
            .get(file_field)
            .is_some_and(|file| !file.file_name.is_empty());
        if !present {
            missing.push(file_field);
        }
    }

    missing
}

/// Validate a form for `kind` and turn it into a typed submission.
pub fn validate(kind: SubmissionKind, form: SubmissionForm) -> Result<Submission, ValidationError> {
    let missing = missing_fields(kind, &form);
    if !missing.is_empty() {
        return Err(ValidationError::MissingFields { kind, missing });
    }

    if let Some(file_field) = kind.required_file() {
        if let Some(file) = form.files.get(file_field) {
            if !is_plain_file_name(&file.file_name) {
                return Err(ValidationError::UnsafeFileName(file.file_name.clone()));
            }
        }
    }

    Submission::from_validated(kind, form).ok_or_else(|| ValidationError::MissingFields {
        kind,
        missing: kind.required_file().into_iter().collect(),
    })
}
