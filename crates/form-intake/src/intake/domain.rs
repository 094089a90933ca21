use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

/// The three forms published on the website.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionKind {
    Contact,
    JobApplication,
    Enquiry,
}

impl SubmissionKind {
    pub const fn label(self) -> &'static str {
        match self {
            SubmissionKind::Contact => "contact",
            SubmissionKind::JobApplication => "job_application",
            SubmissionKind::Enquiry => "enquiry",
        }
    }

    /// Text fields that must be present and non-empty, in schema order.
    pub const fn required_fields(self) -> &'static [&'static str] {
        match self {
            SubmissionKind::Contact => &["name", "email", "subject", "message"],
            SubmissionKind::JobApplication => &["name", "email", "phone", "position"],
            SubmissionKind::Enquiry => &["application_type", "full_name", "email", "phone", "course"],
        }
    }

    /// Multipart file field that must carry an upload, if any.
    pub const fn required_file(self) -> Option<&'static str> {
        match self {
            SubmissionKind::JobApplication => Some("resume"),
            SubmissionKind::Contact | SubmissionKind::Enquiry => None,
        }
    }

    pub const fn success_message(self) -> &'static str {
        match self {
            SubmissionKind::Contact => "✅ Your message has been sent successfully!",
            SubmissionKind::JobApplication => {
                "✅ Your job application has been submitted successfully!"
            }
            SubmissionKind::Enquiry => "✅ Your course enquiry has been submitted successfully!",
        }
    }

    pub const fn validation_message(self) -> &'static str {
        match self {
            SubmissionKind::Contact => "All fields are required.",
            SubmissionKind::JobApplication => "All fields must be filled, including resume.",
            SubmissionKind::Enquiry => "All required fields must be filled.",
        }
    }

    pub const fn failure_message(self) -> &'static str {
        match self {
            SubmissionKind::Contact => "❌ Error submitting contact form",
            SubmissionKind::JobApplication => "❌ Error processing job application",
            SubmissionKind::Enquiry => "❌ Error processing course enquiry",
        }
    }
}

impl fmt::Display for SubmissionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Flat field mapping parsed from one request body. Only lives until validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormFields(BTreeMap<String, String>);

impl FormFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps the first value when a key repeats.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.entry(name.into()).or_insert_with(|| value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    fn take(&mut self, name: &str) -> String {
        self.0.remove(name).unwrap_or_default()
    }
}

impl<K, V> FromIterator<(K, V)> for FormFields
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut fields = FormFields::new();
        for (name, value) in iter {
            fields.insert(name, value);
        }
        fields
    }
}

/// File part received with a job application.
#[derive(Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub file_name: String,
    pub content: Vec<u8>,
}

impl UploadedFile {
    pub fn new(file_name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            content: content.into(),
        }
    }
}

impl fmt::Debug for UploadedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadedFile")
            .field("file_name", &self.file_name)
            .field("len", &self.content.len())
            .finish()
    }
}

/// Everything the transport layer extracted from one request.
#[derive(Debug, Clone, Default)]
pub struct SubmissionForm {
    pub fields: FormFields,
    pub files: BTreeMap<String, UploadedFile>,
}

impl SubmissionForm {
    pub fn new(fields: FormFields) -> Self {
        Self {
            fields,
            files: BTreeMap::new(),
        }
    }

    pub fn with_file(mut self, name: impl Into<String>, file: UploadedFile) -> Self {
        self.files.entry(name.into()).or_insert(file);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactMessage {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobApplication {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub position: String,
    pub resume: UploadedFile,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationEnquiry {
    pub application_type: String,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub course: String,
    /// Optional on the form; stored as an empty string when omitted.
    pub message: String,
}

/// A validated, kind-tagged submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    Contact(ContactMessage),
    JobApplication(JobApplication),
    Enquiry(ApplicationEnquiry),
}

impl Submission {
    pub fn kind(&self) -> SubmissionKind {
        match self {
            Submission::Contact(_) => SubmissionKind::Contact,
            Submission::JobApplication(_) => SubmissionKind::JobApplication,
            Submission::Enquiry(_) => SubmissionKind::Enquiry,
        }
    }

    /// Build the typed submission from a form that already passed validation.
    pub(crate) fn from_validated(kind: SubmissionKind, form: SubmissionForm) -> Option<Self> {
        let SubmissionForm {
            mut fields,
            mut files,
        } = form;

        let submission = match kind {
            SubmissionKind::Contact => Submission::Contact(ContactMessage {
                name: fields.take("name"),
                email: fields.take("email"),
                subject: fields.take("subject"),
                message: fields.take("message"),
            }),
            SubmissionKind::JobApplication => Submission::JobApplication(JobApplication {
                name: fields.take("name"),
                email: fields.take("email"),
                phone: fields.take("phone"),
                position: fields.take("position"),
                resume: files.remove("resume")?,
            }),
            SubmissionKind::Enquiry => Submission::Enquiry(ApplicationEnquiry {
                application_type: fields.take("application_type"),
                full_name: fields.take("full_name"),
                email: fields.take("email"),
                phone: fields.take("phone"),
                course: fields.take("course"),
                message: fields.take("message"),
            }),
        };

        Some(submission)
    }
}
