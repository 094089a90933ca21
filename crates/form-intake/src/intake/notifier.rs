use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use lettre::message::header::{ContentType, ContentTypeErr};
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncFileTransport, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{debug, warn};

use super::domain::{ApplicationEnquiry, ContactMessage, JobApplication};
use crate::config::{MailConfig, MailTransportConfig, SmtpSecurity};

const ATTACHMENT_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("unable to compose notification: {0}")]
    Compose(#[from] lettre::error::Error),
    #[error("invalid attachment content type: {0}")]
    ContentType(#[from] ContentTypeErr),
    #[error("unable to read attachment {path:?}: {source}")]
    Attachment {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("mail transport unavailable: {0}")]
    Transport(String),
    #[error("mail delivery timed out after {0:?}")]
    TimedOut(Duration),
}

/// Outbound hop for composed messages (SMTP relay, `.eml` files, test fakes).
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, message: Message) -> Result<(), DeliveryError>;
}

/// Transport selected by `MailConfig`.
///
/// The SMTP transport is built without connection pooling, so each message opens,
/// authenticates, sends, and closes its own connection.
pub enum ConfiguredTransport {
    Smtp(AsyncSmtpTransport<Tokio1Executor>),
    File(AsyncFileTransport<Tokio1Executor>),
}

impl ConfiguredTransport {
    pub fn from_config(config: &MailConfig) -> Result<Self, DeliveryError> {
        match &config.transport {
            MailTransportConfig::Smtp {
                host,
                port,
                security,
                username,
                password,
            } => {
                let builder = match security {
                    SmtpSecurity::Tls => AsyncSmtpTransport::<Tokio1Executor>::relay(host),
                    SmtpSecurity::StartTls => {
                        AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
                    }
                    SmtpSecurity::None => {
                        warn!("SMTP TLS is disabled - credentials travel in clear text");
                        Ok(AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host))
                    }
                }
                .map_err(|err| DeliveryError::Transport(format!("create SMTP transport: {err}")))?;

                let transport = builder
                    .port(*port)
                    .credentials(Credentials::new(username.clone(), password.clone()))
                    .timeout(Some(config.send_timeout))
                    .build();
                Ok(Self::Smtp(transport))
            }
            MailTransportConfig::File { path } => {
                std::fs::create_dir_all(path).map_err(|err| {
                    DeliveryError::Transport(format!("create mail directory {path:?}: {err}"))
                })?;
                Ok(Self::File(AsyncFileTransport::<Tokio1Executor>::new(path)))
            }
        }
    }
}

#[async_trait]
impl MailTransport for ConfiguredTransport {
    async fn send(&self, message: Message) -> Result<(), DeliveryError> {
        match self {
            ConfiguredTransport::Smtp(smtp) => smtp
                .send(message)
                .await
                .map(drop)
                .map_err(|err| DeliveryError::Transport(format!("send SMTP email: {err}"))),
            ConfiguredTransport::File(file) => file
                .send(message)
                .await
                .map(drop)
                .map_err(|err| DeliveryError::Transport(format!("write email file: {err}"))),
        }
    }
}

/// Transient message describing one submission for the site owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub subject: String,
    pub body: String,
    pub attachment: Option<PathBuf>,
}

impl Notification {
    pub fn contact(contact: &ContactMessage) -> Self {
        Self {
            subject: format!("New Contact Form Submission: {}", contact.subject),
            body: format!(
                "You have received a new message:\n\n\
                 Name: {}\nEmail: {}\nSubject: {}\nMessage: {}\n",
                contact.name, contact.email, contact.subject, contact.message
            ),
            attachment: None,
        }
    }

    pub fn job_application(application: &JobApplication, resume_path: &Path) -> Self {
        Self {
            subject: format!("New Job Application for {}", application.position),
            body: format!(
                "New Job Application received:\n\
                 Name: {}\nEmail: {}\nPhone: {}\nPosition: {}\n\n\
                 Resume is attached with this email.\n",
                application.name, application.email, application.phone, application.position
            ),
            attachment: Some(resume_path.to_path_buf()),
        }
    }

    pub fn enquiry(enquiry: &ApplicationEnquiry) -> Self {
        let label = capitalize(&enquiry.application_type);
        Self {
            subject: format!("New {label} for {}", enquiry.course),
            body: format!(
                "New {label} received:\n\
                 Name: {}\nEmail: {}\nPhone: {}\nCourse: {}\nMessage: {}\n",
                enquiry.full_name, enquiry.email, enquiry.phone, enquiry.course, enquiry.message
            ),
            attachment: None,
        }
    }
}

/// Upper-cases the first character and lower-cases the rest.
fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// Delivers notifications from the configured sender to the one fixed recipient.
pub struct Notifier<T> {
    transport: T,
    sender: Mailbox,
    recipient: Mailbox,
    send_timeout: Duration,
}

impl Notifier<ConfiguredTransport> {
    pub fn from_config(config: &MailConfig) -> Result<Self, DeliveryError> {
        let transport = ConfiguredTransport::from_config(config)?;
        Ok(Self::new(
            transport,
            config.sender.clone(),
            config.recipient.clone(),
            config.send_timeout,
        ))
    }
}

impl<T: MailTransport> Notifier<T> {
    pub fn new(transport: T, sender: Mailbox, recipient: Mailbox, send_timeout: Duration) -> Self {
        Self {
            transport,
            sender,
            recipient,
            send_timeout,
        }
    }

    /// Send a plain-text message.
    pub async fn notify(&self, subject: &str, body: &str) -> Result<(), DeliveryError> {
        let message = self
            .message_builder(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())?;
        self.deliver(message).await
    }

    /// Send a plain-text message with the file at `file_path` attached as an opaque blob.
    pub async fn notify_with_attachment(
        &self,
        subject: &str,
        body: &str,
        file_path: &Path,
    ) -> Result<(), DeliveryError> {
        let content = tokio::fs::read(file_path)
            .await
            .map_err(|source| DeliveryError::Attachment {
                path: file_path.to_path_buf(),
                source,
            })?;
        let file_name = file_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        let attachment = Attachment::new(file_name)
            .body(content, ContentType::parse(ATTACHMENT_CONTENT_TYPE)?);
        let message = self.message_builder(subject).multipart(
            MultiPart::mixed()
                .singlepart(SinglePart::plain(body.to_string()))
                .singlepart(attachment),
        )?;
        self.deliver(message).await
    }

    pub async fn send(&self, notification: &Notification) -> Result<(), DeliveryError> {
        match &notification.attachment {
            Some(path) => {
                self.notify_with_attachment(&notification.subject, &notification.body, path)
                    .await
            }
            None => self.notify(&notification.subject, &notification.body).await,
        }
    }

    fn message_builder(&self, subject: &str) -> lettre::message::MessageBuilder {
        Message::builder()
            .from(self.sender.clone())
            .to(self.recipient.clone())
            .subject(subject)
    }

    async fn deliver(&self, message: Message) -> Result<(), DeliveryError> {
        match tokio::time::timeout(self.send_timeout, self.transport.send(message)).await {
            Ok(result) => {
                result?;
                debug!(recipient = %self.recipient, "notification delivered");
                Ok(())
            }
            Err(_) => Err(DeliveryError::TimedOut(self.send_timeout)),
        }
    }
}
