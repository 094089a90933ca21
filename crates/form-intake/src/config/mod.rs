use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use lettre::address::AddressError;
use lettre::message::Mailbox;

const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
const DEFAULT_SEND_TIMEOUT_SECS: u64 = 30;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration, loaded once at start-up and handed to each component.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub storage: StorageConfig,
    pub mail: MailConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(&var_or("APP_ENV", "development"));

        let host = var_or("APP_HOST", "127.0.0.1");
        let port = parse_var("APP_PORT", 5000u16)?;
        let log_level = var_or("APP_LOG_LEVEL", "info");

        let storage = StorageConfig {
            data_dir: PathBuf::from(var_or("INTAKE_DATA_DIR", ".")),
            upload_dir: PathBuf::from(var_or("INTAKE_UPLOAD_DIR", "uploads")),
            max_upload_bytes: parse_var("INTAKE_MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            storage,
            mail: MailConfig::load()?,
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Locations of the flat-file stores and the upload root.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
}

/// Outbound notification settings. Sender and recipient are fixed per deployment.
#[derive(Debug, Clone)]
pub struct MailConfig {
    pub transport: MailTransportConfig,
    pub sender: Mailbox,
    pub recipient: Mailbox,
    pub send_timeout: Duration,
}

impl MailConfig {
    fn load() -> Result<Self, ConfigError> {
        let transport = match var_or("MAIL_TRANSPORT", "smtp").trim().to_ascii_lowercase().as_str()
        {
            "smtp" => MailTransportConfig::Smtp {
                host: var_or("SMTP_HOST", "smtp.gmail.com"),
                port: parse_var("SMTP_PORT", 465u16)?,
                security: SmtpSecurity::from_var(&var_or("SMTP_SECURITY", "tls"))?,
                username: required("SMTP_USERNAME")?,
                password: required("SMTP_PASSWORD")?,
            },
            "file" => MailTransportConfig::File {
                path: PathBuf::from(var_or("MAIL_FILE_DIR", "outbox")),
            },
            other => {
                return Err(ConfigError::Invalid {
                    var: "MAIL_TRANSPORT",
                    value: other.to_string(),
                })
            }
        };

        let sender = match (env::var("MAIL_SENDER"), &transport) {
            (Ok(sender), _) => mailbox("MAIL_SENDER", &sender)?,
            (Err(_), MailTransportConfig::Smtp { username, .. }) => {
                mailbox("SMTP_USERNAME", username)?
            }
            (Err(_), MailTransportConfig::File { .. }) => {
                return Err(ConfigError::Missing("MAIL_SENDER"))
            }
        };
        let recipient = mailbox("MAIL_RECIPIENT", &required("MAIL_RECIPIENT")?)?;
        let send_timeout =
            Duration::from_secs(parse_var("MAIL_SEND_TIMEOUT_SECS", DEFAULT_SEND_TIMEOUT_SECS)?);

        Ok(Self {
            transport,
            sender,
            recipient,
            send_timeout,
        })
    }
}

#[derive(Clone)]
pub enum MailTransportConfig {
    Smtp {
        host: String,
        port: u16,
        security: SmtpSecurity,
        username: String,
        password: String,
    },
    /// Writes each message as an `.eml` file instead of relaying it.
    File { path: PathBuf },
}

impl fmt::Debug for MailTransportConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MailTransportConfig::Smtp {
                host,
                port,
                security,
                username,
                ..
            } => f
                .debug_struct("Smtp")
                .field("host", host)
                .field("port", port)
                .field("security", security)
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
            MailTransportConfig::File { path } => {
                f.debug_struct("File").field("path", path).finish()
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmtpSecurity {
    /// SMTP over implicit TLS (SMTPS).
    Tls,
    StartTls,
    None,
}

impl SmtpSecurity {
    fn from_var(value: &str) -> Result<Self, ConfigError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "tls" | "ssl" => Ok(Self::Tls),
            "starttls" => Ok(Self::StartTls),
            "none" | "plain" => Ok(Self::None),
            other => Err(ConfigError::Invalid {
                var: "SMTP_SECURITY",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{var} has an unsupported value '{value}'")]
    Invalid { var: &'static str, value: String },
    #[error("APP_HOST must parse to an IPv4 or IPv6 address")]
    InvalidHost { source: std::net::AddrParseError },
    #[error("{var} is not a valid mailbox")]
    InvalidMailbox {
        var: &'static str,
        source: AddressError,
    },
}

fn var_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::Missing(name)),
    }
}

fn parse_var<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
            var: name,
            value: raw,
        }),
        Err(_) => Ok(default),
    }
}

fn mailbox(var: &'static str, raw: &str) -> Result<Mailbox, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|source| ConfigError::InvalidMailbox { var, source })
}
