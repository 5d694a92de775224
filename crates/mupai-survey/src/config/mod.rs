use crate::workflows::survey::validation::validate_email;
use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

pub const DEFAULT_ADMIN_MAILBOX: &str = "administracion@muscleupgym.fitness";
pub const DEFAULT_SUBJECT_PREFIX: &str = "Evaluación patrones alimentarios MUPAI";
const DEFAULT_MAIL_TIMEOUT_SECS: u64 = 20;
const DEFAULT_SESSION_IDLE_SECS: u64 = 2 * 60 * 60;
const DEFAULT_SESSION_CAPACITY: usize = 10_000;

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

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub mail: MailConfig,
    pub sessions: SessionConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig {
                log_level,
                ansi: environment == AppEnvironment::Development,
            },
            mail: MailConfig::from_env()?,
            sessions: SessionConfig::from_env()?,
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

/// Tracing controls. Colored output is only used while developing locally.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub ansi: bool,
}

/// Administrative mailbox and delivery limits for summary e-mails.
///
/// The same mailbox is used as sender and recipient.
#[derive(Debug, Clone)]
pub struct MailConfig {
    pub admin_mailbox: String,
    pub subject_prefix: String,
    pub send_timeout: Duration,
}

impl MailConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let admin_mailbox =
            env::var("APP_MAIL_ADMIN").unwrap_or_else(|_| DEFAULT_ADMIN_MAILBOX.to_string());
        if validate_email(&admin_mailbox).is_err() {
            return Err(ConfigError::InvalidMailbox(admin_mailbox));
        }

        let subject_prefix = env::var("APP_MAIL_SUBJECT_PREFIX")
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_SUBJECT_PREFIX.to_string());

        let timeout_secs = positive_env("APP_MAIL_TIMEOUT_SECS", DEFAULT_MAIL_TIMEOUT_SECS)
            .ok_or(ConfigError::InvalidMailTimeout)?;

        Ok(Self {
            admin_mailbox: admin_mailbox.trim().to_string(),
            subject_prefix,
            send_timeout: Duration::from_secs(timeout_secs),
        })
    }
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            admin_mailbox: DEFAULT_ADMIN_MAILBOX.to_string(),
            subject_prefix: DEFAULT_SUBJECT_PREFIX.to_string(),
            send_timeout: Duration::from_secs(DEFAULT_MAIL_TIMEOUT_SECS),
        }
    }
}

/// Bounds on in-memory session storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Sessions untouched for longer than this are dropped.
    pub idle_ttl: Duration,
    /// Oldest sessions are evicted once this many are stored.
    pub capacity: usize,
}

impl SessionConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let idle_secs = positive_env("APP_SESSION_IDLE_SECS", DEFAULT_SESSION_IDLE_SECS)
            .ok_or(ConfigError::InvalidSessionLimit("APP_SESSION_IDLE_SECS"))?;
        let capacity = positive_env("APP_SESSION_CAPACITY", DEFAULT_SESSION_CAPACITY as u64)
            .ok_or(ConfigError::InvalidSessionLimit("APP_SESSION_CAPACITY"))?;

        Ok(Self {
            idle_ttl: Duration::from_secs(idle_secs),
            capacity: usize::try_from(capacity)
                .map_err(|_| ConfigError::InvalidSessionLimit("APP_SESSION_CAPACITY"))?,
        })
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_ttl: Duration::from_secs(DEFAULT_SESSION_IDLE_SECS),
            capacity: DEFAULT_SESSION_CAPACITY,
        }
    }
}

/// Positive integer from `key`, or `default` when unset. `None` means malformed.
fn positive_env(key: &str, default: u64) -> Option<u64> {
    match env::var(key) {
        Ok(raw) => raw.trim().parse::<u64>().ok().filter(|value| *value > 0),
        Err(_) => Some(default),
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidMailbox(String),
    InvalidMailTimeout,
    InvalidSessionLimit(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidMailbox(value) => {
                write!(f, "APP_MAIL_ADMIN '{value}' is not a valid e-mail address")
            }
            ConfigError::InvalidMailTimeout => {
                write!(f, "APP_MAIL_TIMEOUT_SECS must be a positive number of seconds")
            }
            ConfigError::InvalidSessionLimit(key) => {
                write!(f, "{key} must be a positive integer")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidMailbox(_)
            | ConfigError::InvalidMailTimeout
            | ConfigError::InvalidSessionLimit(_) => None,
        }
    }
}
