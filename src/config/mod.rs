//! Configuration for probe runs.
//!
//! A config file names the servers to probe and overrides pacing and
//! timeouts. Every field has a default, so an empty file is valid.
//!
//! ```toml
//! parallel = false
//!
//! [timeouts]
//! response_secs = 30
//!
//! [[smtp]]
//! name = "Postfix SMTP"
//! port = 25
//!
//! [[pop3]]
//! username = "testuser"
//! password = "testpass"
//!
//! [flow]
//! to = "testuser@example.com"
//! ```

pub mod pacing;
pub mod timeouts;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub use pacing::{Pacing, PacingConfig, Pop3Pacing, SmtpPacing};
pub use timeouts::Timeouts;

use crate::{dialect::StatusCodeDialect, error::ConfigError, transport::Endpoint};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Run the configured probes concurrently instead of one after another.
    #[serde(default)]
    pub parallel: bool,

    #[serde(default)]
    pub pacing: PacingConfig,

    #[serde(default)]
    pub timeouts: Timeouts,

    /// Classification codes for the status-code dialect.
    #[serde(default)]
    pub status_codes: StatusCodeDialect,

    #[serde(default)]
    pub smtp: Vec<SmtpTarget>,

    #[serde(default)]
    pub pop3: Vec<Pop3Account>,

    pub flow: Option<FlowConfig>,
}

impl Config {
    /// Reads and parses the config file at `path`.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Find the configuration file using the following precedence:
    /// 1. `MAILPROBE_CONFIG` environment variable
    /// 2. ./mailprobe.toml (current working directory)
    /// 3. /etc/mailprobe/mailprobe.toml (system-wide config)
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the environment variable names a missing
    /// file or none of the default paths exist.
    pub fn find_file() -> Result<PathBuf, ConfigError> {
        if let Ok(env_path) = std::env::var("MAILPROBE_CONFIG") {
            let path = PathBuf::from(env_path);
            if path.exists() {
                return Ok(path);
            }
            return Err(ConfigError::MissingEnvPath(path));
        }

        let default_paths = [
            PathBuf::from("./mailprobe.toml"),
            PathBuf::from("/etc/mailprobe/mailprobe.toml"),
        ];

        if let Some(path) = default_paths.iter().find(|path| path.exists()) {
            return Ok(path.clone());
        }

        let paths_tried = std::iter::once("  - MAILPROBE_CONFIG environment variable".to_string())
            .chain(default_paths.iter().map(|p| format!("  - {}", p.display())))
            .collect::<Vec<_>>()
            .join("\n");

        Err(ConfigError::NotFound(paths_tried))
    }
}

/// A server to submit a test message to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpTarget {
    /// Label used in banners. Defaults to `host:port`.
    pub name: Option<String>,

    #[serde(default = "defaults::host")]
    pub host: String,

    /// Default: 25
    #[serde(default = "defaults::smtp_port")]
    pub port: u16,

    #[serde(default = "defaults::helo")]
    pub helo: String,

    #[serde(default = "defaults::from")]
    pub from: String,

    #[serde(default = "defaults::to")]
    pub to: String,

    #[serde(default = "defaults::subject")]
    pub subject: String,

    #[serde(default = "defaults::body")]
    pub body: String,
}

impl Default for SmtpTarget {
    fn default() -> Self {
        Self {
            name: None,
            host: defaults::host(),
            port: defaults::smtp_port(),
            helo: defaults::helo(),
            from: defaults::from(),
            to: defaults::to(),
            subject: defaults::subject(),
            body: defaults::body(),
        }
    }
}

impl SmtpTarget {
    #[must_use]
    pub fn endpoint(&self) -> Endpoint {
        Endpoint::new(&self.host, self.port)
    }

    #[must_use]
    pub fn label(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| self.endpoint().to_string())
    }
}

/// A mailbox to log in to and inspect.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pop3Account {
    #[serde(default = "defaults::host")]
    pub host: String,

    /// Default: 110
    #[serde(default = "defaults::pop3_port")]
    pub port: u16,

    pub username: String,

    pub password: String,

    /// Text the newest message must contain.
    pub expected_content: Option<String>,
}

impl Pop3Account {
    #[must_use]
    pub fn endpoint(&self) -> Endpoint {
        Endpoint::new(&self.host, self.port)
    }
}

/// Submit a tokenised message, then retrieve it from the mailbox.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowConfig {
    #[serde(default = "defaults::host")]
    pub smtp_host: String,

    #[serde(default = "defaults::smtp_port")]
    pub smtp_port: u16,

    #[serde(default = "defaults::helo")]
    pub helo: String,

    #[serde(default = "defaults::from")]
    pub from: String,

    #[serde(default = "defaults::flow_to")]
    pub to: String,

    #[serde(default = "defaults::host")]
    pub pop3_host: String,

    #[serde(default = "defaults::pop3_port")]
    pub pop3_port: u16,

    #[serde(default = "defaults::username")]
    pub username: String,

    #[serde(default = "defaults::password")]
    pub password: String,

    /// Time allowed for local delivery between submission and retrieval.
    ///
    /// Default: 1500 milliseconds
    #[serde(default = "defaults::delivery_wait_ms")]
    pub delivery_wait_ms: u64,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            smtp_host: defaults::host(),
            smtp_port: defaults::smtp_port(),
            helo: defaults::helo(),
            from: defaults::from(),
            to: defaults::flow_to(),
            pop3_host: defaults::host(),
            pop3_port: defaults::pop3_port(),
            username: defaults::username(),
            password: defaults::password(),
            delivery_wait_ms: defaults::delivery_wait_ms(),
        }
    }
}

impl FlowConfig {
    /// The submission side of the round trip, labelled `Flow`.
    #[must_use]
    pub fn smtp_target(&self, subject: impl Into<String>) -> SmtpTarget {
        SmtpTarget {
            name: Some("Flow".to_string()),
            host: self.smtp_host.clone(),
            port: self.smtp_port,
            helo: self.helo.clone(),
            from: self.from.clone(),
            to: self.to.clone(),
            subject: subject.into(),
            body: String::new(),
        }
    }

    #[must_use]
    pub fn pop3_account(&self, expected_content: impl Into<String>) -> Pop3Account {
        Pop3Account {
            host: self.pop3_host.clone(),
            port: self.pop3_port,
            username: self.username.clone(),
            password: self.password.clone(),
            expected_content: Some(expected_content.into()),
        }
    }
}

mod defaults {
    pub fn host() -> String {
        "localhost".to_string()
    }
    pub const fn smtp_port() -> u16 {
        25
    }
    pub const fn pop3_port() -> u16 {
        110
    }
    pub fn helo() -> String {
        "example.com".to_string()
    }
    pub fn from() -> String {
        "sender@example.com".to_string()
    }
    pub fn to() -> String {
        "receiver@example.com".to_string()
    }
    pub fn flow_to() -> String {
        "testuser@example.com".to_string()
    }
    pub fn subject() -> String {
        "Test Email from mailprobe".to_string()
    }
    pub fn body() -> String {
        "This is a test email sent by the mailprobe SMTP tester.".to_string()
    }
    pub fn username() -> String {
        "testuser".to_string()
    }
    pub fn password() -> String {
        "testpass".to_string()
    }
    pub const fn delivery_wait_ms() -> u64 {
        1500
    }
}
