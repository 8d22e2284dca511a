//! Error types for probe sessions.
//!
//! Transport and protocol failures end a session; they are turned into a
//! [`Verdict::Failure`](crate::session::Verdict) carrying the rendered message.
//! Verification mismatches are not errors and live in
//! [`VerificationWarning`](crate::session::VerificationWarning).

use std::{io, path::PathBuf, time::Duration};

use thiserror::Error;

/// Errors that end a probe session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Connecting to the endpoint failed.
    #[error("failed to connect to {endpoint}: {source}")]
    Connect {
        endpoint: String,
        #[source]
        source: io::Error,
    },

    /// Connecting did not finish in time.
    #[error("connecting to {endpoint} timed out after {secs} seconds")]
    ConnectTimeout { endpoint: String, secs: u64 },

    /// Reading from or writing to the connection failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The peer closed the connection before the plan drained.
    #[error("connection closed before completion")]
    ConnectionClosed,

    /// The peer stopped answering.
    #[error("no response within {} seconds", .0.as_secs_f64())]
    Timeout(Duration),

    /// The server answered with an error status or marker.
    ///
    /// Rendered as the raw server line so the caller sees exactly what the
    /// server said.
    #[error("{0}")]
    Protocol(String),

    /// The command plan was driven incorrectly.
    #[error(transparent)]
    Usage(#[from] UsageError),
}

/// Misuse of a [`CommandPlan`](crate::plan::CommandPlan).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UsageError {
    /// A plan must contain at least its terminal command.
    #[error("command plan is empty")]
    EmptyPlan,

    /// The last command of a plan must end the session.
    #[error("last command `{0}` is not a terminal command")]
    MissingTerminal(String),

    /// Insertion is only valid while the terminal command is still pending.
    #[error("cannot insert `{0}` into an empty plan")]
    PrependToEmpty(String),

    /// The server asked for a payload the in-flight command does not carry.
    #[error("server requested a payload but `{0}` has none")]
    MissingPayload(String),
}

/// Errors raised while composing a message.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ComposeError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("failed to format message: {0}")]
    Format(#[from] std::fmt::Error),
}

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config from {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The config file is not valid TOML for [`Config`](crate::config::Config).
    #[error("failed to parse config from {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// `MAILPROBE_CONFIG` names a file that does not exist.
    #[error("MAILPROBE_CONFIG points to non-existent file: {0}")]
    MissingEnvPath(PathBuf),

    /// None of the default locations hold a config file.
    #[error("no configuration file found, tried:\n{0}")]
    NotFound(String),
}
