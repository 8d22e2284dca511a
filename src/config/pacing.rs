//! Delays inserted between a response and the next write.
//!
//! The readiness signal is always the classified response; these delays only
//! keep the harness from overrunning servers with small line buffers. All of
//! them can be set to zero.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Resolved delays handed to a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Pacing {
    /// Before the first command, once the greeting arrived.
    pub greeting: Duration,
    /// Before every later command.
    pub command: Duration,
    /// Before a payload requested by an intermediate reply.
    pub continuation: Duration,
    /// Between the closing acknowledgement and disconnecting.
    pub settle: Duration,
}

impl Pacing {
    /// No delays at all.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            greeting: Duration::ZERO,
            command: Duration::ZERO,
            continuation: Duration::ZERO,
            settle: Duration::ZERO,
        }
    }
}

/// Pacing for the status-code dialect.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpPacing {
    /// Default: 300 milliseconds
    #[serde(default = "defaults::smtp_greeting_ms")]
    pub greeting_ms: u64,

    /// Default: 250 milliseconds
    #[serde(default = "defaults::smtp_command_ms")]
    pub command_ms: u64,

    /// Default: 200 milliseconds
    #[serde(default = "defaults::smtp_continuation_ms")]
    pub continuation_ms: u64,

    /// Default: 100 milliseconds
    #[serde(default = "defaults::smtp_settle_ms")]
    pub settle_ms: u64,
}

impl Default for SmtpPacing {
    fn default() -> Self {
        Self {
            greeting_ms: defaults::smtp_greeting_ms(),
            command_ms: defaults::smtp_command_ms(),
            continuation_ms: defaults::smtp_continuation_ms(),
            settle_ms: defaults::smtp_settle_ms(),
        }
    }
}

impl From<&SmtpPacing> for Pacing {
    fn from(value: &SmtpPacing) -> Self {
        Self {
            greeting: Duration::from_millis(value.greeting_ms),
            command: Duration::from_millis(value.command_ms),
            continuation: Duration::from_millis(value.continuation_ms),
            settle: Duration::from_millis(value.settle_ms),
        }
    }
}

/// Pacing for the terminator dialect, which waits the same before every
/// command including the first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pop3Pacing {
    /// Default: 400 milliseconds
    #[serde(default = "defaults::pop3_command_ms")]
    pub command_ms: u64,
}

impl Default for Pop3Pacing {
    fn default() -> Self {
        Self {
            command_ms: defaults::pop3_command_ms(),
        }
    }
}

impl From<&Pop3Pacing> for Pacing {
    fn from(value: &Pop3Pacing) -> Self {
        let command = Duration::from_millis(value.command_ms);
        Self {
            greeting: command,
            command,
            continuation: Duration::ZERO,
            settle: Duration::ZERO,
        }
    }
}

/// The `[pacing]` table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PacingConfig {
    #[serde(default)]
    pub smtp: SmtpPacing,

    #[serde(default)]
    pub pop3: Pop3Pacing,
}

mod defaults {
    pub const fn smtp_greeting_ms() -> u64 {
        300
    }
    pub const fn smtp_command_ms() -> u64 {
        250
    }
    pub const fn smtp_continuation_ms() -> u64 {
        200
    }
    pub const fn smtp_settle_ms() -> u64 {
        100
    }

    pub const fn pop3_command_ms() -> u64 {
        400
    }
}
