//! Replies prefixed by a three digit status code (SMTP).

use serde::{Deserialize, Serialize};

/// A parsed `NNN text` or `NNN-text` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    /// The status code (e.g., 220, 250, 550).
    pub code: u16,
    /// Whether this line ends the reply (`NNN text`) rather than continuing it
    /// (`NNN-text`).
    pub is_last: bool,
    /// The text following the code and separator.
    pub message: String,
}

impl StatusLine {
    /// Parses a reply line, returning `None` when it does not start with a
    /// three digit code followed by a space, a hyphen or nothing.
    #[must_use]
    pub fn parse(line: &str) -> Option<Self> {
        let code = line.get(..3)?;
        if !code.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let code = code.parse::<u16>().ok()?;

        let is_last = match line.as_bytes().get(3) {
            None | Some(b' ') => true,
            Some(b'-') => false,
            Some(_) => return None,
        };

        Some(Self {
            code,
            is_last,
            message: line.get(4..).unwrap_or_default().to_string(),
        })
    }
}

/// How a single line moves the session forward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Not a reply line, or a non-final line of a multi-line reply.
    Data,
    /// A 1xx code. Nothing to act on.
    Informational(u16),
    /// A 4xx or 5xx code; the session fails with this line.
    Error(String),
    /// The server wants the in-flight command's payload.
    Intermediate(u16),
    /// The in-flight command was accepted.
    Success(u16),
    /// The server acknowledged the session close.
    Closing(u16),
}

/// Classification rules for the status-code dialect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCodeDialect {
    /// Codes that ask for the command payload (`354` after `DATA`).
    ///
    /// Default: `[354]`
    #[serde(default = "defaults::intermediate")]
    pub intermediate: Vec<u16>,

    /// Code acknowledging the terminal command.
    ///
    /// Default: `221`
    #[serde(default = "defaults::closing")]
    pub closing: u16,
}

impl Default for StatusCodeDialect {
    fn default() -> Self {
        Self {
            intermediate: defaults::intermediate(),
            closing: defaults::closing(),
        }
    }
}

impl StatusCodeDialect {
    #[must_use]
    pub fn classify(&self, line: &str) -> Reply {
        let Some(status) = StatusLine::parse(line) else {
            return Reply::Data;
        };

        if status.code >= 400 {
            // Errors end the session even midway through a multi-line reply.
            return Reply::Error(line.to_string());
        }

        if !status.is_last {
            return Reply::Data;
        }

        match status.code {
            code if code < 200 => Reply::Informational(code),
            code if code == self.closing => Reply::Closing(code),
            code if self.intermediate.contains(&code) => Reply::Intermediate(code),
            code => Reply::Success(code),
        }
    }
}

/// Encodes a message body for transmission after an intermediate reply.
///
/// Line endings are normalised to CRLF, lines starting with `.` are
/// dot-stuffed and the body is closed with a lone `.` line.
#[must_use]
pub fn encode_payload(body: &str) -> String {
    let body = body
        .strip_suffix("\r\n")
        .or_else(|| body.strip_suffix('\n'))
        .unwrap_or(body);

    let mut encoded = String::with_capacity(body.len() + 8);
    if !body.is_empty() {
        for line in body.split('\n') {
            let line = line.strip_suffix('\r').unwrap_or(line);
            if line.starts_with('.') {
                encoded.push('.');
            }
            encoded.push_str(line);
            encoded.push_str("\r\n");
        }
    }
    encoded.push_str(".\r\n");
    encoded
}

mod defaults {
    pub fn intermediate() -> Vec<u16> {
        vec![354]
    }

    pub const fn closing() -> u16 {
        221
    }
}
