//! Composes the messages submitted by a round trip.

use std::fmt::Write;

use chrono::{SecondsFormat, Utc};
use rand::{Rng, distr::Alphanumeric};

use crate::error::ComposeError;

/// Length of the random suffix of a verification token.
const TOKEN_SUFFIX_LEN: usize = 6;

/// Builder for a plain or `multipart/alternative` message.
///
/// ```
/// use mailprobe::message::MessageBuilder;
///
/// let message = MessageBuilder::new()
///     .from("sender@example.com")
///     .to("testuser@example.com")
///     .subject("Hello")
///     .text("This is the message body")
///     .build()
///     .unwrap();
///
/// assert!(message.contains("Subject: Hello\r\n"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct MessageBuilder {
    from: Option<String>,
    to: Vec<String>,
    subject: Option<String>,
    headers: Vec<(String, String)>,
    text: Option<String>,
    html: Option<String>,
}

impl MessageBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from(mut self, address: impl Into<String>) -> Self {
        self.from = Some(address.into());
        self
    }

    /// Adds a recipient to the To header.
    #[must_use]
    pub fn to(mut self, address: impl Into<String>) -> Self {
        self.to.push(address.into());
        self
    }

    #[must_use]
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Adds a custom header, written after the standard ones in insertion
    /// order.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Sets the plain text body.
    #[must_use]
    pub fn text(mut self, content: impl Into<String>) -> Self {
        self.text = Some(content.into());
        self
    }

    /// Sets an HTML alternative, which makes the message
    /// `multipart/alternative`.
    #[must_use]
    pub fn html(mut self, content: impl Into<String>) -> Self {
        self.html = Some(content.into());
        self
    }

    /// Renders the message with CRLF line endings.
    ///
    /// # Errors
    ///
    /// Returns [`ComposeError::MissingField`] if the sender or every
    /// recipient is missing.
    pub fn build(self) -> Result<String, ComposeError> {
        let from = self.from.as_deref().ok_or(ComposeError::MissingField("from"))?;
        if self.to.is_empty() {
            return Err(ComposeError::MissingField("to"));
        }

        let now = Utc::now();
        let mut message = String::with_capacity(1024);

        write!(message, "From: {from}\r\n")?;
        write!(message, "To: {}\r\n", self.to.join(", "))?;
        if let Some(subject) = &self.subject {
            write!(message, "Subject: {subject}\r\n")?;
        }
        write!(message, "Date: {}\r\n", now.to_rfc2822())?;
        write!(message, "Message-ID: <{}@{}>\r\n", now.timestamp_millis(), domain_of(from))?;
        for (name, value) in &self.headers {
            write!(message, "{name}: {value}\r\n")?;
        }
        write!(message, "MIME-Version: 1.0\r\n")?;

        let text = self.text.as_deref().unwrap_or_default();
        match &self.html {
            None => {
                write!(message, "Content-Type: text/plain; charset=utf-8\r\n\r\n")?;
                write!(message, "{}\r\n", crlf(text))?;
            }
            Some(html) => {
                let boundary = format!("----=_Part_{}", now.timestamp_millis());
                write!(
                    message,
                    "Content-Type: multipart/alternative; boundary=\"{boundary}\"\r\n\r\n"
                )?;
                write!(message, "--{boundary}\r\n")?;
                write!(message, "Content-Type: text/plain; charset=utf-8\r\n\r\n")?;
                write!(message, "{}\r\n", crlf(text))?;
                write!(message, "--{boundary}\r\n")?;
                write!(message, "Content-Type: text/html; charset=utf-8\r\n\r\n")?;
                write!(message, "{}\r\n", crlf(html))?;
                write!(message, "--{boundary}--\r\n")?;
            }
        }

        Ok(message)
    }
}

/// A token unique enough to find one message among many in a mailbox.
///
/// The UTC time with separators replaced by `-`, then a random lowercase
/// alphanumeric suffix, e.g. `2025-01-31T10-22-03-512Z-k3f9a0`.
#[must_use]
pub fn verification_token() -> String {
    let timestamp = Utc::now()
        .to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace([':', '.'], "-");

    let suffix: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_SUFFIX_LEN)
        .map(|byte| char::from(byte).to_ascii_lowercase())
        .collect();

    format!("{timestamp}-{suffix}")
}

fn domain_of(address: &str) -> &str {
    address
        .rsplit_once('@')
        .map_or("localhost", |(_, domain)| domain.trim_end_matches('>'))
}

fn crlf(text: &str) -> String {
    text.lines().collect::<Vec<_>>().join("\r\n")
}
