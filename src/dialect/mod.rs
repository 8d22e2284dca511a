//! Response classification for the two supported framing conventions.

pub mod status_code;
pub mod terminator;

use core::fmt::{self, Display, Formatter};

pub use status_code::StatusCodeDialect;

/// The framing convention a session speaks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dialect {
    /// Every reply is a line led by a three digit code (SMTP).
    StatusCode(StatusCodeDialect),
    /// Replies are led by `+OK`/`-ERR`, blocks end at a lone `.` (POP3).
    Terminator,
}

impl Dialect {
    #[must_use]
    pub fn smtp() -> Self {
        Self::StatusCode(StatusCodeDialect::default())
    }

    #[must_use]
    pub const fn pop3() -> Self {
        Self::Terminator
    }
}

impl Display for Dialect {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        fmt.write_str(match self {
            Self::StatusCode(_) => "SMTP",
            Self::Terminator => "POP3",
        })
    }
}
