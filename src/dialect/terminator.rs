//! Replies led by a `+OK`/`-ERR` marker, optionally followed by a block of
//! lines closed by a lone `.` (POP3).

use crate::plan::Expect;

pub const OK: &str = "+OK";
pub const ERR: &str = "-ERR";
pub const TERMINATOR: &str = ".";

/// The marker leading a status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    Ok,
    Err,
}

impl Marker {
    #[must_use]
    pub fn parse(line: &str) -> Option<Self> {
        if line.starts_with(OK) {
            Some(Self::Ok)
        } else if line.starts_with(ERR) {
            Some(Self::Err)
        } else {
            None
        }
    }
}

/// Item count from a `+OK <count> <octets>` reply.
#[must_use]
pub fn parse_count(status: &str) -> Option<u32> {
    status
        .strip_prefix(OK)?
        .split_whitespace()
        .next()?
        .parse()
        .ok()
}

/// Item index leading a listing line (`3 1024`).
#[must_use]
pub fn parse_index(line: &str) -> Option<u32> {
    let (index, _) = line.split_once(char::is_whitespace)?;
    index.parse().ok()
}

/// A complete response to one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub expect: Expect,
    pub status: String,
    /// Block lines with dot-stuffing removed, excluding the terminator.
    pub lines: Vec<String>,
}

impl Response {
    /// Item count carried by the status line.
    #[must_use]
    pub fn count(&self) -> Option<u32> {
        parse_count(&self.status)
    }

    /// Every item index found in the block, in order.
    #[must_use]
    pub fn indices(&self) -> Vec<u32> {
        self.lines.iter().filter_map(|line| parse_index(line)).collect()
    }

    /// The block rejoined as message text.
    #[must_use]
    pub fn content(&self) -> String {
        self.lines.join("\n")
    }
}

/// Where a response stands after another line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Progress {
    /// More lines are needed.
    Pending,
    /// The line was neither a marker nor part of a block.
    Unexpected,
    /// The server reported an error; the session fails with this line.
    Error(String),
    Complete(Response),
}

/// Collects the lines answering the in-flight command.
///
/// A fresh buffer is created for every command. The greeting is collected
/// with [`Expect::Line`].
#[derive(Debug, Clone, Default)]
pub struct ResponseBuffer {
    expect: Expect,
    status: Option<String>,
    lines: Vec<String>,
}

impl ResponseBuffer {
    #[must_use]
    pub fn new(expect: Expect) -> Self {
        Self {
            expect,
            status: None,
            lines: Vec::new(),
        }
    }

    /// Number of block lines buffered so far.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.lines.len()
    }

    pub fn push(&mut self, line: &str) -> Progress {
        if self.status.is_none() {
            if line.is_empty() {
                return Progress::Pending;
            }

            return match Marker::parse(line) {
                Some(Marker::Err) => Progress::Error(line.to_string()),
                Some(Marker::Ok) if self.expect.is_multiline() => {
                    self.status = Some(line.to_string());
                    Progress::Pending
                }
                Some(Marker::Ok) => Progress::Complete(Response {
                    expect: self.expect,
                    status: line.to_string(),
                    lines: Vec::new(),
                }),
                None => Progress::Unexpected,
            };
        }

        if line == TERMINATOR {
            return Progress::Complete(Response {
                expect: self.expect,
                status: self.status.take().unwrap_or_default(),
                lines: std::mem::take(&mut self.lines),
            });
        }

        let line = line.strip_prefix('.').filter(|rest| rest.starts_with('.')).unwrap_or(line);
        self.lines.push(line.to_string());
        Progress::Pending
    }
}
