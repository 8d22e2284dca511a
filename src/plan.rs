//! Commands and the ordered queue a session drains.

use std::{collections::VecDeque, fmt};

use crate::error::UsageError;

/// The shape of the response a command is answered with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Expect {
    /// A single status line.
    #[default]
    Line,
    /// A single status line carrying the item count (`+OK 3 1024`).
    Count,
    /// A status line followed by lines up to a terminator, kept only for the
    /// transcript (`UIDL`).
    Block,
    /// A terminated block whose lines start with item indices (`LIST`).
    Listing,
    /// A terminated block holding a message body (`RETR n`).
    Retrieval,
}

impl Expect {
    /// Returns `true` if the response is only complete at a terminator line.
    #[must_use]
    pub const fn is_multiline(self) -> bool {
        matches!(self, Self::Block | Self::Listing | Self::Retrieval)
    }
}

/// A single line to transmit, with what the driver needs to know about it.
#[derive(Clone, PartialEq, Eq)]
pub struct Command {
    text: String,
    payload: Option<String>,
    expect: Expect,
    terminal: bool,
    secret: Option<usize>,
}

impl Command {
    /// A command answered by a single status line.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            payload: None,
            expect: Expect::Line,
            terminal: false,
            secret: None,
        }
    }

    /// The session-closing command.
    #[must_use]
    pub fn quit() -> Self {
        Self {
            terminal: true,
            ..Self::new("QUIT")
        }
    }

    /// `RETR n`, the command inserted once the latest item is known.
    #[must_use]
    pub fn retrieval(index: u32) -> Self {
        Self::new(format!("RETR {index}")).expecting(Expect::Retrieval)
    }

    /// `verb secret`, shown in the transcript with the secret masked.
    #[must_use]
    pub fn with_secret(verb: &str, secret: &str) -> Self {
        Self {
            secret: Some(secret.chars().count()),
            ..Self::new(format!("{verb} {secret}"))
        }
    }

    #[must_use]
    pub const fn expecting(mut self, expect: Expect) -> Self {
        self.expect = expect;
        self
    }

    /// Attaches the body sent once the server acknowledges this command with
    /// an intermediate status.
    #[must_use]
    pub fn with_payload(mut self, payload: impl Into<String>) -> Self {
        self.payload = Some(payload.into());
        self
    }

    #[must_use]
    pub const fn terminal(mut self) -> Self {
        self.terminal = true;
        self
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn payload(&self) -> Option<&str> {
        self.payload.as_deref()
    }

    #[must_use]
    pub const fn expect(&self) -> Expect {
        self.expect
    }

    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.terminal
    }

    /// The first word of the command, upper-cased.
    #[must_use]
    pub fn verb(&self) -> String {
        self.text
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_ascii_uppercase()
    }

    /// The form written to logs and transcripts.
    #[must_use]
    pub fn redacted(&self) -> String {
        self.secret.map_or_else(
            || self.text.clone(),
            |len| format!("{} {}", self.verb(), "*".repeat(len)),
        )
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.redacted())
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("text", &self.redacted())
            .field("payload", &self.payload.as_ref().map(String::len))
            .field("expect", &self.expect)
            .field("terminal", &self.terminal)
            .finish()
    }
}

/// FIFO of commands still to be sent.
///
/// A plan always ends with a terminal command, so draining it always ends the
/// session.
#[derive(Debug, Clone)]
pub struct CommandPlan {
    commands: VecDeque<Command>,
}

impl CommandPlan {
    /// Creates a plan from `commands`.
    ///
    /// # Errors
    ///
    /// Returns a [`UsageError`] if `commands` is empty or its last entry is not
    /// terminal.
    pub fn new(commands: impl IntoIterator<Item = Command>) -> Result<Self, UsageError> {
        let commands: VecDeque<Command> = commands.into_iter().collect();

        match commands.back() {
            None => Err(UsageError::EmptyPlan),
            Some(last) if !last.is_terminal() => {
                Err(UsageError::MissingTerminal(last.redacted()))
            }
            Some(_) => Ok(Self { commands }),
        }
    }

    /// The command that will be sent last.
    #[must_use]
    pub fn peek_final(&self) -> Option<&Command> {
        self.commands.back()
    }

    pub fn dequeue(&mut self) -> Option<Command> {
        self.commands.pop_front()
    }

    /// Puts `command` at the front of the plan.
    ///
    /// # Errors
    ///
    /// Returns [`UsageError::PrependToEmpty`] once the terminal command has
    /// been dequeued.
    pub fn prepend(&mut self, command: Command) -> Result<(), UsageError> {
        if self.commands.is_empty() {
            return Err(UsageError::PrependToEmpty(command.redacted()));
        }

        self.commands.push_front(command);
        Ok(())
    }

    /// Returns `true` if only the terminal command is left.
    #[must_use]
    pub fn only_terminal_left(&self) -> bool {
        self.commands.len() == 1 && self.peek_final().is_some_and(Command::is_terminal)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Submission of one message over the status-code dialect.
    #[must_use]
    pub fn submission(helo: &str, from: &str, to: &str, body: impl Into<String>) -> Self {
        Self {
            commands: VecDeque::from([
                Command::new(format!("HELO {helo}")),
                Command::new(format!("MAIL FROM:<{from}>")),
                Command::new(format!("RCPT TO:<{to}>")),
                Command::new("DATA").with_payload(body),
                Command::quit(),
            ]),
        }
    }

    /// Login and mailbox inspection over the terminator dialect.
    ///
    /// A `RETR` for the newest message is added by the session once `LIST`
    /// has been answered.
    #[must_use]
    pub fn mailbox_check(username: &str, password: &str) -> Self {
        Self {
            commands: VecDeque::from([
                Command::new(format!("USER {username}")),
                Command::with_secret("PASS", password),
                Command::new("STAT").expecting(Expect::Count),
                Command::new("LIST").expecting(Expect::Listing),
                Command::new("UIDL").expecting(Expect::Block),
                Command::quit(),
            ]),
        }
    }
}
