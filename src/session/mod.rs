//! The protocol session driver.
//!
//! A [`Session`] is a state machine over transport events. It never touches a
//! socket: [`Session::handle`] consumes one [`Event`] and returns the
//! [`Action`]s the transport must carry out, in order. Feeding synthetic
//! events is therefore enough to exercise a whole exchange.
//!
//! ```
//! use mailprobe::{
//!     config::Pacing,
//!     dialect::Dialect,
//!     plan::{Command, CommandPlan},
//!     session::{Action, Event, Session, Verdict},
//! };
//!
//! let plan = CommandPlan::new([Command::quit()]).unwrap();
//! let mut session = Session::new(Dialect::pop3(), plan, Pacing::none());
//!
//! session.handle(Event::Connected);
//! let actions = session.handle(Event::Data(b"+OK ready\r\n".to_vec()));
//! assert!(matches!(actions[0], Action::Send { .. }));
//!
//! let actions = session.handle(Event::Data(b"+OK bye\r\n".to_vec()));
//! assert!(actions.contains(&Action::Settle(Verdict::Success)));
//! ```

mod events;
mod state;

use core::fmt::{self, Display, Formatter};
use std::time::Duration;

pub use state::{Facts, Phase, SessionState};

use crate::{
    config::Pacing,
    dialect::Dialect,
    fsm::FiniteStateMachine,
    plan::{Command, CommandPlan},
};

/// Something the transport observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A connection attempt started.
    Connecting,
    Connected,
    /// Bytes read from the connection, split wherever the read happened to end.
    Data(Vec<u8>),
    Error(String),
    /// The peer closed the connection.
    Closed,
    /// Nothing arrived within the response timeout.
    TimedOut(Duration),
}

/// Something the transport must do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Write `bytes` once `delay` has passed.
    Send { bytes: Vec<u8>, delay: Duration },
    /// Shut the connection down once `delay` has passed.
    Close { delay: Duration },
    /// The session's verdict. Emitted exactly once.
    Settle(Verdict),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Success,
    Failure(String),
}

impl Verdict {
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

impl Display for Verdict {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            Self::Success => fmt.write_str("Success"),
            Self::Failure(reason) => write!(fmt, "Failure: {reason}"),
        }
    }
}

/// Retrieved content did not contain the expected token.
///
/// Recorded for the caller; never changes the verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationWarning {
    pub expected: String,
    /// Index of the item that was retrieved.
    pub index: u32,
}

impl Display for VerificationWarning {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        write!(
            fmt,
            "expected content {:?} not found in message {}",
            self.expected, self.index
        )
    }
}

/// Summary of a finished session.
#[derive(Debug, Clone)]
pub struct Report {
    pub verdict: Verdict,
    /// Every line written, secrets masked and long lines shortened.
    pub sent: Vec<String>,
    /// Number of lines received. Blank status-code lines are not counted.
    pub received: usize,
    pub warnings: Vec<VerificationWarning>,
    pub facts: Facts,
}

impl Report {
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.verdict.is_success()
    }
}

#[derive(Debug)]
pub struct Session {
    phase: Phase,
    state: SessionState,
}

impl Session {
    #[must_use]
    pub fn new(dialect: Dialect, plan: CommandPlan, pacing: Pacing) -> Self {
        Self {
            phase: Phase::default(),
            state: SessionState::new(dialect, plan, pacing),
        }
    }

    /// Sets the token a retrieved message is checked for.
    #[must_use]
    pub fn expecting(mut self, token: impl Into<String>) -> Self {
        self.state.expected = Some(token.into());
        self
    }

    /// Advances the session by one event.
    pub fn handle(&mut self, event: Event) -> Vec<Action> {
        self.phase = self.phase.transition(event, &mut self.state);
        std::mem::take(&mut self.state.outbox)
    }

    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub fn in_flight(&self) -> Option<&Command> {
        self.state.in_flight.as_ref().map(|in_flight| &in_flight.command)
    }

    #[must_use]
    pub const fn is_settled(&self) -> bool {
        self.state.is_settled()
    }

    #[must_use]
    pub const fn verdict(&self) -> Option<&Verdict> {
        self.state.verdict.as_ref()
    }

    #[must_use]
    pub const fn facts(&self) -> &Facts {
        &self.state.facts
    }

    /// Commands still waiting to be sent.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.state.plan.len()
    }

    #[must_use]
    pub fn into_report(self) -> Report {
        let SessionState {
            verdict,
            sent,
            received,
            warnings,
            facts,
            ..
        } = self.state;

        Report {
            verdict: verdict.unwrap_or_else(|| {
                Verdict::Failure("session ended without a verdict".to_string())
            }),
            sent,
            received,
            warnings,
            facts,
        }
    }
}
