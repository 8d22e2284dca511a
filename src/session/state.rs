use core::fmt::{self, Display, Formatter};

use crate::{
    config::Pacing,
    dialect::{Dialect, terminator::ResponseBuffer},
    error::SessionError,
    framer::LineFramer,
    fsm::FiniteStateMachine,
    internal,
    plan::{Command, CommandPlan, Expect},
    tracing,
};

use super::{Action, Event, Verdict, VerificationWarning};

/// Where a session is in its exchange.
#[derive(PartialEq, Eq, Debug, Clone, Copy, Default)]
pub enum Phase {
    #[default]
    Idle,
    Connecting,
    /// Connected; the server's greeting has not completed yet.
    AwaitingGreeting,
    /// A command is in flight.
    CommandSent,
    /// A verdict exists. Every later event is ignored.
    Settled,
}

impl Display for Phase {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        fmt.write_str(match self {
            Self::Idle => "Idle",
            Self::Connecting => "Connecting",
            Self::AwaitingGreeting => "AwaitingGreeting",
            Self::CommandSent => "CommandSent",
            Self::Settled => "Settled",
        })
    }
}

/// What the exchange revealed about the mailbox.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Facts {
    /// Item count reported by `STAT`.
    pub message_count: Option<u32>,
    /// Item indices reported by `LIST`.
    pub indices: Vec<u32>,
    /// Highest listed index.
    pub latest: Option<u32>,
    /// Whether the retrieval command has been added to the plan.
    pub retrieval_queued: bool,
    /// Outcome of the content check, if one ran.
    pub content_found: Option<bool>,
}

impl Facts {
    /// Returns `true` once either the listing or the count confirmed that the
    /// mailbox holds something.
    #[must_use]
    pub fn has_items(&self) -> bool {
        self.latest.is_some() || self.message_count.is_some_and(|count| count > 0)
    }

    /// The index a retrieval should target.
    #[must_use]
    pub fn retrieval_target(&self) -> u32 {
        self.latest.unwrap_or(1)
    }
}

#[derive(Debug, Clone)]
pub(super) struct InFlight {
    pub command: Command,
    pub payload_sent: bool,
}

/// Everything a session owns besides its [`Phase`].
#[derive(Debug)]
pub struct SessionState {
    pub(super) dialect: Dialect,
    pub(super) plan: CommandPlan,
    pub(super) pacing: Pacing,
    pub(super) expected: Option<String>,
    pub(super) framer: LineFramer,
    pub(super) in_flight: Option<InFlight>,
    pub(super) response: ResponseBuffer,
    pub(super) facts: Facts,
    pub(super) verdict: Option<Verdict>,
    pub(super) sent: Vec<String>,
    pub(super) received: usize,
    pub(super) warnings: Vec<VerificationWarning>,
    pub(super) outbox: Vec<Action>,
}

impl SessionState {
    pub(super) fn new(dialect: Dialect, plan: CommandPlan, pacing: Pacing) -> Self {
        Self {
            dialect,
            plan,
            pacing,
            expected: None,
            framer: LineFramer::new(),
            in_flight: None,
            response: ResponseBuffer::new(Expect::Line),
            facts: Facts::default(),
            verdict: None,
            sent: Vec::new(),
            received: 0,
            warnings: Vec::new(),
            outbox: Vec::new(),
        }
    }

    pub(super) const fn is_settled(&self) -> bool {
        self.verdict.is_some()
    }

    /// The phase implied by the state after a batch of lines.
    const fn resting_phase(&self) -> Phase {
        if self.is_settled() {
            Phase::Settled
        } else if self.in_flight.is_some() {
            Phase::CommandSent
        } else {
            Phase::AwaitingGreeting
        }
    }
}

impl FiniteStateMachine for Phase {
    type Input = Event;
    type Context = SessionState;

    fn transition(self, input: Self::Input, state: &mut Self::Context) -> Self {
        match (self, input) {
            (Self::Settled, event) => {
                tracing::trace!(?event, "Ignoring event after settle");
                Self::Settled
            }
            (Self::Idle, Event::Connecting) => Self::Connecting,
            (Self::Idle | Self::Connecting, Event::Connected) => {
                internal!(level = INFO, "Connected, awaiting {} greeting", state.dialect);
                Self::AwaitingGreeting
            }
            (Self::AwaitingGreeting | Self::CommandSent, Event::Data(chunk)) => {
                state.on_data(&chunk);
                state.resting_phase()
            }
            (_, Event::Error(reason)) => {
                state.fail_with(reason);
                Self::Settled
            }
            (_, Event::Closed) => {
                internal!(level = INFO, "Connection closed");
                state.fail(SessionError::ConnectionClosed);
                Self::Settled
            }
            (_, Event::TimedOut(after)) => {
                state.fail(SessionError::Timeout(after));
                Self::Settled
            }
            (phase, event) => {
                tracing::warn!(%phase, ?event, "Unexpected event");
                phase
            }
        }
    }
}
