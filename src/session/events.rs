use std::time::Duration;

use crate::{
    dialect::{
        Dialect,
        status_code::{Reply, encode_payload},
        terminator::{Progress, Response, ResponseBuffer},
    },
    error::{SessionError, UsageError},
    incoming, internal, outgoing,
    plan::{Command, Expect},
    tracing, verify,
};

use super::{
    Action, Verdict, VerificationWarning,
    state::{InFlight, SessionState},
};

/// Number of retrieved lines echoed to the log.
const PREVIEW_LINES: usize = 20;

/// Longest command text echoed to the log before it is shortened.
const PREVIEW_WIDTH: usize = 60;

impl SessionState {
    /// Frames `chunk` and classifies every completed line.
    ///
    /// Lines after the one that settled the session are dropped.
    pub(super) fn on_data(&mut self, chunk: &[u8]) {
        for line in self.framer.feed(chunk) {
            if self.is_settled() {
                break;
            }

            if line.is_empty() && matches!(self.dialect, Dialect::StatusCode(_)) {
                continue;
            }

            self.received += 1;
            incoming!("<-- {line}");

            let reply = match &self.dialect {
                Dialect::StatusCode(dialect) => Some(dialect.classify(&line)),
                Dialect::Terminator => None,
            };

            match reply {
                Some(reply) => self.on_reply(reply, &line),
                None => {
                    let progress = self.response.push(&line);
                    self.on_progress(progress);
                }
            }
        }
    }

    fn on_reply(&mut self, reply: Reply, line: &str) {
        match reply {
            Reply::Data => tracing::trace!("Continuation line"),
            Reply::Informational(code) => tracing::debug!(code, "Ignoring informational reply"),
            Reply::Error(line) => self.fail(SessionError::Protocol(line)),
            Reply::Intermediate(code) => self.send_payload(code, line),
            Reply::Success(_) => self.advance(self.next_delay()),
            Reply::Closing(_) => self.terminate(line),
        }
    }

    fn on_progress(&mut self, progress: Progress) {
        match progress {
            Progress::Pending => {}
            Progress::Unexpected => tracing::warn!("Line without a status marker"),
            Progress::Error(line) => {
                tracing::error!("Server responded with error: {line}");
                self.fail(SessionError::Protocol(line));
            }
            Progress::Complete(response) => {
                self.record(&response);
                self.advance(self.next_delay());
            }
        }
    }

    /// Pulls facts out of a completed terminator-dialect response.
    fn record(&mut self, response: &Response) {
        match response.expect {
            Expect::Line | Expect::Block => {}
            Expect::Count => {
                if let Some(count) = response.count() {
                    self.facts.message_count = Some(count);
                    internal!(level = INFO, "Messages on server: {count}");
                }
            }
            Expect::Listing => {
                self.facts.indices.extend(response.indices());
                if let Some(&latest) = self.facts.indices.iter().max() {
                    self.facts.latest = Some(latest);
                    internal!(level = INFO, "Latest message index: {latest}");
                }
            }
            Expect::Retrieval => self.check_content(response),
        }
    }

    fn check_content(&mut self, response: &Response) {
        internal!(level = INFO, "--- Message Preview ---");
        for line in response.lines.iter().take(PREVIEW_LINES) {
            internal!(level = INFO, "{line}");
        }
        if response.lines.len() > PREVIEW_LINES {
            internal!(level = INFO, "(truncated)");
        }
        internal!(level = INFO, "--- End Preview ---");

        let Some(expected) = self.expected.clone() else {
            return;
        };

        let found = verify::contains_token(&response.content(), &expected);
        self.facts.content_found = Some(found);

        if found {
            internal!(level = INFO, "Expected content found: {expected:?}");
        } else {
            internal!(level = WARN, "Expected content not found: {expected:?}");
            self.warnings.push(VerificationWarning {
                expected,
                index: self.facts.retrieval_target(),
            });
        }
    }

    /// The greeting and later replies are paced separately.
    const fn next_delay(&self) -> Duration {
        if self.in_flight.is_some() {
            self.pacing.command
        } else {
            self.pacing.greeting
        }
    }

    /// Completes the in-flight command and sends the next one, or ends the
    /// session if the plan is drained.
    fn advance(&mut self, delay: Duration) {
        self.in_flight = None;
        self.queue_retrieval();

        if self.is_settled() {
            return;
        }

        match self.plan.dequeue() {
            Some(command) => self.send(command, delay),
            None => {
                internal!(level = INFO, "All commands executed successfully");
                self.settle(Verdict::Success, self.pacing.settle);
            }
        }
    }

    /// Adds a retrieval of the newest item ahead of the terminal command,
    /// at most once per session.
    fn queue_retrieval(&mut self) {
        if !matches!(self.dialect, Dialect::Terminator)
            || self.facts.retrieval_queued
            || !self.facts.has_items()
            || !self.plan.only_terminal_left()
        {
            return;
        }

        let target = self.facts.retrieval_target();
        match self.plan.prepend(Command::retrieval(target)) {
            Ok(()) => {
                self.facts.retrieval_queued = true;
                internal!(level = INFO, "Enqueue RETR {target} for verification");
            }
            Err(err) => self.fail(err.into()),
        }
    }

    fn send(&mut self, command: Command, delay: Duration) {
        let shown = preview(&command.redacted());
        outgoing!("--> {shown}");
        self.sent.push(shown);

        self.response = ResponseBuffer::new(command.expect());
        self.outbox.push(Action::Send {
            bytes: format!("{}\r\n", command.text()).into_bytes(),
            delay,
        });
        self.in_flight = Some(InFlight {
            command,
            payload_sent: false,
        });
    }

    fn send_payload(&mut self, code: u16, line: &str) {
        let Some(in_flight) = self.in_flight.as_mut() else {
            self.fail(SessionError::Protocol(line.to_string()));
            return;
        };

        let payload = in_flight
            .command
            .payload()
            .filter(|_| !in_flight.payload_sent)
            .map(str::to_string);
        let Some(payload) = payload else {
            let verb = in_flight.command.verb();
            self.fail(UsageError::MissingPayload(verb).into());
            return;
        };
        in_flight.payload_sent = true;

        tracing::debug!(code, bytes = payload.len(), "Sending payload");
        let shown = preview(payload.lines().next().unwrap_or_default());
        outgoing!("--> {shown}");
        self.sent.push(shown);

        self.outbox.push(Action::Send {
            bytes: encode_payload(&payload).into_bytes(),
            delay: self.pacing.continuation,
        });
    }

    /// Handles the closing acknowledgement.
    fn terminate(&mut self, line: &str) {
        let terminal = self
            .in_flight
            .take()
            .is_some_and(|in_flight| in_flight.command.is_terminal());

        if terminal {
            self.settle(Verdict::Success, self.pacing.settle);
        } else {
            self.fail(SessionError::Protocol(line.to_string()));
        }
    }

    pub(super) fn fail(&mut self, err: SessionError) {
        self.fail_with(err.to_string());
    }

    pub(super) fn fail_with(&mut self, reason: String) {
        if self.is_settled() {
            return;
        }
        internal!(level = ERROR, "Session failed: {reason}");
        self.settle(Verdict::Failure(reason), Duration::ZERO);
    }

    fn settle(&mut self, verdict: Verdict, close_after: Duration) {
        if self.is_settled() {
            return;
        }
        self.in_flight = None;
        self.verdict = Some(verdict.clone());
        self.outbox.push(Action::Close { delay: close_after });
        self.outbox.push(Action::Settle(verdict));
    }
}

fn preview(text: &str) -> String {
    if text.chars().count() > PREVIEW_WIDTH {
        let head: String = text.chars().take(PREVIEW_WIDTH).collect();
        format!("{head}...")
    } else {
        text.to_string()
    }
}
