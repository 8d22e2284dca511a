//! Probes assembled from configuration.
//!
//! [`submit`] and [`check_mailbox`] run a single session each. [`round_trip`]
//! submits a message carrying a fresh verification token, waits for local
//! delivery and then retrieves the newest message expecting that token.
//! [`run_config`] runs everything a [`Config`] names.

use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use futures_util::future::{FutureExt, LocalBoxFuture, join_all};

use crate::{
    config::{Config, FlowConfig, Pacing, Pop3Account, SmtpTarget},
    dialect::Dialect,
    internal,
    message::{MessageBuilder, verification_token},
    plan::CommandPlan,
    session::{Report, Session, VerificationWarning},
    transport,
};

/// Submits a test message to `target`.
///
/// # Errors
///
/// Returns an error if the message cannot be composed. Session failures are
/// carried in the [`Report`].
pub async fn submit(target: &SmtpTarget, config: &Config) -> anyhow::Result<Report> {
    let message = MessageBuilder::new()
        .from(&target.from)
        .to(&target.to)
        .subject(&target.subject)
        .text(&target.body)
        .build()
        .context("Unable to compose test message")?;

    Ok(send_message(target, &message, config).await)
}

async fn send_message(target: &SmtpTarget, message: &str, config: &Config) -> Report {
    let plan = CommandPlan::submission(&target.helo, &target.from, &target.to, message);
    let session = Session::new(
        Dialect::StatusCode(config.status_codes.clone()),
        plan,
        Pacing::from(&config.pacing.smtp),
    );

    transport::probe(&target.endpoint(), session, &config.timeouts).await
}

/// Logs in to `account` and inspects its mailbox, retrieving the newest
/// message if there is one.
pub async fn check_mailbox(account: &Pop3Account, config: &Config) -> Report {
    let plan = CommandPlan::mailbox_check(&account.username, &account.password);
    let mut session = Session::new(Dialect::pop3(), plan, Pacing::from(&config.pacing.pop3));
    if let Some(expected) = &account.expected_content {
        session = session.expecting(expected);
    }

    transport::probe(&account.endpoint(), session, &config.timeouts).await
}

/// Result of a submit-then-retrieve run.
#[derive(Debug)]
pub struct FlowReport {
    pub token: String,
    pub submission: Report,
    /// `None` when submission failed and retrieval was skipped.
    pub retrieval: Option<Report>,
}

impl FlowReport {
    /// Both sessions succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.submission.is_success() && self.retrieval.as_ref().is_some_and(Report::is_success)
    }

    /// Whether the retrieved message carried the token.
    #[must_use]
    pub fn delivered(&self) -> bool {
        self.retrieval
            .as_ref()
            .is_some_and(|report| report.facts.content_found == Some(true))
    }
}

/// Runs the round trip described by `flow`.
///
/// # Errors
///
/// Returns an error if the message cannot be composed.
pub async fn round_trip(flow: &FlowConfig, config: &Config) -> anyhow::Result<FlowReport> {
    let token = verification_token();
    let timestamp = Utc::now().to_rfc3339();
    internal!(level = INFO, "Round trip token: {token}");

    let target = flow.smtp_target(format!("E2E Flow Test {token}"));

    let message = MessageBuilder::new()
        .from(&target.from)
        .to(&target.to)
        .subject(&target.subject)
        .text(format!(
            "This is an automated flow test email.\nToken: {token}\nTimestamp: {timestamp}"
        ))
        .html(format!(
            "<p>This is an automated flow test email.</p>\n\
             <p><strong>Token:</strong> {token}</p>\n\
             <p><strong>Timestamp:</strong> {timestamp}</p>"
        ))
        .build()
        .context("Unable to compose flow message")?;

    let submission = send_message(&target, &message, config).await;
    if !submission.is_success() {
        internal!(level = ERROR, "Submission failed, skipping retrieval");
        return Ok(FlowReport {
            token,
            submission,
            retrieval: None,
        });
    }

    internal!(
        level = INFO,
        "Waiting {}ms for local delivery",
        flow.delivery_wait_ms
    );
    tokio::time::sleep(Duration::from_millis(flow.delivery_wait_ms)).await;

    let retrieval = check_mailbox(&flow.pop3_account(&token), config).await;

    Ok(FlowReport {
        token,
        submission,
        retrieval: Some(retrieval),
    })
}

/// The result of one configured probe.
#[derive(Debug)]
pub struct Outcome {
    pub label: String,
    /// Session reports in the order they ran.
    pub reports: Vec<Report>,
    /// Set when the probe could not run to a verdict.
    pub error: Option<anyhow::Error>,
}

impl Outcome {
    fn from_result(label: String, result: anyhow::Result<Vec<Report>>) -> Self {
        match result {
            Ok(reports) => Self {
                label,
                reports,
                error: None,
            },
            Err(error) => Self {
                label,
                reports: Vec::new(),
                error: Some(error),
            },
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.error.is_none()
            && !self.reports.is_empty()
            && self.reports.iter().all(Report::is_success)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &VerificationWarning> {
        self.reports.iter().flat_map(|report| report.warnings.iter())
    }
}

impl From<FlowReport> for Outcome {
    fn from(flow: FlowReport) -> Self {
        let mut reports = vec![flow.submission];
        let skipped = flow.retrieval.is_none();
        reports.extend(flow.retrieval);

        Self {
            label: format!("Flow {}", flow.token),
            reports,
            error: skipped.then(|| anyhow::anyhow!("retrieval skipped after failed submission")),
        }
    }
}

/// Runs every probe named by `config`: SMTP targets, then POP3 accounts,
/// then the round trip.
///
/// Probes run one after another unless `config.parallel` is set.
pub async fn run_config(config: &Config) -> Vec<Outcome> {
    let mut probes: Vec<LocalBoxFuture<'_, Outcome>> = Vec::new();

    for target in &config.smtp {
        probes.push(
            async move {
                let label = format!("SMTP {}", target.label());
                Outcome::from_result(label, submit(target, config).await.map(|r| vec![r]))
            }
            .boxed_local(),
        );
    }

    for account in &config.pop3 {
        probes.push(
            async move {
                let label = format!("POP3 {}@{}", account.username, account.endpoint());
                Outcome::from_result(label, Ok(vec![check_mailbox(account, config).await]))
            }
            .boxed_local(),
        );
    }

    if let Some(flow) = &config.flow {
        probes.push(
            async move {
                match round_trip(flow, config).await {
                    Ok(report) => Outcome::from(report),
                    Err(error) => Outcome::from_result("Flow".to_string(), Err(error)),
                }
            }
            .boxed_local(),
        );
    }

    if config.parallel {
        return join_all(probes).await;
    }

    let mut outcomes = Vec::with_capacity(probes.len());
    for probe in probes {
        outcomes.push(probe.await);
    }
    outcomes
}
