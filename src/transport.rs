//! Runs a [`Session`] over a byte stream.
//!
//! A reader task forwards every read as an [`Event`] through a channel. The
//! driving loop waits on that channel under the response timeout, feeds the
//! session and carries out the returned actions. The stream is shut down
//! and the reader aborted on every exit path.

use core::fmt::{self, Display, Formatter};
use std::{collections::VecDeque, time::Duration};

use serde::{Deserialize, Serialize};
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, WriteHalf},
    net::TcpStream,
    sync::mpsc,
};

use crate::{
    config::Timeouts,
    error::SessionError,
    internal,
    session::{Action, Event, Report, Session},
    tracing,
};

/// Size of a single read.
const BUFFER_SIZE: usize = 8192;

/// A host and port to dial.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl Display for Endpoint {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        write!(fmt, "{}:{}", self.host, self.port)
    }
}

/// Connects to `endpoint` and drives `session` to a verdict.
///
/// Connection failures become a failed [`Report`]; this never returns an
/// error.
pub async fn probe(endpoint: &Endpoint, mut session: Session, timeouts: &Timeouts) -> Report {
    session.handle(Event::Connecting);
    internal!(level = INFO, "Connecting to {endpoint}");

    let connect = TcpStream::connect((endpoint.host.as_str(), endpoint.port));
    let failure = match tokio::time::timeout(timeouts.connect(), connect).await {
        Ok(Ok(stream)) => {
            if let Err(err) = stream.set_nodelay(true) {
                tracing::debug!("Unable to set TCP_NODELAY: {err}");
            }
            return drive(stream, session, timeouts.response()).await;
        }
        Ok(Err(source)) => SessionError::Connect {
            endpoint: endpoint.to_string(),
            source,
        },
        Err(_) => SessionError::ConnectTimeout {
            endpoint: endpoint.to_string(),
            secs: timeouts.connect_secs,
        },
    };

    session.handle(Event::Error(failure.to_string()));
    session.into_report()
}

/// Drives `session` over an already connected `stream`.
///
/// `response_timeout` bounds every wait for the peer; `None` waits forever.
pub async fn drive<S>(stream: S, mut session: Session, response_timeout: Option<Duration>) -> Report
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let (mut reader, mut writer) = tokio::io::split(stream);
    let (tx, mut rx) = mpsc::unbounded_channel();

    let reader_task = tokio::spawn(async move {
        let mut buffer = vec![0u8; BUFFER_SIZE];
        loop {
            let event = match reader.read(&mut buffer).await {
                Ok(0) => Event::Closed,
                Ok(n) => Event::Data(buffer[..n].to_vec()),
                Err(err) => Event::Error(SessionError::Io(err).to_string()),
            };

            let finished = !matches!(event, Event::Data(_));
            if tx.send(event).is_err() || finished {
                break;
            }
        }
    });

    let mut actions: VecDeque<Action> = session.handle(Event::Connected).into();
    let mut closed = false;

    loop {
        while let Some(action) = actions.pop_front() {
            match action {
                Action::Send { bytes, delay } => {
                    pause(delay).await;
                    if let Err(err) = write(&mut writer, &bytes).await {
                        // Nothing more goes to a broken writer.
                        actions.retain(|action| !matches!(action, Action::Send { .. }));
                        let event = Event::Error(SessionError::Io(err).to_string());
                        actions.extend(session.handle(event));
                    }
                }
                Action::Close { delay } => {
                    pause(delay).await;
                    close(&mut writer, &mut closed).await;
                }
                Action::Settle(verdict) => internal!(level = INFO, "Session settled: {verdict}"),
            }
        }

        if session.is_settled() {
            break;
        }

        let event = match response_timeout {
            Some(limit) => tokio::time::timeout(limit, rx.recv())
                .await
                .unwrap_or(Some(Event::TimedOut(limit))),
            None => rx.recv().await,
        };

        // A dropped sender means the reader task is gone.
        actions.extend(session.handle(event.unwrap_or(Event::Closed)));
    }

    reader_task.abort();
    close(&mut writer, &mut closed).await;

    session.into_report()
}

async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

async fn write<S: AsyncWrite>(writer: &mut WriteHalf<S>, bytes: &[u8]) -> std::io::Result<()> {
    writer.write_all(bytes).await?;
    writer.flush().await
}

async fn close<S: AsyncWrite>(writer: &mut WriteHalf<S>, closed: &mut bool) {
    if *closed {
        return;
    }
    *closed = true;

    if let Err(err) = writer.shutdown().await {
        tracing::debug!("Error shutting down connection: {err}");
    }
}
