//! Mock mail servers for integration tests
//!
//! A configurable line-oriented server that speaks enough SMTP or POP3 to
//! drive a probe. It can:
#![allow(dead_code)] // Test utility module - not all methods used in every test
//! - Answer each verb with a scripted response
//! - Deliver submitted messages into a mailbox shared with a POP3 server
//! - Write responses in small chunks to exercise reassembly
//! - Inject network failures (hangs, connection drops)
//! - Track received lines for verification
//!
//! # Example
//!
//! ```rust,no_run
//! use support::mock_server::{Mailbox, MockServer};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mailbox = Mailbox::default();
//! let smtp = MockServer::smtp().with_mailbox(mailbox.clone()).build().await?;
//! let pop3 = MockServer::pop3().with_mailbox(mailbox).build().await?;
//!
//! // Submit through smtp.port(), retrieve through pop3.port()
//!
//! smtp.shutdown();
//! pop3.shutdown();
//! # Ok(())
//! # }
//! ```

use std::{
    collections::HashMap,
    fmt::Write,
    net::SocketAddr,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::{TcpListener, TcpStream, tcp::WriteHalf},
    sync::RwLock,
    time::timeout,
};

/// Messages shared between a submitting and a retrieving server.
#[derive(Debug, Clone, Default)]
pub struct Mailbox(Arc<RwLock<Vec<String>>>);

impl Mailbox {
    pub async fn push(&self, message: impl Into<String>) {
        self.0.write().await.push(message.into());
    }

    pub async fn messages(&self) -> Vec<String> {
        self.0.read().await.clone()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flavor {
    Smtp,
    Pop3,
}

#[derive(Clone)]
struct MockServerConfig {
    flavor: Flavor,
    greeting: String,
    responses: HashMap<String, String>,
    data_end_response: String,
    mailbox: Mailbox,

    // Failure injection
    chunk_size: Option<usize>,
    drop_after_commands: Option<usize>,
    timeout_on_command: Option<usize>,
}

impl MockServerConfig {
    fn smtp() -> Self {
        let responses = [
            ("HELO", "250 Hello"),
            ("EHLO", "250-localhost\r\n250 SIZE 10000"),
            ("MAIL", "250 OK"),
            ("RCPT", "250 OK"),
            ("DATA", "354 Start mail input; end with <CRLF>.<CRLF>"),
            ("QUIT", "221 Bye"),
        ];

        Self {
            flavor: Flavor::Smtp,
            greeting: "220 Mock SMTP Server".to_string(),
            responses: responses
                .into_iter()
                .map(|(verb, response)| (verb.to_string(), response.to_string()))
                .collect(),
            data_end_response: "250 OK: Message accepted".to_string(),
            mailbox: Mailbox::default(),
            chunk_size: None,
            drop_after_commands: None,
            timeout_on_command: None,
        }
    }

    fn pop3() -> Self {
        let responses = [
            ("USER", "+OK"),
            ("PASS", "+OK Logged in."),
            ("NOOP", "+OK"),
            ("QUIT", "+OK Logging out."),
        ];

        Self {
            flavor: Flavor::Pop3,
            greeting: "+OK Mock POP3 ready.".to_string(),
            responses: responses
                .into_iter()
                .map(|(verb, response)| (verb.to_string(), response.to_string()))
                .collect(),
            data_end_response: String::new(),
            mailbox: Mailbox::default(),
            chunk_size: None,
            drop_after_commands: None,
            timeout_on_command: None,
        }
    }
}

/// Mock mail server for testing
pub struct MockServer {
    addr: SocketAddr,
    received: Arc<RwLock<Vec<String>>>,
    mailbox: Mailbox,
    shutdown: Arc<AtomicBool>,
}

impl MockServer {
    /// A server answering like a permissive SMTP relay.
    #[must_use]
    pub fn smtp() -> MockServerBuilder {
        MockServerBuilder {
            config: MockServerConfig::smtp(),
        }
    }

    /// A server answering like a POP3 maildrop over its mailbox.
    #[must_use]
    pub fn pop3() -> MockServerBuilder {
        MockServerBuilder {
            config: MockServerConfig::pop3(),
        }
    }

    #[must_use]
    pub const fn addr(&self) -> SocketAddr {
        self.addr
    }

    #[must_use]
    pub const fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Every command line received, in order. Message content is not
    /// included.
    pub async fn received(&self) -> Vec<String> {
        self.received.read().await.clone()
    }

    pub const fn mailbox(&self) -> &Mailbox {
        &self.mailbox
    }

    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    async fn handle_client(
        mut stream: TcpStream,
        config: Arc<MockServerConfig>,
        received: Arc<RwLock<Vec<String>>>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let (reader, mut writer) = stream.split();
        let mut reader = BufReader::new(reader);
        let mut line = String::new();
        let mut command_count = 0;

        respond(&mut writer, &config, &config.greeting).await?;

        loop {
            line.clear();

            if let Some(drop_after) = config.drop_after_commands
                && command_count >= drop_after
            {
                return Ok(());
            }

            let read_result = timeout(Duration::from_secs(10), reader.read_line(&mut line)).await;
            let Ok(bytes_read) = read_result else {
                return Ok(());
            };
            if bytes_read? == 0 {
                return Ok(());
            }

            let command_line = line.trim_end().to_string();
            received.write().await.push(command_line.clone());

            if let Some(timeout_on) = config.timeout_on_command
                && command_count == timeout_on
            {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                return Ok(());
            }
            command_count += 1;

            let (verb, argument) = command_line
                .split_once(' ')
                .unwrap_or((command_line.as_str(), ""));
            let verb = verb.to_uppercase();

            let response = match config.responses.get(&verb) {
                Some(response) => response.clone(),
                None => generated_response(&config, &verb, argument).await,
            };
            respond(&mut writer, &config, &response).await?;

            if config.flavor == Flavor::Smtp && verb == "DATA" && response.starts_with("354") {
                let content = read_message(&mut reader).await?;
                config.mailbox.push(content).await;
                respond(&mut writer, &config, &config.data_end_response).await?;
            }

            if verb == "QUIT" {
                return Ok(());
            }
        }
    }
}

/// Responses derived from the mailbox rather than scripted.
async fn generated_response(config: &MockServerConfig, verb: &str, argument: &str) -> String {
    if config.flavor == Flavor::Smtp {
        return "500 Unknown command".to_string();
    }

    let messages = config.mailbox.messages().await;
    match verb {
        "STAT" => {
            let octets: usize = messages.iter().map(String::len).sum();
            format!("+OK {} {octets}", messages.len())
        }
        "LIST" => {
            let mut response = format!("+OK {} messages", messages.len());
            for (index, message) in messages.iter().enumerate() {
                let _ = write!(&mut response, "\r\n{} {}", index + 1, message.len());
            }
            response.push_str("\r\n.");
            response
        }
        "UIDL" => {
            let mut response = "+OK".to_string();
            for index in 1..=messages.len() {
                let _ = write!(&mut response, "\r\n{index} uid-{index}");
            }
            response.push_str("\r\n.");
            response
        }
        "RETR" => {
            let message = argument
                .trim()
                .parse::<usize>()
                .ok()
                .and_then(|index| index.checked_sub(1))
                .and_then(|index| messages.get(index));

            match message {
                Some(message) => {
                    let mut response = format!("+OK {} octets", message.len());
                    for line in message.lines() {
                        response.push_str("\r\n");
                        if line.starts_with('.') {
                            response.push('.');
                        }
                        response.push_str(line);
                    }
                    response.push_str("\r\n.");
                    response
                }
                None => "-ERR no such message".to_string(),
            }
        }
        _ => "-ERR unknown command".to_string(),
    }
}

/// Reads a dot-terminated message body and undoes the dot-stuffing.
async fn read_message(
    reader: &mut BufReader<tokio::net::tcp::ReadHalf<'_>>,
) -> Result<String, std::io::Error> {
    let mut content = Vec::new();
    let mut line = String::new();

    loop {
        line.clear();
        if reader.read_line(&mut line).await? == 0 {
            break;
        }

        let trimmed = line.trim_end_matches(['\r', '\n']);
        if trimmed == "." {
            break;
        }
        content.push(trimmed.strip_prefix('.').unwrap_or(trimmed).to_string());
    }

    Ok(content.join("\r\n"))
}

async fn respond(
    writer: &mut WriteHalf<'_>,
    config: &MockServerConfig,
    response: &str,
) -> Result<(), std::io::Error> {
    let bytes = format!("{response}\r\n").into_bytes();

    match config.chunk_size {
        Some(size) => {
            for chunk in bytes.chunks(size.max(1)) {
                writer.write_all(chunk).await?;
                writer.flush().await?;
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        }
        None => {
            writer.write_all(&bytes).await?;
            writer.flush().await?;
        }
    }

    Ok(())
}

/// Builder for a [`MockServer`]
pub struct MockServerBuilder {
    config: MockServerConfig,
}

impl MockServerBuilder {
    #[must_use]
    pub fn with_greeting(mut self, greeting: impl Into<String>) -> Self {
        self.config.greeting = greeting.into();
        self
    }

    /// Answer `verb` with `response`. Multi-line responses are separated by
    /// `\r\n`; the final line ending is added.
    #[must_use]
    pub fn with_response(mut self, verb: &str, response: impl Into<String>) -> Self {
        self.config
            .responses
            .insert(verb.to_uppercase(), response.into());
        self
    }

    /// Set the response after message content (after `<CRLF>.<CRLF>`)
    #[must_use]
    pub fn with_data_end_response(mut self, response: impl Into<String>) -> Self {
        self.config.data_end_response = response.into();
        self
    }

    #[must_use]
    pub fn with_mailbox(mut self, mailbox: Mailbox) -> Self {
        self.config.mailbox = mailbox;
        self
    }

    /// Write every response in pieces of `size` bytes
    #[must_use]
    pub const fn with_chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = Some(size);
        self
    }

    /// Drop the connection after N commands
    #[must_use]
    pub const fn with_network_error_after_commands(mut self, count: usize) -> Self {
        self.config.drop_after_commands = Some(count);
        self
    }

    /// Hang on the Nth command (0-indexed)
    #[must_use]
    pub const fn with_timeout_on_command(mut self, command_index: usize) -> Self {
        self.config.timeout_on_command = Some(command_index);
        self
    }

    /// Build and start the mock server
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to bind to a port
    pub async fn build(self) -> Result<MockServer, std::io::Error> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let mailbox = self.config.mailbox.clone();
        let config = Arc::new(self.config);
        let received = Arc::new(RwLock::new(Vec::new()));
        let shutdown = Arc::new(AtomicBool::new(false));

        let received_clone = Arc::clone(&received);
        let shutdown_clone = Arc::clone(&shutdown);

        tokio::spawn(async move {
            loop {
                if shutdown_clone.load(Ordering::Relaxed) {
                    break;
                }

                // Accept with a timeout so the shutdown flag is checked
                let accept_result = timeout(Duration::from_millis(100), listener.accept()).await;

                if let Ok(Ok((stream, _peer))) = accept_result {
                    let config = Arc::clone(&config);
                    let received = Arc::clone(&received_clone);

                    tokio::spawn(async move {
                        if let Err(e) = MockServer::handle_client(stream, config, received).await {
                            eprintln!("Mock server client error: {e}");
                        }
                    });
                }
            }
        });

        Ok(MockServer {
            addr,
            received,
            mailbox,
            shutdown,
        })
    }
}
