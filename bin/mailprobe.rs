//! Exercises mail servers end to end.
//!
//! - `smtp` submits a test message
//! - `pop3` logs in and inspects the newest message
//! - `flow` submits a tokenised message and retrieves it again
//! - `run` runs every probe in the config file

#![deny(clippy::pedantic, clippy::all, clippy::nursery)]
#![allow(clippy::must_use_candidate)]

use std::{path::PathBuf, process::ExitCode};

use clap::{Args, Parser, Subcommand};
use mailprobe::{
    config::{Config, FlowConfig, Pop3Account, SmtpTarget},
    flow::{self, Outcome},
};

/// Exercise SMTP and POP3 servers end to end
#[derive(Parser, Debug)]
#[command(name = "mailprobe")]
#[command(about = "Probe SMTP and POP3 servers", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to the config file. Defaults to `MAILPROBE_CONFIG`, then
    /// ./mailprobe.toml, then /etc/mailprobe/mailprobe.toml
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Run the selected probes concurrently
    #[arg(short, long)]
    parallel: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Submit a test message over SMTP
    Smtp(SmtpArgs),
    /// Log in over POP3 and inspect the mailbox
    Pop3(Pop3Args),
    /// Submit a tokenised message, then retrieve it over POP3
    Flow(FlowArgs),
    /// Run every probe in the config file
    Run,
}

#[derive(Args, Debug)]
struct SmtpArgs {
    /// Server host. Without it the config's `[[smtp]]` targets are used
    #[arg(long)]
    host: Option<String>,
    #[arg(long)]
    port: Option<u16>,
    /// Name sent with HELO
    #[arg(long)]
    helo: Option<String>,
    #[arg(long)]
    from: Option<String>,
    #[arg(long)]
    to: Option<String>,
    #[arg(long)]
    subject: Option<String>,
    #[arg(long)]
    body: Option<String>,
}

#[derive(Args, Debug)]
struct Pop3Args {
    /// Server host. Without it the config's `[[pop3]]` accounts are used
    #[arg(long)]
    host: Option<String>,
    #[arg(long)]
    port: Option<u16>,
    #[arg(short, long, default_value = "testuser")]
    username: String,
    #[arg(short = 'P', long, default_value = "testpass")]
    password: String,
    /// Text the newest message must contain
    #[arg(short, long)]
    expect: Option<String>,
}

#[derive(Args, Debug)]
struct FlowArgs {
    #[arg(long)]
    smtp_host: Option<String>,
    #[arg(long)]
    smtp_port: Option<u16>,
    #[arg(long)]
    pop3_host: Option<String>,
    #[arg(long)]
    pop3_port: Option<u16>,
    /// Recipient of the flow message
    #[arg(long)]
    to: Option<String>,
    #[arg(short, long)]
    username: Option<String>,
    #[arg(short = 'P', long)]
    password: Option<String>,
    /// Milliseconds to wait for local delivery
    #[arg(long)]
    wait_ms: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    mailprobe::init_logging();

    let cli = Cli::parse();
    let required = matches!(cli.command, Commands::Run);
    let mut config = load_config(cli.config, required)?;
    config.parallel |= cli.parallel;

    let title = match cli.command {
        Commands::Smtp(args) => {
            select_smtp(&mut config, args);
            "SMTP Test"
        }
        Commands::Pop3(args) => {
            select_pop3(&mut config, args);
            "POP3 Test"
        }
        Commands::Flow(args) => {
            select_flow(&mut config, args);
            "End-to-End SMTP -> POP3 Test"
        }
        Commands::Run => "mailprobe",
    };

    println!("=== {title} ===");
    let outcomes = flow::run_config(&config).await;
    if outcomes.is_empty() {
        anyhow::bail!("Nothing to probe, the config names no targets");
    }

    let failures = outcomes.iter().filter(|outcome| !print_outcome(outcome)).count();
    println!("=== {title} Complete: {} passed, {failures} failed ===", outcomes.len() - failures);

    Ok(if failures == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn load_config(path: Option<PathBuf>, required: bool) -> anyhow::Result<Config> {
    let path = match path {
        Some(path) => path,
        None => match Config::find_file() {
            Ok(path) => path,
            Err(err) if required => return Err(err.into()),
            Err(_) => return Ok(Config::default()),
        },
    };

    Ok(Config::load(&path)?)
}

fn select_smtp(config: &mut Config, args: SmtpArgs) {
    config.pop3.clear();
    config.flow = None;

    let Some(host) = args.host else {
        if config.smtp.is_empty() {
            config.smtp.push(SmtpTarget::default());
        }
        return;
    };

    let defaults = SmtpTarget::default();
    config.smtp = vec![SmtpTarget {
        name: None,
        host,
        port: args.port.unwrap_or(defaults.port),
        helo: args.helo.unwrap_or(defaults.helo),
        from: args.from.unwrap_or(defaults.from),
        to: args.to.unwrap_or(defaults.to),
        subject: args.subject.unwrap_or(defaults.subject),
        body: args.body.unwrap_or(defaults.body),
    }];
}

fn select_pop3(config: &mut Config, args: Pop3Args) {
    config.smtp.clear();
    config.flow = None;

    if args.host.is_none() && !config.pop3.is_empty() {
        return;
    }

    config.pop3 = vec![Pop3Account {
        host: args.host.unwrap_or_else(|| "localhost".to_string()),
        port: args.port.unwrap_or(110),
        username: args.username,
        password: args.password,
        expected_content: args.expect,
    }];
}

fn select_flow(config: &mut Config, args: FlowArgs) {
    config.smtp.clear();
    config.pop3.clear();

    let mut flow = config.flow.take().unwrap_or_default();
    let FlowConfig {
        smtp_host,
        smtp_port,
        pop3_host,
        pop3_port,
        to,
        username,
        password,
        delivery_wait_ms,
        ..
    } = &mut flow;

    if let Some(value) = args.smtp_host {
        *smtp_host = value;
    }
    if let Some(value) = args.smtp_port {
        *smtp_port = value;
    }
    if let Some(value) = args.pop3_host {
        *pop3_host = value;
    }
    if let Some(value) = args.pop3_port {
        *pop3_port = value;
    }
    if let Some(value) = args.to {
        *to = value;
    }
    if let Some(value) = args.username {
        *username = value;
    }
    if let Some(value) = args.password {
        *password = value;
    }
    if let Some(value) = args.wait_ms {
        *delivery_wait_ms = value;
    }

    config.flow = Some(flow);
}

/// Prints one outcome and returns whether it passed.
fn print_outcome(outcome: &Outcome) -> bool {
    println!("{}", "=".repeat(50));
    println!("{}", outcome.label);

    for report in &outcome.reports {
        for line in &report.sent {
            println!("  --> {line}");
        }
        println!("  {} lines received, {}", report.received, report.verdict);
    }
    for warning in outcome.warnings() {
        println!("  warning: {warning}");
    }
    if let Some(error) = &outcome.error {
        println!("  error: {error:#}");
    }

    let passed = outcome.is_success();
    println!("{} {}", if passed { "[PASS]" } else { "[FAIL]" }, outcome.label);
    passed
}
