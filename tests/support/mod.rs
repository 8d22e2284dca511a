#![allow(dead_code)] // Shared by several test binaries

pub mod mock_server;

use mailprobe::config::{
    Config, PacingConfig, Pop3Account, Pop3Pacing, SmtpPacing, SmtpTarget, Timeouts,
};

/// Config with pacing disabled and short timeouts.
pub fn fast_config() -> Config {
    Config {
        pacing: PacingConfig {
            smtp: SmtpPacing {
                greeting_ms: 0,
                command_ms: 0,
                continuation_ms: 0,
                settle_ms: 0,
            },
            pop3: Pop3Pacing { command_ms: 0 },
        },
        timeouts: Timeouts {
            connect_secs: 2,
            response_secs: 2,
        },
        ..Config::default()
    }
}

pub fn smtp_target(port: u16) -> SmtpTarget {
    SmtpTarget {
        name: Some("Mock SMTP".to_string()),
        host: "127.0.0.1".to_string(),
        port,
        ..SmtpTarget::default()
    }
}

pub fn pop3_account(port: u16, expected_content: Option<&str>) -> Pop3Account {
    Pop3Account {
        host: "127.0.0.1".to_string(),
        port,
        username: "testuser".to_string(),
        password: "testpass".to_string(),
        expected_content: expected_content.map(str::to_string),
    }
}
