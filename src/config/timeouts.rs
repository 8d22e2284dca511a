//! Bounds on how long a probe waits for the server.

use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Timeouts {
    /// Timeout for establishing the TCP connection.
    ///
    /// Default: 10 seconds
    #[serde(default = "defaults::connect_secs")]
    pub connect_secs: u64,

    /// How long to wait for the next chunk of a response. `0` waits forever.
    ///
    /// Default: 30 seconds
    #[serde(default = "defaults::response_secs")]
    pub response_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            connect_secs: defaults::connect_secs(),
            response_secs: defaults::response_secs(),
        }
    }
}

impl Timeouts {
    #[must_use]
    pub const fn connect(&self) -> Duration {
        Duration::from_secs(self.connect_secs)
    }

    #[must_use]
    pub const fn response(&self) -> Option<Duration> {
        match self.response_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

mod defaults {
    pub const fn connect_secs() -> u64 {
        10
    }
    pub const fn response_secs() -> u64 {
        30
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeouts_defaults() {
        let timeouts = Timeouts::default();
        assert_eq!(timeouts.connect(), Duration::from_secs(10));
        assert_eq!(timeouts.response(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_zero_response_timeout_disables_it() {
        let timeouts = Timeouts {
            connect_secs: 5,
            response_secs: 0,
        };
        assert_eq!(timeouts.response(), None);
    }
}
