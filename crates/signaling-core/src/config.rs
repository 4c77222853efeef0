//! Configuration for the signaling core

use std::time::Duration;

/// How long a long poll waits before answering with the empty sentinel
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct SignalingConfig {
    pub poll_timeout: Duration,
}

impl SignalingConfig {
    pub fn with_poll_timeout(mut self, poll_timeout: Duration) -> Self {
        self.poll_timeout = poll_timeout;
        self
    }
}

impl Default for SignalingConfig {
    fn default() -> Self {
        Self {
            poll_timeout: DEFAULT_POLL_TIMEOUT,
        }
    }
}
