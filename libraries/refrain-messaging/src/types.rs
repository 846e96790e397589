//! Producer configuration.

use refrain_core::Topics;
use std::time::Duration;

/// Where and how the HTTP producer publishes.
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    /// Base URL of the broker bridge (e.g., "http://localhost:8082")
    pub url: String,
    /// Topic names per message kind
    pub topics: Topics,
    /// Per-request timeout
    pub timeout: Duration,
}

impl BrokerConfig {
    /// Create a config with default topics and a 10 second timeout.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            topics: Topics::default(),
            timeout: Duration::from_secs(10),
        }
    }

    /// Replace the topic names.
    pub fn with_topics(mut self, topics: Topics) -> Self {
        self.topics = topics;
        self
    }

    /// Replace the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}
