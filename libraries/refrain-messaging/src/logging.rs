//! Producer that only logs.

use async_trait::async_trait;
use refrain_core::{EventProducer, OutboundMessage, Topics};
use tracing::info;

/// Logs each message at `info` and drops it.
///
/// Used when no broker is configured, so refills and likes still work
/// locally without anything listening.
#[derive(Debug, Clone, Default)]
pub struct LoggingProducer {
    topics: Topics,
}

impl LoggingProducer {
    /// Create a logging producer that reports the given topic names.
    pub fn new(topics: Topics) -> Self {
        Self { topics }
    }
}

#[async_trait]
impl EventProducer for LoggingProducer {
    async fn send(&self, message: OutboundMessage) -> refrain_core::Result<()> {
        let payload = message.payload()?;
        info!(topic = message.topic(&self.topics), %payload, "Dropping outbound message (no broker configured)");
        Ok(())
    }
}
