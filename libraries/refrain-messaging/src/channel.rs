//! In-process producer backed by a `tokio` channel.

use crate::error::MessagingError;
use async_trait::async_trait;
use refrain_core::{EventProducer, OutboundMessage, Topics};
use tokio::sync::mpsc;

/// A message as it would have been published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedRecord {
    /// Topic the message maps to
    pub topic: String,
    /// The message itself
    pub message: OutboundMessage,
}

/// Forwards every message to an unbounded channel.
#[derive(Clone)]
pub struct ChannelProducer {
    tx: mpsc::UnboundedSender<PublishedRecord>,
    topics: Topics,
}

impl ChannelProducer {
    /// Create a producer and the receiver that observes it.
    pub fn new(topics: Topics) -> (Self, mpsc::UnboundedReceiver<PublishedRecord>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx, topics }, rx)
    }
}

#[async_trait]
impl EventProducer for ChannelProducer {
    async fn send(&self, message: OutboundMessage) -> refrain_core::Result<()> {
        let record = PublishedRecord {
            topic: message.topic(&self.topics).to_string(),
            message,
        };

        self.tx
            .send(record)
            .map_err(|_| MessagingError::ChannelClosed)?;

        Ok(())
    }
}
