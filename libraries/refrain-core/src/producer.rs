//! Outbound publishing seam

use crate::error::Result;
use crate::messages::OutboundMessage;
use async_trait::async_trait;
use std::sync::Arc;

/// Publishes outbound messages to the async messaging fabric
///
/// Implementations decide the transport. Callers treat publishing as
/// fire-and-forget: a failed send is logged and the mutation that caused it
/// stays committed.
#[async_trait]
pub trait EventProducer: Send + Sync {
    /// Publish one message
    ///
    /// # Errors
    /// Returns `RefrainError::Messaging` when the transport rejects or
    /// cannot reach its destination.
    async fn send(&self, message: OutboundMessage) -> Result<()>;
}

#[async_trait]
impl<P: EventProducer + ?Sized> EventProducer for Arc<P> {
    async fn send(&self, message: OutboundMessage) -> Result<()> {
        (**self).send(message).await
    }
}
