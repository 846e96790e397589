//! Error types for the event producers.

use thiserror::Error;

/// Errors that can occur while publishing a message.
#[derive(Error, Debug)]
pub enum MessagingError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Broker returned an error response
    #[error("Broker error ({status}): {message}")]
    BrokerError { status: u16, message: String },

    /// Invalid broker URL
    #[error("Invalid broker URL: {0}")]
    InvalidUrl(String),

    /// Broker is offline or unreachable
    #[error("Broker unreachable: {0}")]
    BrokerUnreachable(String),

    /// Message could not be encoded
    #[error("Failed to encode message: {0}")]
    Encode(String),

    /// The receiving end of a channel producer is gone
    #[error("Channel closed")]
    ChannelClosed,
}

/// Result type for producer operations.
pub type Result<T> = std::result::Result<T, MessagingError>;

impl From<MessagingError> for refrain_core::RefrainError {
    fn from(err: MessagingError) -> Self {
        refrain_core::RefrainError::messaging(err.to_string())
    }
}
