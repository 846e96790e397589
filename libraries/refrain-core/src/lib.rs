//! Refrain Core
//!
//! Storage-agnostic domain types, messages, and error handling for the
//! Refrain queue service.
//!
//! # Architecture
//!
//! The core crate defines:
//! - **Domain Types**: `Song`, `User`, `ListeningHistory`, `QueueEntry`
//! - **Messages**: outbound and inbound async message payloads as tagged unions
//! - **Producer seam**: the `EventProducer` trait implemented by the messaging crate
//! - **Error Handling**: unified `RefrainError` and `Result` types
//!
//! # Example
//!
//! ```rust
//! use refrain_core::messages::{InboundMessage, SourcingStatus};
//! use refrain_core::types::SongId;
//!
//! let song_id = SongId::generate();
//! let payload = serde_json::json!({
//!     "uuid": song_id.to_string(),
//!     "filePath": "/music/a.mp3",
//!     "status": "COMPLETED",
//! });
//!
//! let message = InboundMessage::decode("loaded-song", &payload.to_string(), &Default::default()).unwrap();
//! match message {
//!     InboundMessage::SourcingResult(result) => assert_eq!(result.status, SourcingStatus::Completed),
//!     _ => unreachable!(),
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod messages;
pub mod producer;
pub mod types;

// Re-export commonly used types
pub use error::{ErrorKind, RefrainError, Result};
pub use messages::{InboundMessage, OutboundMessage, Topics};
pub use producer::EventProducer;

pub use types::{
    ListeningHistory, QueueEntry, QueueEntryId, QueuedSong, Song, SongId, User, UserId,
};
