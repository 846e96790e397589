//! Refrain Messaging
//!
//! Implementations of [`refrain_core::EventProducer`].
//!
//! # Producers
//!
//! - **`HttpProducer`**: publishes to a Kafka REST-proxy style broker bridge
//! - **`ChannelProducer`**: hands messages to an in-process `tokio` channel
//! - **`LoggingProducer`**: logs and drops, for deployments without a broker
//!
//! # Example
//!
//! ```ignore
//! use refrain_messaging::{BrokerConfig, HttpProducer};
//! use refrain_core::EventProducer;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let producer = HttpProducer::new(BrokerConfig::new("http://localhost:8082"))?;
//!     producer.send(message).await?;
//!     Ok(())
//! }
//! ```

mod channel;
mod error;
mod http;
mod logging;
mod types;

pub use channel::{ChannelProducer, PublishedRecord};
pub use error::{MessagingError, Result};
pub use http::{HttpProducer, KAFKA_JSON_V2};
pub use logging::LoggingProducer;
pub use types::BrokerConfig;
