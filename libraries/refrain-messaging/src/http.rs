//! HTTP producer for a Kafka REST-proxy style broker bridge.

use crate::error::{MessagingError, Result};
use crate::types::BrokerConfig;
use async_trait::async_trait;
use refrain_core::{EventProducer, OutboundMessage, Topics};
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

/// Content type the broker bridge expects for JSON records.
pub const KAFKA_JSON_V2: &str = "application/vnd.kafka.json.v2+json";

/// Publishes each message as a single record to `{url}/topics/{topic}`.
///
/// Records are keyed by a fresh UUID, so the broker spreads them across
/// partitions.
pub struct HttpProducer {
    http: Client,
    base_url: String,
    topics: Topics,
}

impl HttpProducer {
    /// Create a new producer with the given configuration.
    pub fn new(config: BrokerConfig) -> Result<Self> {
        if config.url.is_empty() {
            return Err(MessagingError::InvalidUrl("URL cannot be empty".into()));
        }

        let base_url = config.url.trim_end_matches('/').to_string();
        let parsed =
            url::Url::parse(&base_url).map_err(|e| MessagingError::InvalidUrl(e.to_string()))?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(MessagingError::InvalidUrl(
                "URL must start with http:// or https://".into(),
            ));
        }

        let http = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(Duration::from_secs(5))
            .user_agent(format!("Refrain/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url,
            topics: config.topics,
        })
    }

    /// The broker base URL, without a trailing slash.
    pub fn url(&self) -> &str {
        &self.base_url
    }

    async fn publish(&self, message: &OutboundMessage) -> Result<()> {
        let topic = message.topic(&self.topics);
        let url = format!("{}/topics/{}", self.base_url, topic);

        let value = message
            .payload()
            .map_err(|e| MessagingError::Encode(e.to_string()))?;
        let body = json!({
            "records": [{ "key": Uuid::new_v4().to_string(), "value": value }]
        });
        let body = serde_json::to_vec(&body).map_err(|e| MessagingError::Encode(e.to_string()))?;

        debug!(url = %url, topic, "Publishing record");

        let response = self
            .http
            .post(&url)
            .header(CONTENT_TYPE, KAFKA_JSON_V2)
            .body(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() || e.is_timeout() {
                    MessagingError::BrokerUnreachable(e.to_string())
                } else {
                    MessagingError::Request(e)
                }
            })?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let error_text = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), topic, "Broker rejected record");
            Err(MessagingError::BrokerError {
                status: status.as_u16(),
                message: error_text,
            })
        }
    }
}

#[async_trait]
impl EventProducer for HttpProducer {
    async fn send(&self, message: OutboundMessage) -> refrain_core::Result<()> {
        Ok(self.publish(&message).await?)
    }
}
