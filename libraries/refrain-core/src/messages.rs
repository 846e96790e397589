//! Asynchronous message payloads
//!
//! Outbound messages are produced by the service and published through an
//! [`EventProducer`](crate::producer::EventProducer). Inbound messages arrive
//! from the sourcing pipeline and the auth system and are decoded exactly
//! once, at the ingress boundary, into [`InboundMessage`].

use crate::error::{RefrainError, Result};
use crate::types::{SongId, UserId};
use serde::{Deserialize, Serialize};

/// Topic names for every message kind
///
/// Deserializable so it can sit directly inside the service configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Topics {
    /// Outbound: ask the sourcing pipeline for a song
    pub sourcing_request: String,
    /// Outbound: a user liked a song
    pub liked: String,
    /// Outbound: a user unliked a song
    pub unliked: String,
    /// Inbound: sourcing finished or failed
    pub sourcing_result: String,
    /// Inbound: metadata was found for a placeholder
    pub metadata_found: String,
    /// Inbound: a user was created upstream
    pub user_created: String,
}

impl Default for Topics {
    fn default() -> Self {
        Self {
            sourcing_request: "request-random-song".to_string(),
            liked: "liked".to_string(),
            unliked: "unliked".to_string(),
            sourcing_result: "loaded-song".to_string(),
            metadata_found: "request-slskd-song".to_string(),
            user_created: "user-created".to_string(),
        }
    }
}

/// Ask the sourcing pipeline to find audio for a placeholder song
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourcingRequest {
    /// The placeholder to fill
    pub song_id: SongId,
    /// Search category
    pub genre: String,
}

/// Like or unlike notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeEvent {
    /// Acting user
    pub user_id: UserId,
    /// Acting user's name
    pub username: String,
    /// Song that was (un)liked
    pub song_id: SongId,
}

/// Messages the service publishes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundMessage {
    /// A refill reserved a placeholder and needs it sourced
    SourcingRequest(SourcingRequest),
    /// A song was liked
    Liked(LikeEvent),
    /// A song was unliked
    Unliked(LikeEvent),
}

impl OutboundMessage {
    /// Topic this message is published on
    pub fn topic<'a>(&self, topics: &'a Topics) -> &'a str {
        match self {
            Self::SourcingRequest(_) => &topics.sourcing_request,
            Self::Liked(_) => &topics.liked,
            Self::Unliked(_) => &topics.unliked,
        }
    }

    /// JSON payload as sent on the wire
    pub fn payload(&self) -> Result<serde_json::Value> {
        let value = match self {
            Self::SourcingRequest(request) => serde_json::to_value(request)?,
            Self::Liked(event) | Self::Unliked(event) => serde_json::to_value(event)?,
        };
        Ok(value)
    }
}

/// Outcome reported by the sourcing pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SourcingStatus {
    /// The file was downloaded and is playable at `file_path`
    Completed,
    /// Sourcing gave up
    Error,
}

/// Sourcing finished for a placeholder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourcingResult {
    /// Placeholder id
    #[serde(alias = "uuid")]
    pub song_id: SongId,
    /// Resolved file location, present on success
    #[serde(default)]
    pub file_path: Option<String>,
    /// Outcome
    pub status: SourcingStatus,
}

/// Metadata found for a placeholder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataFound {
    /// Placeholder id
    #[serde(alias = "id")]
    pub song_id: SongId,
    /// Song title
    #[serde(default)]
    pub title: Option<String>,
    /// Artist name
    #[serde(default)]
    pub artist: Option<String>,
}

/// A user was created in the upstream auth system
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserCreated {
    /// Upstream identity
    #[serde(alias = "userId")]
    pub external_user_id: String,
    /// Username
    pub username: String,
}

/// Messages the service consumes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundMessage {
    /// Completion or failure of a sourcing request
    SourcingResult(SourcingResult),
    /// Title and artist for a placeholder
    MetadataFound(MetadataFound),
    /// New upstream user
    UserCreated(UserCreated),
}

impl InboundMessage {
    /// Decode a raw record received on `topic`
    ///
    /// Unknown topics, malformed JSON and semantically empty payloads all
    /// fail with `InvalidArgument`.
    pub fn decode(topic: &str, payload: &str, topics: &Topics) -> Result<Self> {
        let message = if topic == topics.sourcing_result {
            let result: SourcingResult = parse(topic, payload)?;
            if result.status == SourcingStatus::Completed
                && !result.file_path.as_deref().is_some_and(|p| !p.trim().is_empty())
            {
                return Err(RefrainError::invalid_argument(format!(
                    "completed sourcing result for {} has no file path",
                    result.song_id
                )));
            }
            Self::SourcingResult(result)
        } else if topic == topics.metadata_found {
            Self::MetadataFound(parse(topic, payload)?)
        } else if topic == topics.user_created {
            let event: UserCreated = parse(topic, payload)?;
            if event.username.trim().is_empty() || event.external_user_id.trim().is_empty() {
                return Err(RefrainError::invalid_argument(
                    "user-created event needs both externalUserId and username",
                ));
            }
            Self::UserCreated(event)
        } else {
            return Err(RefrainError::invalid_argument(format!(
                "unknown topic: {topic}"
            )));
        };

        Ok(message)
    }

    /// Short label for logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SourcingResult(_) => "sourcing-result",
            Self::MetadataFound(_) => "metadata-found",
            Self::UserCreated(_) => "user-created",
        }
    }
}

fn parse<T: serde::de::DeserializeOwned>(topic: &str, payload: &str) -> Result<T> {
    serde_json::from_str(payload)
        .map_err(|e| RefrainError::invalid_argument(format!("bad {topic} payload: {e}")))
}
