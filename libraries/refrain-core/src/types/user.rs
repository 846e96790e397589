/// User domain types
use super::ids::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A listener with exactly one queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Unique user identifier
    pub id: UserId,

    /// Unique username, as supplied by the authentication layer
    pub username: String,

    /// Identity in the upstream auth system, if the user came from there
    pub external_id: Option<String>,

    /// Account creation timestamp
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Create a new user with a fresh id
    pub fn new(username: impl Into<String>, external_id: Option<String>) -> Self {
        Self {
            id: UserId::generate(),
            username: username.into(),
            external_id,
            created_at: Utc::now(),
        }
    }
}
