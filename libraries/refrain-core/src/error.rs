//! Core error types for Refrain

use thiserror::Error;

/// Result type alias using `RefrainError`
pub type Result<T> = std::result::Result<T, RefrainError>;

/// Core error type for Refrain
#[derive(Error, Debug)]
pub enum RefrainError {
    /// Entity not found
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of entity, e.g. `Song`
        entity: String,
        /// The id that was looked up
        id: String,
    },

    /// Bad position, missing required field, or undecodable payload
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// No trusted identity in the request context
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    /// Identity clash that cannot be absorbed idempotently
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Database errors (for storage implementations)
    #[error("Database error: {0}")]
    Database(String),

    /// Outbound message could not be published
    #[error("Messaging error: {0}")]
    Messaging(String),

    /// Serialization errors
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    /// Other errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse classification used by transports to pick a status code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The referenced entity does not exist
    NotFound,
    /// The caller sent something unusable
    InvalidArgument,
    /// No trusted identity
    Unauthenticated,
    /// Clashes with existing state
    Conflict,
    /// Server-side failure such as storage or messaging
    Internal,
}

impl RefrainError {
    /// Create a not found error
    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Create an invalid argument error
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Create a messaging error
    pub fn messaging(msg: impl Into<String>) -> Self {
        Self::Messaging(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::Unauthenticated(_) => ErrorKind::Unauthenticated,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::Database(_) | Self::Messaging(_) | Self::Serialization(_) | Self::Internal(_) => {
                ErrorKind::Internal
            }
        }
    }

    /// True for `NotFound`
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }
}

#[cfg(feature = "sqlx")]
impl From<sqlx::Error> for RefrainError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_family_collapses_to_internal_kind() {
        assert_eq!(RefrainError::messaging("down").kind(), ErrorKind::Internal);
        assert_eq!(RefrainError::Database("locked".into()).kind(), ErrorKind::Internal);
        assert_eq!(RefrainError::internal("x").kind(), ErrorKind::Internal);
    }

    #[test]
    fn not_found_formats_entity_and_id() {
        let err = RefrainError::not_found("Song", "abc");
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "Song not found: abc");
    }
}
