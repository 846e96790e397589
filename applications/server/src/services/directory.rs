/// User directory service
use chrono::Utc;
use refrain_core::messages::LikeEvent;
use refrain_core::{EventProducer, OutboundMessage, RefrainError, Result, SongId, User, UserId};
use sqlx::SqlitePool;
use std::sync::Arc;

/// Result of an idempotent user creation
#[derive(Debug, Clone)]
pub enum UserCreation {
    /// A new user and queue were written
    Created(User),
    /// The user already existed; nothing new was written
    Existing(User),
}

impl UserCreation {
    pub fn user(&self) -> &User {
        match self {
            Self::Created(user) | Self::Existing(user) => user,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, Self::Created(_))
    }
}

/// Owns user identity and per-user listening history
pub struct Directory {
    pool: SqlitePool,
    producer: Arc<dyn EventProducer>,
}

impl Directory {
    pub fn new(pool: SqlitePool, producer: Arc<dyn EventProducer>) -> Self {
        Self { pool, producer }
    }

    pub async fn get_by_username(&self, username: &str) -> Result<User> {
        refrain_storage::users::find_by_username(&self.pool, username)
            .await?
            .ok_or_else(|| RefrainError::not_found("User", username))
    }

    pub async fn get_by_id(&self, id: UserId) -> Result<User> {
        refrain_storage::users::find_by_id(&self.pool, id)
            .await?
            .ok_or_else(|| RefrainError::not_found("User", id))
    }

    pub async fn list_users(&self) -> Result<Vec<User>> {
        refrain_storage::users::get_all(&self.pool).await
    }

    pub async fn count_users(&self) -> Result<i64> {
        refrain_storage::users::count(&self.pool).await
    }

    /// Create a local user and their queue
    pub async fn create_user(&self, username: &str, external_id: Option<&str>) -> Result<User> {
        if username.trim().is_empty() {
            return Err(RefrainError::invalid_argument("username cannot be empty"));
        }
        refrain_storage::users::create(&self.pool, username, external_id).await
    }

    /// Create a user announced by the upstream auth system
    ///
    /// Redelivery of the same event returns the existing user. A local user
    /// with the same username and no external id adopts the upstream
    /// identity. A username already bound to a different external id is a
    /// `Conflict`.
    pub async fn create_from_external_event(
        &self,
        external_id: &str,
        username: &str,
    ) -> Result<UserCreation> {
        if let Some(user) = self.resolve_existing(external_id, username).await? {
            return Ok(UserCreation::Existing(user));
        }

        match self.create_user(username, Some(external_id)).await {
            Ok(user) => Ok(UserCreation::Created(user)),
            // Lost a race with a concurrent delivery of the same event
            Err(RefrainError::Conflict(_)) => self
                .resolve_existing(external_id, username)
                .await?
                .map(UserCreation::Existing)
                .ok_or_else(|| {
                    RefrainError::Conflict(format!("cannot create user {username}"))
                }),
            Err(e) => Err(e),
        }
    }

    async fn resolve_existing(&self, external_id: &str, username: &str) -> Result<Option<User>> {
        if let Some(user) =
            refrain_storage::users::find_by_external_id(&self.pool, external_id).await?
        {
            if user.username != username {
                tracing::warn!(
                    external_id,
                    stored = %user.username,
                    announced = username,
                    "External id already bound to another username, keeping stored user"
                );
            }
            return Ok(Some(user));
        }

        let Some(user) = refrain_storage::users::find_by_username(&self.pool, username).await?
        else {
            return Ok(None);
        };

        match user.external_id.as_deref() {
            None => {
                refrain_storage::users::attach_external_id(&self.pool, user.id, external_id)
                    .await?;
                tracing::info!(username, external_id, "Adopted existing user for external id");
                self.get_by_id(user.id).await.map(Some)
            }
            Some(bound) if bound == external_id => Ok(Some(user)),
            Some(bound) => Err(RefrainError::Conflict(format!(
                "username {username} is bound to external id {bound}"
            ))),
        }
    }

    pub async fn mark_skipped(&self, user: &User, song_id: SongId) -> Result<()> {
        refrain_storage::history::mark_skipped(&self.pool, user.id, song_id).await
    }

    pub async fn increment_listen_count(&self, user: &User, song_id: SongId) -> Result<()> {
        refrain_storage::history::record_listen(&self.pool, user.id, song_id, Utc::now()).await
    }

    /// Set the liked flag, then announce it
    ///
    /// The flag is committed before publishing; a failed publish is logged
    /// and does not fail the call.
    pub async fn mark_liked(&self, user: &User, song_id: SongId, liked: bool) -> Result<()> {
        refrain_storage::history::set_liked(&self.pool, user.id, song_id, liked).await?;

        let event = LikeEvent {
            user_id: user.id,
            username: user.username.clone(),
            song_id,
        };
        let message = if liked {
            OutboundMessage::Liked(event)
        } else {
            OutboundMessage::Unliked(event)
        };

        if let Err(e) = self.producer.send(message).await {
            tracing::warn!(
                username = %user.username,
                song_id = %song_id,
                liked,
                "Failed to publish like event: {}",
                e
            );
        }

        Ok(())
    }

    pub async fn is_liked(&self, user: &User, song_id: SongId) -> Result<bool> {
        refrain_storage::history::is_liked(&self.pool, user.id, song_id).await
    }

    /// Record that `song_id` belongs to `user_id`
    pub async fn link_song(&self, user_id: UserId, song_id: SongId) -> Result<()> {
        refrain_storage::history::link(&self.pool, user_id, song_id).await
    }

    /// The user a song was reserved for, if any
    pub async fn owner_of(&self, song_id: SongId) -> Result<Option<User>> {
        match refrain_storage::history::find_owner(&self.pool, song_id).await? {
            Some(user_id) => refrain_storage::users::find_by_id(&self.pool, user_id).await,
            None => Ok(None),
        }
    }

    /// Drop every history entry for a song
    pub async fn unlink_song(&self, song_id: SongId) -> Result<u64> {
        refrain_storage::history::delete_for_song(&self.pool, song_id).await
    }
}
