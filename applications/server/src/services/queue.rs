/// Queue store service
///
/// Every mutation holds the owner's lock for the whole storage transaction,
/// so positions stay `0..len` under concurrent requests and events.
use super::locks::UserLocks;
use refrain_core::{
    QueueEntry, QueueEntryId, QueuedSong, RefrainError, Result, SongId, User, UserId,
};
use sqlx::SqlitePool;

pub struct QueueStore {
    pool: SqlitePool,
    locks: UserLocks,
}

impl QueueStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            locks: UserLocks::new(),
        }
    }

    /// Current queue contents, creating an empty queue if the user has none
    pub async fn get_or_create(&self, user: &User) -> Result<Vec<QueuedSong>> {
        if refrain_storage::queue::ensure(&self.pool, user.id).await? {
            tracing::warn!(username = %user.username, "User had no queue, created one");
        }
        refrain_storage::queue::songs(&self.pool, user.id).await
    }

    pub async fn entries(&self, user_id: UserId) -> Result<Vec<QueueEntry>> {
        refrain_storage::queue::entries(&self.pool, user_id).await
    }

    pub async fn len(&self, user_id: UserId) -> Result<i64> {
        refrain_storage::queue::len(&self.pool, user_id).await
    }

    /// Append unless the song is already queued
    ///
    /// Returns `None` for a duplicate, which is logged and otherwise ignored.
    pub async fn append(&self, user_id: UserId, song_id: SongId) -> Result<Option<QueueEntry>> {
        let _guard = self.locks.lock(user_id).await;

        let entry = refrain_storage::queue::append(&self.pool, user_id, song_id).await?;
        if entry.is_none() {
            tracing::info!(user_id = %user_id, song_id = %song_id, "Song already queued, skipping append");
        }
        Ok(entry)
    }

    pub async fn insert_at(
        &self,
        user_id: UserId,
        song_id: SongId,
        position: i64,
    ) -> Result<QueueEntry> {
        let _guard = self.locks.lock(user_id).await;
        refrain_storage::queue::insert_at(&self.pool, user_id, song_id, position).await
    }

    /// Remove the lowest-positioned entry for a song; no-op when absent
    pub async fn remove_first_match(
        &self,
        user_id: UserId,
        song_id: SongId,
    ) -> Result<Option<QueueEntryId>> {
        let _guard = self.locks.lock(user_id).await;
        refrain_storage::queue::remove_first_match(&self.pool, user_id, song_id).await
    }

    pub async fn remove_entry(&self, user_id: UserId, entry_id: QueueEntryId) -> Result<()> {
        let _guard = self.locks.lock(user_id).await;
        refrain_storage::queue::remove_entry(&self.pool, user_id, entry_id).await
    }

    /// Remove a song from every queue that holds it
    ///
    /// Each queue is handled under its own lock. Failures on one queue do
    /// not stop the others; the first one is returned at the end.
    pub async fn remove_song_everywhere(&self, song_id: SongId) -> Result<u64> {
        let holders = refrain_storage::queue::holders(&self.pool, song_id).await?;

        let mut removed = 0;
        let mut first_error: Option<RefrainError> = None;

        for user_id in holders {
            let _guard = self.locks.lock(user_id).await;
            match refrain_storage::queue::remove_song(&self.pool, user_id, song_id).await {
                Ok(count) => removed += count,
                Err(e) => {
                    tracing::warn!(user_id = %user_id, song_id = %song_id, "Failed to remove song from queue: {}", e);
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(removed),
        }
    }
}
