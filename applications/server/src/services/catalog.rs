/// Song catalog service
use chrono::Utc;
use rand::seq::SliceRandom;
use refrain_core::{RefrainError, Result, Song, SongId, UserId};
use sqlx::SqlitePool;
use std::time::Duration;

/// Owns song records and their lifecycle
pub struct Catalog {
    pool: SqlitePool,
}

impl Catalog {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Persist an empty placeholder
    pub async fn create_placeholder(&self) -> Result<SongId> {
        refrain_storage::songs::create_placeholder(&self.pool).await
    }

    pub async fn set_playable_url(&self, id: SongId, url: &str) -> Result<()> {
        refrain_storage::songs::set_url(&self.pool, id, url).await
    }

    pub async fn set_metadata(
        &self,
        id: SongId,
        title: Option<&str>,
        artist: Option<&str>,
    ) -> Result<()> {
        refrain_storage::songs::set_metadata(&self.pool, id, title, artist).await
    }

    /// Delete a song; unknown ids are ignored
    pub async fn delete(&self, id: SongId) -> Result<()> {
        if !refrain_storage::songs::delete(&self.pool, id).await? {
            tracing::debug!(song_id = %id, "Song already gone");
        }
        Ok(())
    }

    pub async fn find_by_id(&self, id: SongId) -> Result<Song> {
        refrain_storage::songs::find_by_id(&self.pool, id)
            .await?
            .ok_or_else(|| RefrainError::not_found("Song", id))
    }

    /// Songs with a null or empty url
    pub async fn list_invalid(&self) -> Result<Vec<Song>> {
        refrain_storage::songs::list_invalid(&self.pool).await
    }

    pub async fn list_playable(&self) -> Result<Vec<Song>> {
        refrain_storage::songs::list_playable(&self.pool).await
    }

    /// Uniform sample of at most `size` distinct playable songs
    pub async fn sample_playable(&self, size: usize) -> Result<Vec<Song>> {
        let pool = self.list_playable().await?;
        let mut rng = rand::thread_rng();
        Ok(pool.choose_multiple(&mut rng, size).cloned().collect())
    }

    /// Placeholders reserved for a user within the last `ttl`
    pub async fn pending_reservations(&self, user_id: UserId, ttl: Duration) -> Result<i64> {
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| RefrainError::internal(format!("reservation ttl out of range: {e}")))?;
        refrain_storage::songs::count_pending_for_user(&self.pool, user_id, Utc::now() - ttl).await
    }
}
