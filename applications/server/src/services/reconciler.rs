/// Startup reconciliation
use super::{Catalog, Directory, QueueStore};
use refrain_core::{Result, SongId};
use std::sync::Arc;

/// What one startup pass changed
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    pub created_default_user: bool,
    pub purged_songs: usize,
    pub failed_songs: usize,
}

/// Runs once before traffic is served
pub struct StartupReconciler {
    catalog: Arc<Catalog>,
    directory: Arc<Directory>,
    queue: Arc<QueueStore>,
    default_username: String,
}

impl StartupReconciler {
    pub fn new(
        catalog: Arc<Catalog>,
        directory: Arc<Directory>,
        queue: Arc<QueueStore>,
        default_username: impl Into<String>,
    ) -> Self {
        Self {
            catalog,
            directory,
            queue,
            default_username: default_username.into(),
        }
    }

    /// Bootstrap the default user, then purge invalid songs
    pub async fn run(&self) -> Result<ReconcileReport> {
        let created_default_user = self.ensure_default_user().await?;
        let mut report = self.purge_invalid_songs().await?;
        report.created_default_user = created_default_user;
        Ok(report)
    }

    /// Create the default user when there are no users at all
    pub async fn ensure_default_user(&self) -> Result<bool> {
        if self.directory.count_users().await? > 0 {
            return Ok(false);
        }

        let user = self.directory.create_user(&self.default_username, None).await?;
        tracing::info!(username = %user.username, "Created default user");
        Ok(true)
    }

    /// Remove every song without a url
    ///
    /// For each song: history links, then queue entries, then the song.
    /// A failure on one song is logged and the rest are still processed.
    pub async fn purge_invalid_songs(&self) -> Result<ReconcileReport> {
        let invalid = self.catalog.list_invalid().await?;
        let mut report = ReconcileReport::default();

        for song in invalid {
            match self.purge_song(song.id).await {
                Ok(()) => report.purged_songs += 1,
                Err(e) => {
                    report.failed_songs += 1;
                    tracing::warn!(song_id = %song.id, "Failed to purge invalid song: {}", e);
                }
            }
        }

        tracing::info!(
            purged = report.purged_songs,
            failed = report.failed_songs,
            "Invalid song cleanup finished"
        );

        Ok(report)
    }

    async fn purge_song(&self, song_id: SongId) -> Result<()> {
        self.directory.unlink_song(song_id).await?;
        self.queue.remove_song_everywhere(song_id).await?;
        self.catalog.delete(song_id).await
    }
}
