/// Inbound message dispatch
use super::{refill::ScheduledRefill, Catalog, Directory, QueueStore, RefillOrchestrator};
use crate::config::RefillSettings;
use refrain_core::messages::{MetadataFound, SourcingResult, SourcingStatus, UserCreated};
use refrain_core::{ErrorKind, InboundMessage, Result, User};
use std::sync::Arc;

/// Routes each decoded message to the service that owns it
///
/// Handlers tolerate redelivery.
pub struct EventIngress {
    catalog: Arc<Catalog>,
    directory: Arc<Directory>,
    queue: Arc<QueueStore>,
    refill: Arc<RefillOrchestrator>,
    initial_seed_size: usize,
}

impl EventIngress {
    pub fn new(
        catalog: Arc<Catalog>,
        directory: Arc<Directory>,
        queue: Arc<QueueStore>,
        refill: Arc<RefillOrchestrator>,
        settings: &RefillSettings,
    ) -> Self {
        Self {
            catalog,
            directory,
            queue,
            refill,
            initial_seed_size: settings.initial_seed_size,
        }
    }

    /// Handle one message
    ///
    /// Returns the refill check it chained, if any, so callers that care
    /// (tests) can wait for it. Every failure is logged. Only internal
    /// failures, which a redelivery may get past, are returned; the rest
    /// would fail the same way again and are dropped here.
    pub async fn dispatch(&self, message: InboundMessage) -> Result<Option<ScheduledRefill>> {
        let kind = message.kind();
        let outcome = match message {
            InboundMessage::SourcingResult(result) => self.on_sourcing_result(result).await,
            InboundMessage::MetadataFound(found) => self.on_metadata_found(found).await.map(|()| None),
            InboundMessage::UserCreated(created) => self.on_user_created(created).await.map(|()| None),
        };

        match outcome {
            Ok(refill) => Ok(refill),
            Err(e) if e.kind() == ErrorKind::Internal => {
                tracing::error!(kind, "Failed to handle inbound message: {}", e);
                Err(e)
            }
            Err(e) => {
                tracing::warn!(kind, "Dropping inbound message: {}", e);
                Ok(None)
            }
        }
    }

    async fn on_sourcing_result(&self, result: SourcingResult) -> Result<Option<ScheduledRefill>> {
        match (result.status, result.file_path.as_deref()) {
            (SourcingStatus::Completed, Some(path)) => {
                self.refill.on_sourcing_completed(result.song_id, path).await
            }
            _ => self.refill.on_sourcing_failed(result.song_id).await,
        }
    }

    async fn on_metadata_found(&self, found: MetadataFound) -> Result<()> {
        self.catalog
            .set_metadata(found.song_id, found.title.as_deref(), found.artist.as_deref())
            .await?;
        tracing::debug!(song_id = %found.song_id, "Metadata updated");
        Ok(())
    }

    async fn on_user_created(&self, created: UserCreated) -> Result<()> {
        let creation = self
            .directory
            .create_from_external_event(&created.external_user_id, &created.username)
            .await?;

        if !creation.is_created() {
            tracing::info!(username = %created.username, "User already known, skipping seed");
            return Ok(());
        }

        self.seed_queue(creation.user()).await;
        Ok(())
    }

    /// Give a new user a random starting collection and queue
    async fn seed_queue(&self, user: &User) {
        let songs = match self.catalog.sample_playable(self.initial_seed_size).await {
            Ok(songs) => songs,
            Err(e) => {
                tracing::warn!(username = %user.username, "Could not sample seed songs: {}", e);
                return;
            }
        };

        let mut seeded = Vec::with_capacity(songs.len());
        for song in songs {
            match self.directory.link_song(user.id, song.id).await {
                Ok(()) => seeded.push(song.id),
                Err(e) => tracing::warn!(username = %user.username, song_id = %song.id, "Seed link failed: {}", e),
            }
        }

        for song_id in &seeded {
            if let Err(e) = self.queue.append(user.id, *song_id).await {
                tracing::warn!(username = %user.username, song_id = %song_id, "Seed append failed: {}", e);
            }
        }

        tracing::info!(username = %user.username, count = seeded.len(), "Seeded new user's queue");
    }
}
