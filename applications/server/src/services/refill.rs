/// Queue refill orchestrator
///
/// Keeps every queue at or above a target size by reserving placeholder
/// songs and asking the sourcing backend to fill them. Progress is not
/// stored anywhere explicit; it is read back from the catalog and history:
///
/// - a placeholder (no url) linked to a user is a reservation in flight
/// - a playable song linked to a user was sourced for them
/// - an unlinked, deleted placeholder is a failed reservation
///
/// Completion and failure events resolve the owning user through the
/// history link, append or clean up, then schedule a fresh check on a
/// separate task.
use super::{locks::UserLocks, Catalog, Directory, QueueStore};
use crate::config::RefillSettings;
use refrain_core::messages::SourcingRequest;
use refrain_core::{EventProducer, OutboundMessage, QueueEntryId, Result, SongId, User};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Size target and batch cap for one check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefillPolicy {
    pub min_size: i64,
    pub max_batch: i64,
}

/// How a queue entry was consumed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Consumption {
    Skipped,
    Finished,
}

/// Handle to a refill check running on its own task
///
/// Dropping it leaves the check running detached.
#[derive(Debug)]
pub struct ScheduledRefill {
    handle: JoinHandle<bool>,
}

impl ScheduledRefill {
    /// Wait for the check; `true` only if every reservation succeeded
    pub async fn wait(self) -> bool {
        match self.handle.await {
            Ok(success) => success,
            Err(e) => {
                tracing::error!("Refill task failed: {}", e);
                false
            }
        }
    }
}

pub struct RefillOrchestrator {
    catalog: Arc<Catalog>,
    directory: Arc<Directory>,
    queue: Arc<QueueStore>,
    producer: Arc<dyn EventProducer>,
    settings: RefillSettings,
    /// Serializes checks per user, separate from the queue mutation locks
    locks: UserLocks,
}

impl RefillOrchestrator {
    pub fn new(
        catalog: Arc<Catalog>,
        directory: Arc<Directory>,
        queue: Arc<QueueStore>,
        producer: Arc<dyn EventProducer>,
        settings: RefillSettings,
    ) -> Self {
        Self {
            catalog,
            directory,
            queue,
            producer,
            settings,
            locks: UserLocks::new(),
        }
    }

    /// Policy for HTTP-triggered and consumption-triggered checks
    pub fn manual_policy(&self) -> RefillPolicy {
        RefillPolicy {
            min_size: self.settings.min_size,
            max_batch: self.settings.manual_max_batch,
        }
    }

    /// Policy for checks chained after a sourcing event
    pub fn event_policy(&self) -> RefillPolicy {
        RefillPolicy {
            min_size: self.settings.min_size,
            max_batch: self.settings.event_max_batch,
        }
    }

    /// Reserve songs until the queue reaches `policy.min_size`
    ///
    /// In-flight reservations count towards the size. At most
    /// `policy.max_batch` reservations are made per call. Each reservation
    /// is independent: a failure is logged and the rest are still attempted,
    /// nothing already reserved is undone. Returns `false` if any failed.
    pub async fn ensure_minimum_size(&self, username: &str, policy: RefillPolicy) -> Result<bool> {
        let user = self.directory.get_by_username(username).await?;
        let _guard = self.locks.lock(user.id).await;

        let queued = self.queue.len(user.id).await?;
        let pending = self
            .catalog
            .pending_reservations(user.id, self.settings.reservation_ttl())
            .await?;
        let size = queued + pending;

        if size >= policy.min_size {
            tracing::debug!(username, queued, pending, "Queue is full enough");
            return Ok(true);
        }

        let needed = (policy.min_size - size).min(policy.max_batch);
        tracing::info!(username, queued, pending, needed, "Refilling queue");

        let mut failures = 0;
        for _ in 0..needed {
            match self.reserve(&user).await {
                Ok(song_id) => {
                    tracing::debug!(username, song_id = %song_id, "Requested sourcing");
                }
                Err(e) => {
                    failures += 1;
                    tracing::warn!(username, "Reservation failed: {}", e);
                }
            }
        }

        if failures > 0 {
            tracing::warn!(username, failures, needed, "Refill finished with failures");
        }

        Ok(failures == 0)
    }

    /// Placeholder, ownership link, sourcing request
    ///
    /// When the request cannot be sent the link is dropped again, so the
    /// placeholder stops counting as in flight. The orphaned placeholder is
    /// left for the startup purge.
    async fn reserve(&self, user: &User) -> Result<SongId> {
        let song_id = self.catalog.create_placeholder().await?;
        self.directory.link_song(user.id, song_id).await?;

        let request = OutboundMessage::SourcingRequest(SourcingRequest {
            song_id,
            genre: self.settings.default_genre.clone(),
        });

        if let Err(e) = self.producer.send(request).await {
            if let Err(unlink) = self.directory.unlink_song(song_id).await {
                tracing::warn!(song_id = %song_id, "Failed to release unsent reservation: {}", unlink);
            }
            return Err(e);
        }

        Ok(song_id)
    }

    /// Run a check on its own task
    pub fn schedule(self: &Arc<Self>, username: String, policy: RefillPolicy) -> ScheduledRefill {
        let orchestrator = Arc::clone(self);
        let handle = tokio::spawn(async move {
            match orchestrator.ensure_minimum_size(&username, policy).await {
                Ok(success) => success,
                Err(e) => {
                    tracing::error!(username = %username, "Refill check failed: {}", e);
                    false
                }
            }
        });

        ScheduledRefill { handle }
    }

    /// A placeholder was sourced: make it playable and queue it for its owner
    ///
    /// Returns the chained check, or `None` when the song has no owner.
    ///
    /// The owner's check lock is held from setting the url until the song is
    /// queued. In between, the song is neither pending nor queued, and a
    /// check running there would reserve for it a second time.
    pub async fn on_sourcing_completed(
        self: &Arc<Self>,
        song_id: SongId,
        file_path: &str,
    ) -> Result<Option<ScheduledRefill>> {
        let Some(owner) = self.directory.owner_of(song_id).await? else {
            self.catalog.set_playable_url(song_id, file_path).await?;
            tracing::warn!(song_id = %song_id, "Sourced song has no owner, leaving it unqueued");
            return Ok(None);
        };

        {
            let _guard = self.locks.lock(owner.id).await;
            self.catalog.set_playable_url(song_id, file_path).await?;
            self.queue.append(owner.id, song_id).await?;
        }
        tracing::info!(username = %owner.username, song_id = %song_id, "Sourced song queued");

        Ok(Some(self.schedule(owner.username, self.event_policy())))
    }

    /// Sourcing gave up on a placeholder: drop it, its ownership link and
    /// any queue entries pointing at it
    ///
    /// A failure reported for a song that is already playable is stale and
    /// ignored.
    pub async fn on_sourcing_failed(
        self: &Arc<Self>,
        song_id: SongId,
    ) -> Result<Option<ScheduledRefill>> {
        let owner = self.directory.owner_of(song_id).await?;

        match self.catalog.find_by_id(song_id).await {
            Ok(song) if song.is_playable() => {
                tracing::warn!(song_id = %song_id, "Ignoring sourcing failure for playable song");
                return Ok(None);
            }
            Ok(_) => {}
            Err(e) if e.is_not_found() => {
                tracing::debug!(song_id = %song_id, "Failed placeholder already removed");
            }
            Err(e) => return Err(e),
        }

        self.directory.unlink_song(song_id).await?;
        let dequeued = self.queue.remove_song_everywhere(song_id).await?;
        if dequeued > 0 {
            tracing::info!(song_id = %song_id, dequeued, "Removed failed placeholder from queues");
        }
        self.catalog.delete(song_id).await?;

        let Some(owner) = owner else {
            tracing::warn!(song_id = %song_id, "Sourcing failed for song with no owner");
            return Ok(None);
        };

        tracing::info!(username = %owner.username, song_id = %song_id, "Sourcing failed, placeholder removed");

        Ok(Some(self.schedule(owner.username, self.event_policy())))
    }

    /// Record a skip or a full listen, drop the entry, then top the queue up
    ///
    /// With an explicit entry id that entry is removed; otherwise the first
    /// entry for the song is.
    pub async fn on_consumed(
        self: &Arc<Self>,
        user: &User,
        song_id: SongId,
        entry_id: Option<QueueEntryId>,
        consumption: Consumption,
    ) -> Result<ScheduledRefill> {
        self.catalog.find_by_id(song_id).await?;

        match consumption {
            Consumption::Skipped => self.directory.mark_skipped(user, song_id).await?,
            Consumption::Finished => self.directory.increment_listen_count(user, song_id).await?,
        }

        match entry_id {
            Some(entry_id) => self.queue.remove_entry(user.id, entry_id).await?,
            None => {
                if self.queue.remove_first_match(user.id, song_id).await?.is_none() {
                    tracing::debug!(username = %user.username, song_id = %song_id, "Consumed song was not queued");
                }
            }
        }

        Ok(self.schedule(user.username.clone(), self.manual_policy()))
    }
}
