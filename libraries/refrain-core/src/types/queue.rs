/// Queue entry types
use super::ids::{QueueEntryId, SongId, UserId};
use super::song::Song;
use serde::{Deserialize, Serialize};

/// One slot in a user's queue
///
/// Positions within a queue are always the contiguous range `0..len`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueEntry {
    /// Entry id; a song queued twice has two
    pub id: QueueEntryId,
    /// Queue owner
    pub user_id: UserId,
    /// Queued song
    pub song_id: SongId,
    /// Zero-based slot
    pub position: i64,
}

/// A queue entry joined with its song, as returned to clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedSong {
    /// Entry id, used to consume this exact slot
    pub queue_entry_id: QueueEntryId,
    /// Zero-based slot
    pub position: i64,
    /// The song, flattened into the same object
    #[serde(flatten)]
    pub song: Song,
}
