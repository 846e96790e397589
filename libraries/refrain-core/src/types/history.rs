/// Per-user listening history
use super::ids::{SongId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Listening history for one (user, song) pair
///
/// A row also records which user a pending placeholder was reserved for,
/// since sourcing results only carry the song id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListeningHistory {
    /// Listener
    pub user_id: UserId,
    /// Song listened to, or reserved for the listener
    pub song_id: SongId,
    /// Finished listens
    pub listen_count: i64,
    /// Set by the first finished listen and never moved after
    pub first_listen_at: Option<DateTime<Utc>>,
    /// Most recent finished listen
    pub last_listen_at: Option<DateTime<Utc>>,
    /// Liked flag
    pub liked: bool,
    /// Set once the listener skips the song
    pub skipped: bool,
}

impl ListeningHistory {
    /// A fresh entry with nothing recorded yet
    pub fn new(user_id: UserId, song_id: SongId) -> Self {
        Self {
            user_id,
            song_id,
            listen_count: 0,
            first_listen_at: None,
            last_listen_at: None,
            liked: false,
            skipped: false,
        }
    }

    /// Count one finished listen at `now`
    pub fn record_listen(&mut self, now: DateTime<Utc>) {
        self.listen_count += 1;
        if self.first_listen_at.is_none() {
            self.first_listen_at = Some(now);
        }
        self.last_listen_at = Some(now);
    }
}
