/// Song catalog types
use super::ids::SongId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A catalog song
///
/// A song with no `url` is a pending placeholder: it was reserved by a
/// refill and its audio file has not been sourced yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Song {
    /// Song id
    pub id: SongId,
    /// Title, once metadata is known
    pub title: Option<String>,
    /// Artist, once metadata is known
    pub artist: Option<String>,
    /// Album name
    pub album: Option<String>,
    /// Genre label
    pub genre: Option<String>,
    /// Duration in milliseconds
    pub duration_ms: Option<i64>,
    /// Playable location of the audio file
    pub url: Option<String>,
    /// When the row was created
    pub created_at: DateTime<Utc>,
}

impl Song {
    /// Create an empty placeholder with only an id
    pub fn placeholder(id: SongId) -> Self {
        Self {
            id,
            title: None,
            artist: None,
            album: None,
            genre: None,
            duration_ms: None,
            url: None,
            created_at: Utc::now(),
        }
    }

    /// A song is playable once its url is set and non-empty
    pub fn is_playable(&self) -> bool {
        self.url.as_deref().is_some_and(|url| !url.trim().is_empty())
    }
}
