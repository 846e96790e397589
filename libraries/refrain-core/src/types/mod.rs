//! Domain records

mod history;
mod ids;
mod queue;
mod song;
mod user;

pub use history::ListeningHistory;
pub use ids::{QueueEntryId, SongId, UserId};
pub use queue::{QueueEntry, QueuedSong};
pub use song::Song;
pub use user::User;
