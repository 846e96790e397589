//! Refrain Storage
//!
//! `SQLite` persistence for the Refrain queue service.
//!
//! # Architecture
//!
//! - **Vertical Slicing**: each table owns its own queries (`songs`, `users`,
//!   `history`, `queue`)
//! - **Plain functions**: every operation takes a `&SqlitePool` and returns
//!   `refrain_core::Result`
//! - **Queue contiguity**: queue mutations run in one transaction that first
//!   bumps the owning queue row, then renumbers positions to `0..len`
//!
//! Per-user serialization of queue writers is the caller's job; the storage
//! layer only guarantees each call is atomic.
//!
//! # Example
//!
//! ```rust,no_run
//! use refrain_storage::{create_pool, run_migrations};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = create_pool("sqlite://refrain.db").await?;
//! run_migrations(&pool).await?;
//!
//! let user = refrain_storage::users::create(&pool, "alice", None).await?;
//! let song_id = refrain_storage::songs::create_placeholder(&pool).await?;
//! refrain_storage::queue::append(&pool, user.id, song_id).await?;
//! # Ok(())
//! # }
//! ```

// Vertical slices
pub mod history;
pub mod queue;
pub mod songs;
pub mod users;

mod time;

use sqlx::migrate::Migrator;
use sqlx::sqlite::SqlitePool;

// Embed migrations into binary
static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Run database migrations
///
/// # Errors
///
/// Returns an error if migrations fail to run
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::migrate::MigrateError> {
    MIGRATOR.run(pool).await
}

/// Create a new `SQLite` pool
///
/// # Arguments
///
/// * `database_url` - `SQLite` connection string (e.g., `<sqlite://refrain.db>`)
///
/// # Errors
///
/// Returns an error if the connection fails
pub async fn create_pool(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
    use std::str::FromStr;

    tracing::debug!(database_url, "Creating SQLite pool");

    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true)
        .busy_timeout(std::time::Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    Ok(pool)
}
