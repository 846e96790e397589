//! Listening history queries
//!
//! Every mutator is a single upsert, so concurrent actions on the same
//! (user, song) pair never lose an update.

use crate::time::{from_unix, to_unix};
use chrono::{DateTime, Utc};
use refrain_core::{types::*, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

fn history_from_row(row: &SqliteRow) -> Result<ListeningHistory> {
    Ok(ListeningHistory {
        user_id: row.try_get("user_id")?,
        song_id: row.try_get("song_id")?,
        listen_count: row.try_get("listen_count")?,
        first_listen_at: row.try_get::<Option<i64>, _>("first_listen_at")?.map(from_unix),
        last_listen_at: row.try_get::<Option<i64>, _>("last_listen_at")?.map(from_unix),
        liked: row.try_get::<i64, _>("liked")? != 0,
        skipped: row.try_get::<i64, _>("skipped")? != 0,
    })
}

/// Get the history entry for a pair
pub async fn get(
    pool: &SqlitePool,
    user_id: UserId,
    song_id: SongId,
) -> Result<Option<ListeningHistory>> {
    let row = sqlx::query(
        r#"
        SELECT user_id, song_id, listen_count, first_listen_at, last_listen_at, liked, skipped
        FROM listening_history
        WHERE user_id = ? AND song_id = ?
        "#,
    )
    .bind(user_id)
    .bind(song_id)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(history_from_row).transpose()
}

/// Create an empty entry if none exists
///
/// Used to record which user a placeholder was reserved for.
pub async fn link(pool: &SqlitePool, user_id: UserId, song_id: SongId) -> Result<()> {
    sqlx::query(
        "INSERT INTO listening_history (user_id, song_id) VALUES (?, ?) ON CONFLICT DO NOTHING",
    )
    .bind(user_id)
    .bind(song_id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Mark a song skipped
pub async fn mark_skipped(pool: &SqlitePool, user_id: UserId, song_id: SongId) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO listening_history (user_id, song_id, skipped)
        VALUES (?, ?, 1)
        ON CONFLICT(user_id, song_id) DO UPDATE SET skipped = 1
        "#,
    )
    .bind(user_id)
    .bind(song_id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Set or clear the liked flag
pub async fn set_liked(
    pool: &SqlitePool,
    user_id: UserId,
    song_id: SongId,
    liked: bool,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO listening_history (user_id, song_id, liked)
        VALUES (?, ?, ?)
        ON CONFLICT(user_id, song_id) DO UPDATE SET liked = excluded.liked
        "#,
    )
    .bind(user_id)
    .bind(song_id)
    .bind(i64::from(liked))
    .execute(pool)
    .await?;

    Ok(())
}

/// Count one finished listen at `at`
///
/// The first call sets `first_listen_at`; every call refreshes
/// `last_listen_at`.
pub async fn record_listen(
    pool: &SqlitePool,
    user_id: UserId,
    song_id: SongId,
    at: DateTime<Utc>,
) -> Result<()> {
    let at = to_unix(at);

    sqlx::query(
        r#"
        INSERT INTO listening_history (user_id, song_id, listen_count, first_listen_at, last_listen_at)
        VALUES (?, ?, 1, ?, ?)
        ON CONFLICT(user_id, song_id) DO UPDATE SET
            listen_count = listen_count + 1,
            first_listen_at = COALESCE(first_listen_at, excluded.first_listen_at),
            last_listen_at = excluded.last_listen_at
        "#,
    )
    .bind(user_id)
    .bind(song_id)
    .bind(at)
    .bind(at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Liked flag, false when no entry exists
pub async fn is_liked(pool: &SqlitePool, user_id: UserId, song_id: SongId) -> Result<bool> {
    let liked: Option<i64> =
        sqlx::query_scalar("SELECT liked FROM listening_history WHERE user_id = ? AND song_id = ?")
            .bind(user_id)
            .bind(song_id)
            .fetch_optional(pool)
            .await?;

    Ok(liked.is_some_and(|l| l != 0))
}

/// The user a song belongs to
///
/// When several users are linked, the earliest link wins.
pub async fn find_owner(pool: &SqlitePool, song_id: SongId) -> Result<Option<UserId>> {
    let owner = sqlx::query_scalar(
        r#"
        SELECT user_id FROM listening_history
        WHERE song_id = ?
        ORDER BY created_at, rowid
        LIMIT 1
        "#,
    )
    .bind(song_id)
    .fetch_optional(pool)
    .await?;

    Ok(owner)
}

/// Remove every entry for a song
pub async fn delete_for_song(pool: &SqlitePool, song_id: SongId) -> Result<u64> {
    let result = sqlx::query("DELETE FROM listening_history WHERE song_id = ?")
        .bind(song_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}

/// Songs linked to a user, oldest link first
pub async fn songs_for_user(pool: &SqlitePool, user_id: UserId) -> Result<Vec<SongId>> {
    let ids = sqlx::query_scalar(
        "SELECT song_id FROM listening_history WHERE user_id = ? ORDER BY created_at, rowid",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(ids)
}
