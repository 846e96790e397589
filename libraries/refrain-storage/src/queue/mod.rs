//! Per-user queue queries
//!
//! Positions in a queue always form `0..len`. Every mutation runs in one
//! transaction that starts by bumping the queue's `revision`, which takes the
//! database write lock before anything is read, and ends by renumbering.

use crate::songs::song_from_row;
use crate::time::now;
use refrain_core::{types::*, RefrainError, Result};
use sqlx::sqlite::{SqliteConnection, SqliteRow};
use sqlx::{Row, SqlitePool};

fn entry_from_row(row: &SqliteRow) -> Result<QueueEntry> {
    Ok(QueueEntry {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        song_id: row.try_get("song_id")?,
        position: row.try_get("position")?,
    })
}

/// Take the queue's write lock inside the current transaction
async fn lock_queue(conn: &mut SqliteConnection, user_id: UserId) -> Result<()> {
    let result = sqlx::query("UPDATE queues SET revision = revision + 1 WHERE user_id = ?")
        .bind(user_id)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(RefrainError::not_found("Queue", user_id));
    }

    Ok(())
}

async fn len_in(conn: &mut SqliteConnection, user_id: UserId) -> Result<i64> {
    let len = sqlx::query_scalar("SELECT COUNT(*) FROM queue_entries WHERE user_id = ?")
        .bind(user_id)
        .fetch_one(&mut *conn)
        .await?;

    Ok(len)
}

/// Close gaps left by deletions
async fn renumber(conn: &mut SqliteConnection, user_id: UserId) -> Result<()> {
    let current: Vec<(QueueEntryId, i64)> = sqlx::query_as(
        "SELECT id, position FROM queue_entries WHERE user_id = ? ORDER BY position, rowid",
    )
    .bind(user_id)
    .fetch_all(&mut *conn)
    .await?;

    for (index, (entry_id, position)) in current.into_iter().enumerate() {
        let index = index as i64;
        if position == index {
            continue;
        }

        sqlx::query("UPDATE queue_entries SET position = ? WHERE id = ?")
            .bind(index)
            .bind(entry_id)
            .execute(&mut *conn)
            .await?;
    }

    Ok(())
}

async fn insert_entry(
    conn: &mut SqliteConnection,
    user_id: UserId,
    song_id: SongId,
    position: i64,
) -> Result<QueueEntry> {
    let id = QueueEntryId::generate();

    sqlx::query(
        "INSERT INTO queue_entries (id, user_id, song_id, position, created_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(id)
    .bind(user_id)
    .bind(song_id)
    .bind(position)
    .bind(now())
    .execute(&mut *conn)
    .await?;

    Ok(QueueEntry {
        id,
        user_id,
        song_id,
        position,
    })
}

/// Create the queue row if it is missing
///
/// Returns true when a queue was created.
pub async fn ensure(pool: &SqlitePool, user_id: UserId) -> Result<bool> {
    let result = sqlx::query(
        "INSERT INTO queues (user_id, created_at) VALUES (?, ?) ON CONFLICT(user_id) DO NOTHING",
    )
    .bind(user_id)
    .bind(now())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Number of queues owned by a user (0 or 1)
pub async fn count_for_user(pool: &SqlitePool, user_id: UserId) -> Result<i64> {
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM queues WHERE user_id = ?")
        .bind(user_id)
        .fetch_one(pool)
        .await?;

    Ok(count)
}

/// Current number of entries
pub async fn len(pool: &SqlitePool, user_id: UserId) -> Result<i64> {
    let mut conn = pool.acquire().await?;
    len_in(&mut conn, user_id).await
}

/// Entries in position order
pub async fn entries(pool: &SqlitePool, user_id: UserId) -> Result<Vec<QueueEntry>> {
    let rows = sqlx::query(
        "SELECT id, user_id, song_id, position FROM queue_entries WHERE user_id = ? ORDER BY position",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    rows.iter().map(entry_from_row).collect()
}

/// Entries joined with their songs, in position order
pub async fn songs(pool: &SqlitePool, user_id: UserId) -> Result<Vec<QueuedSong>> {
    let rows = sqlx::query(
        r#"
        SELECT
            qe.id AS queue_entry_id, qe.position,
            s.id, s.title, s.artist, s.album, s.genre, s.duration_ms, s.url, s.created_at
        FROM queue_entries qe
        INNER JOIN songs s ON s.id = qe.song_id
        WHERE qe.user_id = ?
        ORDER BY qe.position
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| {
            Ok(QueuedSong {
                queue_entry_id: row.try_get("queue_entry_id")?,
                position: row.try_get("position")?,
                song: song_from_row(row)?,
            })
        })
        .collect()
}

/// Append a song at the end
///
/// Returns `None` without touching the queue when the song is already
/// present, so duplicate deliveries collapse into one entry.
pub async fn append(
    pool: &SqlitePool,
    user_id: UserId,
    song_id: SongId,
) -> Result<Option<QueueEntry>> {
    let mut tx = pool.begin().await?;
    lock_queue(&mut tx, user_id).await?;

    let present: Option<i64> = sqlx::query_scalar(
        "SELECT 1 FROM queue_entries WHERE user_id = ? AND song_id = ? LIMIT 1",
    )
    .bind(user_id)
    .bind(song_id)
    .fetch_optional(&mut *tx)
    .await?;

    if present.is_some() {
        tx.rollback().await?;
        return Ok(None);
    }

    let position = len_in(&mut tx, user_id).await?;
    let entry = insert_entry(&mut tx, user_id, song_id, position).await?;

    tx.commit().await?;

    Ok(Some(entry))
}

/// Insert a song at `position`, shifting later entries down
///
/// `position` must lie in `0..=len`. The same song may already be queued.
pub async fn insert_at(
    pool: &SqlitePool,
    user_id: UserId,
    song_id: SongId,
    position: i64,
) -> Result<QueueEntry> {
    let mut tx = pool.begin().await?;
    lock_queue(&mut tx, user_id).await?;

    let len = len_in(&mut tx, user_id).await?;
    if !(0..=len).contains(&position) {
        return Err(RefrainError::invalid_argument(format!(
            "position {position} outside 0..={len}"
        )));
    }

    sqlx::query(
        "UPDATE queue_entries SET position = position + 1 WHERE user_id = ? AND position >= ?",
    )
    .bind(user_id)
    .bind(position)
    .execute(&mut *tx)
    .await?;

    let entry = insert_entry(&mut tx, user_id, song_id, position).await?;

    tx.commit().await?;

    Ok(entry)
}

/// Remove the first entry (by position) that references `song_id`
///
/// Returns the removed entry id, or `None` when the song was not queued.
pub async fn remove_first_match(
    pool: &SqlitePool,
    user_id: UserId,
    song_id: SongId,
) -> Result<Option<QueueEntryId>> {
    let mut tx = pool.begin().await?;
    lock_queue(&mut tx, user_id).await?;

    let entry_id: Option<QueueEntryId> = sqlx::query_scalar(
        r#"
        SELECT id FROM queue_entries
        WHERE user_id = ? AND song_id = ?
        ORDER BY position
        LIMIT 1
        "#,
    )
    .bind(user_id)
    .bind(song_id)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(entry_id) = entry_id else {
        tx.rollback().await?;
        return Ok(None);
    };

    sqlx::query("DELETE FROM queue_entries WHERE id = ?")
        .bind(entry_id)
        .execute(&mut *tx)
        .await?;

    renumber(&mut tx, user_id).await?;
    tx.commit().await?;

    Ok(Some(entry_id))
}

/// Remove one specific entry
///
/// Fails with `NotFound` if the entry is not in this user's queue.
pub async fn remove_entry(pool: &SqlitePool, user_id: UserId, entry_id: QueueEntryId) -> Result<()> {
    let mut tx = pool.begin().await?;
    lock_queue(&mut tx, user_id).await?;

    let result = sqlx::query("DELETE FROM queue_entries WHERE id = ? AND user_id = ?")
        .bind(entry_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

    if result.rows_affected() == 0 {
        return Err(RefrainError::not_found("QueueEntry", entry_id));
    }

    renumber(&mut tx, user_id).await?;
    tx.commit().await?;

    Ok(())
}

/// Remove every entry for `song_id` from one user's queue
pub async fn remove_song(pool: &SqlitePool, user_id: UserId, song_id: SongId) -> Result<u64> {
    let mut tx = pool.begin().await?;
    lock_queue(&mut tx, user_id).await?;

    let result = sqlx::query("DELETE FROM queue_entries WHERE user_id = ? AND song_id = ?")
        .bind(user_id)
        .bind(song_id)
        .execute(&mut *tx)
        .await?;

    if result.rows_affected() > 0 {
        renumber(&mut tx, user_id).await?;
    }
    tx.commit().await?;

    Ok(result.rows_affected())
}

/// Users whose queue references `song_id`
pub async fn holders(pool: &SqlitePool, song_id: SongId) -> Result<Vec<UserId>> {
    let users = sqlx::query_scalar(
        "SELECT DISTINCT user_id FROM queue_entries WHERE song_id = ? ORDER BY user_id",
    )
    .bind(song_id)
    .fetch_all(pool)
    .await?;

    Ok(users)
}
