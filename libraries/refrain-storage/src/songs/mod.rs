//! Song catalog queries
//!
//! A song whose url is NULL or empty is a pending placeholder.

use crate::time::{from_unix, now, to_unix};
use chrono::{DateTime, Utc};
use refrain_core::{types::*, RefrainError, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

const SONG_COLUMNS: &str =
    "id, title, artist, album, genre, duration_ms, url, created_at";

pub(crate) fn song_from_row(row: &SqliteRow) -> Result<Song> {
    Ok(Song {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        artist: row.try_get("artist")?,
        album: row.try_get("album")?,
        genre: row.try_get("genre")?,
        duration_ms: row.try_get("duration_ms")?,
        url: row.try_get("url")?,
        created_at: from_unix(row.try_get("created_at")?),
    })
}

/// Persist an empty placeholder and return its id
pub async fn create_placeholder(pool: &SqlitePool) -> Result<SongId> {
    let id = SongId::generate();

    sqlx::query("INSERT INTO songs (id, created_at) VALUES (?, ?)")
        .bind(id)
        .bind(now())
        .execute(pool)
        .await?;

    Ok(id)
}

/// Insert a fully described song
pub async fn insert(pool: &SqlitePool, song: &Song) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO songs (id, title, artist, album, genre, duration_ms, url, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(song.id)
    .bind(&song.title)
    .bind(&song.artist)
    .bind(&song.album)
    .bind(&song.genre)
    .bind(song.duration_ms)
    .bind(&song.url)
    .bind(to_unix(song.created_at))
    .execute(pool)
    .await?;

    Ok(())
}

/// Get song by ID
pub async fn find_by_id(pool: &SqlitePool, id: SongId) -> Result<Option<Song>> {
    let row = sqlx::query(&format!("SELECT {SONG_COLUMNS} FROM songs WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(song_from_row).transpose()
}

/// Set the playable url
///
/// Re-setting the same url succeeds and changes nothing observable.
pub async fn set_url(pool: &SqlitePool, id: SongId, url: &str) -> Result<()> {
    let result = sqlx::query("UPDATE songs SET url = ? WHERE id = ?")
        .bind(url)
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(RefrainError::not_found("Song", id));
    }

    Ok(())
}

/// Set title and artist
pub async fn set_metadata(
    pool: &SqlitePool,
    id: SongId,
    title: Option<&str>,
    artist: Option<&str>,
) -> Result<()> {
    let result = sqlx::query("UPDATE songs SET title = ?, artist = ? WHERE id = ?")
        .bind(title)
        .bind(artist)
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(RefrainError::not_found("Song", id));
    }

    Ok(())
}

/// Delete a song
///
/// Returns whether a row was removed. Deleting an unknown id is not an error.
/// Fails if the song is still referenced by a queue entry.
pub async fn delete(pool: &SqlitePool, id: SongId) -> Result<bool> {
    let result = sqlx::query("DELETE FROM songs WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Songs with no playable url
pub async fn list_invalid(pool: &SqlitePool) -> Result<Vec<Song>> {
    let rows = sqlx::query(&format!(
        "SELECT {SONG_COLUMNS} FROM songs WHERE url IS NULL OR url = '' ORDER BY created_at"
    ))
    .fetch_all(pool)
    .await?;

    rows.iter().map(song_from_row).collect()
}

/// Songs with a playable url
pub async fn list_playable(pool: &SqlitePool) -> Result<Vec<Song>> {
    let rows = sqlx::query(&format!(
        "SELECT {SONG_COLUMNS} FROM songs WHERE url IS NOT NULL AND url != '' ORDER BY created_at"
    ))
    .fetch_all(pool)
    .await?;

    rows.iter().map(song_from_row).collect()
}

/// Count placeholders reserved for `user_id` since `since`
///
/// A reservation is a url-less song linked to the user in listening history.
pub async fn count_pending_for_user(
    pool: &SqlitePool,
    user_id: UserId,
    since: DateTime<Utc>,
) -> Result<i64> {
    let row = sqlx::query(
        r#"
        SELECT COUNT(*) AS pending
        FROM songs s
        INNER JOIN listening_history h ON h.song_id = s.id
        WHERE h.user_id = ?
          AND (s.url IS NULL OR s.url = '')
          AND s.created_at >= ?
        "#,
    )
    .bind(user_id)
    .bind(to_unix(since))
    .fetch_one(pool)
    .await?;

    Ok(row.try_get("pending")?)
}
