//! User directory queries

use crate::time::{from_unix, now};
use refrain_core::{types::*, RefrainError, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

fn user_from_row(row: &SqliteRow) -> Result<User> {
    Ok(User {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        external_id: row.try_get("external_id")?,
        created_at: from_unix(row.try_get("created_at")?),
    })
}

/// Create a user together with their empty queue
///
/// Both rows are written in one transaction. A taken username or external
/// id fails with `Conflict`.
pub async fn create(
    pool: &SqlitePool,
    username: &str,
    external_id: Option<&str>,
) -> Result<User> {
    let id = UserId::generate();
    let created_at = now();

    let mut tx = pool.begin().await?;

    sqlx::query("INSERT INTO users (id, username, external_id, created_at) VALUES (?, ?, ?, ?)")
        .bind(id)
        .bind(username)
        .bind(external_id)
        .bind(created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                RefrainError::Conflict(format!("user already exists: {username}"))
            }
            other => other.into(),
        })?;

    sqlx::query("INSERT INTO queues (user_id, created_at) VALUES (?, ?)")
        .bind(id)
        .bind(created_at)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(User {
        id,
        username: username.to_string(),
        external_id: external_id.map(str::to_string),
        created_at: from_unix(created_at),
    })
}

/// Get user by ID
pub async fn find_by_id(pool: &SqlitePool, id: UserId) -> Result<Option<User>> {
    let row = sqlx::query("SELECT id, username, external_id, created_at FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(user_from_row).transpose()
}

/// Get user by username
pub async fn find_by_username(pool: &SqlitePool, username: &str) -> Result<Option<User>> {
    let row = sqlx::query(
        "SELECT id, username, external_id, created_at FROM users WHERE username = ?",
    )
    .bind(username)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(user_from_row).transpose()
}

/// Get user by upstream identity
pub async fn find_by_external_id(pool: &SqlitePool, external_id: &str) -> Result<Option<User>> {
    let row = sqlx::query(
        "SELECT id, username, external_id, created_at FROM users WHERE external_id = ?",
    )
    .bind(external_id)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(user_from_row).transpose()
}

/// Attach an upstream identity to a user that has none yet
///
/// Returns false when the user already carries an external id.
pub async fn attach_external_id(pool: &SqlitePool, id: UserId, external_id: &str) -> Result<bool> {
    let result =
        sqlx::query("UPDATE users SET external_id = ? WHERE id = ? AND external_id IS NULL")
            .bind(external_id)
            .bind(id)
            .execute(pool)
            .await?;

    Ok(result.rows_affected() > 0)
}

/// Get all users
pub async fn get_all(pool: &SqlitePool) -> Result<Vec<User>> {
    let rows =
        sqlx::query("SELECT id, username, external_id, created_at FROM users ORDER BY username")
            .fetch_all(pool)
            .await?;

    rows.iter().map(user_from_row).collect()
}

/// Number of users
pub async fn count(pool: &SqlitePool) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) AS total FROM users")
        .fetch_one(pool)
        .await?;

    Ok(row.try_get("total")?)
}
