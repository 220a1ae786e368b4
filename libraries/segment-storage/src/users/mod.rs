//! User identity queries

use crate::{decode_timestamp, encode_timestamp};
use chrono::{DateTime, Utc};
use segment_core::{Result, User, UserId};
use sqlx::{Row, SqliteConnection};

/// Register the user if it is not known yet
///
/// Idempotent: an existing row keeps its original `created_at`.
pub async fn ensure(conn: &mut SqliteConnection, user_id: UserId, now: DateTime<Utc>) -> Result<()> {
    sqlx::query("INSERT INTO users (id, created_at) VALUES (?, ?) ON CONFLICT(id) DO NOTHING")
        .bind(user_id)
        .bind(encode_timestamp(now))
        .execute(&mut *conn)
        .await?;

    Ok(())
}

/// Get a user by ID
pub async fn get_by_id(conn: &mut SqliteConnection, user_id: UserId) -> Result<Option<User>> {
    let row = sqlx::query("SELECT id, created_at FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_optional(&mut *conn)
        .await?;

    row.map(|row| {
        Ok(User {
            id: row.get("id"),
            created_at: decode_timestamp(row.get("created_at"))?,
        })
    })
    .transpose()
}
