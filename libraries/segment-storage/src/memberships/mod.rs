//! Membership ledger queries
//!
//! The ledger is append-only apart from `deleted_at`: rows are inserted on
//! enrollment and closed by stamping a removal time. A row is active at an
//! instant `t` when `deleted_at IS NULL OR deleted_at > t`.

use crate::{decode_timestamp, encode_timestamp};
use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use segment_core::{
    HistoryEntry, HistoryPeriod, Membership, MembershipId, Result, SegmentId, UserId,
};
use sqlx::{QueryBuilder, Row, Sqlite, SqliteConnection};

/// Rows per multi-row INSERT, kept well under `SQLite`'s bind limit
const INSERT_CHUNK_ROWS: usize = 200;

/// Total number of known users
pub async fn count_users(conn: &mut SqliteConnection) -> Result<u64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(&mut *conn)
        .await?;

    Ok(count as u64)
}

/// Draw up to `limit` distinct user ids uniformly at random
///
/// The id set is read through `conn`, so inside a transaction the sample
/// comes from the same snapshot as a preceding `count_users`.
pub async fn sample_user_ids(conn: &mut SqliteConnection, limit: usize) -> Result<Vec<UserId>> {
    if limit == 0 {
        return Ok(Vec::new());
    }

    let ids: Vec<UserId> = sqlx::query_scalar("SELECT id FROM users")
        .fetch_all(&mut *conn)
        .await?;

    Ok(choose_distinct(&ids, limit, &mut rand::thread_rng()))
}

/// Uniform sample without replacement (partial Fisher-Yates)
///
/// Returns `min(limit, ids.len())` entries.
pub fn choose_distinct<R: Rng + ?Sized>(ids: &[UserId], limit: usize, rng: &mut R) -> Vec<UserId> {
    ids.choose_multiple(rng, limit).copied().collect()
}

/// Bulk-insert ledger rows
///
/// Every row gets `created_at`; when `deleted_at` is given, every row is
/// pre-closed at that instant. Returns the number of inserted rows.
pub async fn insert(
    conn: &mut SqliteConnection,
    pairs: &[(UserId, SegmentId)],
    created_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
) -> Result<u64> {
    let created_at = encode_timestamp(created_at);
    let deleted_at = deleted_at.map(encode_timestamp);
    let mut inserted = 0;

    for chunk in pairs.chunks(INSERT_CHUNK_ROWS) {
        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(
            "INSERT INTO users_segments (user_id, segment_id, created_at, deleted_at) ",
        );
        query.push_values(chunk, |mut row, (user_id, segment_id)| {
            row.push_bind(*user_id)
                .push_bind(*segment_id)
                .push_bind(created_at)
                .push_bind(deleted_at);
        });

        inserted += query.build().execute(&mut *conn).await?.rows_affected();
    }

    Ok(inserted)
}

/// Close the user's memberships in `segment_ids` that are active at `at`
///
/// Rows already closed at or before `at` keep their original `deleted_at`,
/// so repeating a removal changes nothing. Returns the number of rows closed.
pub async fn close(
    conn: &mut SqliteConnection,
    user_id: UserId,
    segment_ids: &[SegmentId],
    at: DateTime<Utc>,
) -> Result<u64> {
    if segment_ids.is_empty() {
        return Ok(0);
    }

    let at = encode_timestamp(at);
    let mut query: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE users_segments SET deleted_at = ");
    query
        .push_bind(at)
        .push(" WHERE user_id = ")
        .push_bind(user_id)
        .push(" AND (deleted_at IS NULL OR deleted_at > ")
        .push_bind(at)
        .push(") AND segment_id IN (");

    let mut separated = query.separated(", ");
    for segment_id in segment_ids {
        separated.push_bind(*segment_id);
    }
    separated.push_unseparated(")");

    let result = query.build().execute(&mut *conn).await?;

    Ok(result.rows_affected())
}

/// Slugs of live segments the user is actively enrolled in at `at`
///
/// Sorted ascending and deduplicated. An empty result is not an error here.
pub async fn active_slugs_for_user(
    conn: &mut SqliteConnection,
    user_id: UserId,
    at: DateTime<Utc>,
) -> Result<Vec<String>> {
    let slugs = sqlx::query_scalar(
        r#"
        SELECT DISTINCT s.slug
        FROM users_segments us
        INNER JOIN segments s ON s.id = us.segment_id
        WHERE us.user_id = ?
          AND s.deleted_at IS NULL
          AND (us.deleted_at IS NULL OR us.deleted_at > ?)
        ORDER BY s.slug
        "#,
    )
    .bind(user_id)
    .bind(encode_timestamp(at))
    .fetch_all(&mut *conn)
    .await?;

    Ok(slugs)
}

/// Every ledger row for the user created within `period`
///
/// Includes closed and expired rows and rows of retired segments, oldest
/// first.
pub async fn history_for_user(
    conn: &mut SqliteConnection,
    user_id: UserId,
    period: &HistoryPeriod,
) -> Result<Vec<HistoryEntry>> {
    let rows = sqlx::query(
        r#"
        SELECT s.slug, us.created_at, us.deleted_at
        FROM users_segments us
        INNER JOIN segments s ON s.id = us.segment_id
        WHERE us.user_id = ?
          AND us.created_at >= ?
          AND us.created_at < ?
        ORDER BY us.created_at, us.id
        "#,
    )
    .bind(user_id)
    .bind(encode_timestamp(period.start()))
    .bind(encode_timestamp(period.end()))
    .fetch_all(&mut *conn)
    .await?;

    rows.iter()
        .map(|row| {
            Ok(HistoryEntry {
                slug: row.get("slug"),
                created_at: decode_timestamp(row.get("created_at"))?,
                deleted_at: row
                    .get::<Option<i64>, _>("deleted_at")
                    .map(decode_timestamp)
                    .transpose()?,
            })
        })
        .collect()
}

/// Every ledger row for the user, in insertion order
pub async fn list_for_user(conn: &mut SqliteConnection, user_id: UserId) -> Result<Vec<Membership>> {
    let rows = sqlx::query(
        r#"
        SELECT id, user_id, segment_id, created_at, deleted_at
        FROM users_segments
        WHERE user_id = ?
        ORDER BY id
        "#,
    )
    .bind(user_id)
    .fetch_all(&mut *conn)
    .await?;

    rows.iter()
        .map(|row| {
            Ok(Membership {
                id: row.get::<MembershipId, _>("id"),
                user_id: row.get("user_id"),
                segment_id: row.get("segment_id"),
                created_at: decode_timestamp(row.get("created_at"))?,
                deleted_at: row
                    .get::<Option<i64>, _>("deleted_at")
                    .map(decode_timestamp)
                    .transpose()?,
            })
        })
        .collect()
}
