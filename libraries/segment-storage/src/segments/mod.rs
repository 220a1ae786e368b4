//! Segment catalog queries

use crate::{decode_timestamp, encode_timestamp};
use chrono::{DateTime, Utc};
use segment_core::{MembershipError, Result, Segment, SegmentId};
use sqlx::{QueryBuilder, Row, Sqlite, SqliteConnection};
use std::collections::BTreeSet;

/// Create a new live segment
///
/// Fails with `DuplicateSlug` when a live segment already uses `slug`.
pub async fn create(
    conn: &mut SqliteConnection,
    slug: &str,
    now: DateTime<Utc>,
) -> Result<Segment> {
    let created_at = encode_timestamp(now);

    let result = sqlx::query("INSERT INTO segments (slug, created_at) VALUES (?, ?)")
        .bind(slug)
        .bind(created_at)
        .execute(&mut *conn)
        .await
        .map_err(|err| match err {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                MembershipError::DuplicateSlug(slug.to_string())
            }
            other => other.into(),
        })?;

    Ok(Segment {
        id: SegmentId::from_raw(result.last_insert_rowid()),
        slug: slug.to_string(),
        created_at: decode_timestamp(created_at)?,
    })
}

/// Retire the live segment with this slug
///
/// Memberships referencing it are left in place as history.
pub async fn retire(conn: &mut SqliteConnection, slug: &str, now: DateTime<Utc>) -> Result<()> {
    let result =
        sqlx::query("UPDATE segments SET deleted_at = ? WHERE slug = ? AND deleted_at IS NULL")
            .bind(encode_timestamp(now))
            .bind(slug)
            .execute(&mut *conn)
            .await?;

    if result.rows_affected() == 0 {
        return Err(MembershipError::not_found("Segment", slug));
    }

    Ok(())
}

/// Get the live segment with this slug
pub async fn get_by_slug(conn: &mut SqliteConnection, slug: &str) -> Result<Option<Segment>> {
    let row = sqlx::query(
        "SELECT id, slug, created_at FROM segments WHERE slug = ? AND deleted_at IS NULL",
    )
    .bind(slug)
    .fetch_optional(&mut *conn)
    .await?;

    row.map(|row| {
        Ok(Segment {
            id: row.get("id"),
            slug: row.get("slug"),
            created_at: decode_timestamp(row.get("created_at"))?,
        })
    })
    .transpose()
}

/// Resolve slugs to the ids of live segments
///
/// Unknown and retired slugs are skipped, so the result may be shorter than
/// the input.
pub async fn resolve_ids(
    conn: &mut SqliteConnection,
    slugs: &BTreeSet<String>,
) -> Result<Vec<SegmentId>> {
    if slugs.is_empty() {
        return Ok(Vec::new());
    }

    let mut query: QueryBuilder<Sqlite> =
        QueryBuilder::new("SELECT id FROM segments WHERE deleted_at IS NULL AND slug IN (");
    let mut separated = query.separated(", ");
    for slug in slugs {
        separated.push_bind(slug.as_str());
    }
    separated.push_unseparated(") ORDER BY id");

    let ids = query
        .build_query_scalar::<SegmentId>()
        .fetch_all(&mut *conn)
        .await?;

    Ok(ids)
}
