//! Segment Storage
//!
//! `SQLite` persistence for the segment membership service.
//!
//! # Architecture
//!
//! - **Vertical Slicing**: each component owns its own queries
//!   (`segments` catalog, `users` identity, `memberships` ledger)
//! - **Connection-scoped slices**: slice functions take a `SqliteConnection`
//!   so the engine can run them inside one transaction
//! - **Soft deletes**: ledger rows are closed by timestamp, never removed
//!
//! # Example
//!
//! ```rust,no_run
//! use segment_core::{MembershipEngine, MembershipUpdate, Percentage, UserId};
//! use segment_storage::{LocalMembershipEngine, PoolSettings};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let engine =
//!     LocalMembershipEngine::connect("sqlite://segments.db", &PoolSettings::default()).await?;
//!
//! engine.create_segment("beta", Percentage::new(10)?).await?;
//!
//! let user_id = UserId::try_from(42_u64)?;
//! engine
//!     .update_user_segments(MembershipUpdate::new(user_id).add("beta"))
//!     .await?;
//!
//! let active = engine.active_segments(user_id).await?;
//! # Ok(())
//! # }
//! ```

mod context;
mod error;

// Vertical slices
pub mod memberships;
pub mod segments;
pub mod users;

pub use context::LocalMembershipEngine;
pub use error::StorageError;

use chrono::{DateTime, Utc};
use segment_core::{MembershipError, Result};
use sqlx::migrate::Migrator;
use sqlx::sqlite::SqlitePool;
use std::time::Duration;

// Embed migrations into binary
static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Connection pool tuning
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolSettings {
    pub max_connections: u32,

    /// How long a connection waits on a locked database
    pub busy_timeout: Duration,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: 5,
            busy_timeout: Duration::from_secs(30),
        }
    }
}

/// Run database migrations
///
/// This should be called once when the application starts to ensure
/// the database schema is up to date.
pub async fn run_migrations(pool: &SqlitePool) -> std::result::Result<(), StorageError> {
    MIGRATOR.run(pool).await?;
    Ok(())
}

/// Create a new `SQLite` pool
///
/// # Arguments
///
/// * `database_url` - `SQLite` connection string (e.g., `<sqlite://segments.db>`)
/// * `settings` - pool size and lock timeout
pub async fn create_pool(
    database_url: &str,
    settings: &PoolSettings,
) -> std::result::Result<SqlitePool, StorageError> {
    use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
    use std::str::FromStr;

    tracing::debug!(database_url, "creating pool");

    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true)
        .busy_timeout(settings.busy_timeout);

    // Every connection to an in-memory URL opens a fresh database, so keep
    // exactly one connection alive for the lifetime of the pool.
    let pool = if is_in_memory(database_url) {
        SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?
    } else {
        SqlitePoolOptions::new()
            .max_connections(settings.max_connections)
            .connect_with(options)
            .await?
    };

    tracing::debug!("pool created");

    Ok(pool)
}

fn is_in_memory(database_url: &str) -> bool {
    database_url.contains(":memory:") || database_url.contains("mode=memory")
}

/// Encode an instant as stored unix milliseconds
pub(crate) fn encode_timestamp(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

/// Decode stored unix milliseconds
pub(crate) fn decode_timestamp(millis: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| MembershipError::storage(format!("Invalid timestamp: {millis}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_in_memory_urls() {
        assert!(is_in_memory("sqlite::memory:"));
        assert!(is_in_memory("sqlite://file.db?mode=memory&cache=shared"));
        assert!(!is_in_memory("sqlite://./data/segments.db"));
    }

    #[test]
    fn timestamps_keep_millisecond_precision() {
        let at = decode_timestamp(1_693_000_000_250).unwrap();
        assert_eq!(at.timestamp(), 1_693_000_000);
        assert_eq!(at.timestamp_subsec_millis(), 250);
        assert_eq!(encode_timestamp(at), 1_693_000_000_250);
    }

    #[tokio::test]
    async fn in_memory_pool_shares_one_database() {
        let pool = create_pool("sqlite::memory:", &PoolSettings::default())
            .await
            .expect("Failed to create pool");
        run_migrations(&pool).await.expect("Failed to run migrations");

        sqlx::query("INSERT INTO users (id, created_at) VALUES (1, 0)")
            .execute(&pool)
            .await
            .unwrap();

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }
}
