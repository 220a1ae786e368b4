use crate::{create_pool, memberships, run_migrations, segments, users, PoolSettings, StorageError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use segment_core::{
    HistoryEntry, HistoryPeriod, MembershipEngine, MembershipError, MembershipUpdate, Percentage,
    Result, SegmentEnrollment, UserId,
};
use sqlx::SqlitePool;

/// Membership engine backed by a local `SQLite` database
///
/// Each workflow opens its own transaction on the shared pool; nothing else
/// is kept between calls.
#[derive(Clone)]
pub struct LocalMembershipEngine {
    pool: SqlitePool,
}

impl LocalMembershipEngine {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open a pool, apply migrations and wrap it in an engine
    pub async fn connect(
        database_url: &str,
        settings: &PoolSettings,
    ) -> std::result::Result<Self, StorageError> {
        let pool = create_pool(database_url, settings).await?;
        run_migrations(&pool).await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl MembershipEngine for LocalMembershipEngine {
    async fn create_segment(
        &self,
        slug: &str,
        percentage: Percentage,
    ) -> Result<SegmentEnrollment> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let segment = segments::create(&mut tx, slug, now).await?;

        let mut enrolled = 0;
        if !percentage.is_zero() {
            let total_users = memberships::count_users(&mut tx).await?;
            let limit = percentage.enrollment_limit(total_users);

            let user_ids = memberships::sample_user_ids(&mut tx, limit as usize).await?;
            let pairs: Vec<_> = user_ids
                .into_iter()
                .map(|user_id| (user_id, segment.id))
                .collect();

            enrolled = memberships::insert(&mut tx, &pairs, now, None).await?;
        }

        tx.commit().await?;

        tracing::info!(
            slug,
            segment_id = %segment.id,
            percentage = percentage.get(),
            enrolled,
            "Segment created"
        );

        Ok(SegmentEnrollment { segment, enrolled })
    }

    async fn delete_segment(&self, slug: &str) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        segments::retire(&mut tx, slug, Utc::now()).await?;
        tx.commit().await?;

        tracing::info!(slug, "Segment deleted");
        Ok(())
    }

    async fn update_user_segments(&self, update: MembershipUpdate) -> Result<()> {
        let MembershipUpdate {
            user_id,
            add,
            remove,
            expire_at,
        } = update;
        let now = Utc::now();

        // Dropping `tx` on any early return rolls back every write below,
        // including the user registration.
        let mut tx = self.pool.begin().await?;

        users::ensure(&mut tx, user_id, now).await?;

        let mut added = 0;
        if !add.is_empty() {
            let segment_ids = segments::resolve_ids(&mut tx, &add).await?;
            if segment_ids.is_empty() {
                tracing::warn!(%user_id, slugs = ?add, "No requested segment exists");
                return Err(MembershipError::InvalidSegments(add.into_iter().collect()));
            }

            let pairs: Vec<_> = segment_ids
                .into_iter()
                .map(|segment_id| (user_id, segment_id))
                .collect();
            added = memberships::insert(&mut tx, &pairs, now, expire_at).await?;
        }

        let mut removed = 0;
        if !remove.is_empty() {
            let segment_ids = segments::resolve_ids(&mut tx, &remove).await?;
            removed = memberships::close(&mut tx, user_id, &segment_ids, now).await?;
        }

        tx.commit().await?;

        tracing::debug!(%user_id, added, removed, ?expire_at, "User segments updated");
        Ok(())
    }

    async fn active_segments_at(
        &self,
        user_id: UserId,
        at: DateTime<Utc>,
    ) -> Result<Vec<String>> {
        let mut conn = self.pool.acquire().await?;
        let slugs = memberships::active_slugs_for_user(&mut conn, user_id, at).await?;

        if slugs.is_empty() {
            return Err(MembershipError::not_found("Active segments for user", user_id));
        }

        tracing::debug!(%user_id, count = slugs.len(), "Resolved active segments");
        Ok(slugs)
    }

    async fn user_history(
        &self,
        user_id: UserId,
        period: HistoryPeriod,
    ) -> Result<Vec<HistoryEntry>> {
        let mut conn = self.pool.acquire().await?;
        let history = memberships::history_for_user(&mut conn, user_id, &period).await?;

        if history.is_empty() {
            return Err(MembershipError::not_found(
                "History for user",
                format!("{user_id} in {:04}-{:02}", period.year(), period.month()),
            ));
        }

        tracing::debug!(%user_id, count = history.len(), "Resolved membership history");
        Ok(history)
    }
}
