//! Membership engine seam
//!
//! The HTTP boundary and the CLI talk to the engine only through this trait,
//! so the storage backend is injected rather than reached through globals.

use crate::error::Result;
use crate::types::{
    HistoryEntry, HistoryPeriod, MembershipUpdate, Percentage, SegmentEnrollment, UserId,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Transactional segment membership workflows
///
/// Every method runs as one atomic unit: it either fully commits or leaves
/// the datastore untouched.
#[async_trait]
pub trait MembershipEngine: Send + Sync {
    /// Create a segment and enroll a random `percentage` of all known users
    ///
    /// Fails with `DuplicateSlug` if a live segment already uses `slug`.
    async fn create_segment(&self, slug: &str, percentage: Percentage)
        -> Result<SegmentEnrollment>;

    /// Retire a segment by slug
    ///
    /// Fails with `NotFound` if no live segment has that slug. Existing
    /// memberships stay in the ledger as history.
    async fn delete_segment(&self, slug: &str) -> Result<()>;

    /// Apply adds and removes for a single user
    ///
    /// Fails with `InvalidSegments` when a non-empty add set resolves to no
    /// live segment at all.
    async fn update_user_segments(&self, update: MembershipUpdate) -> Result<()>;

    /// Slugs of the user's active segments as of `at`, ascending
    ///
    /// Fails with `NotFound` when the user has none.
    async fn active_segments_at(&self, user_id: UserId, at: DateTime<Utc>)
        -> Result<Vec<String>>;

    /// Slugs of the user's currently active segments, ascending
    async fn active_segments(&self, user_id: UserId) -> Result<Vec<String>> {
        self.active_segments_at(user_id, Utc::now()).await
    }

    /// Every membership the user gained during `period`, oldest first
    ///
    /// Fails with `NotFound` when the period holds no entries.
    async fn user_history(&self, user_id: UserId, period: HistoryPeriod)
        -> Result<Vec<HistoryEntry>>;
}
