//! Membership ledger types
use super::ids::{MembershipId, SegmentId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One interval of a user's association with a segment
///
/// Rows are never physically removed. Closing a membership stamps
/// `deleted_at`, which may also be scheduled in the future.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    /// Ledger row identifier
    pub id: MembershipId,

    /// Member of the segment
    pub user_id: UserId,

    /// Segment the user belongs to
    pub segment_id: SegmentId,

    /// Enrollment time
    pub created_at: DateTime<Utc>,

    /// Removal or scheduled expiration time
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Membership {
    /// Whether the membership counts as active at `at`
    ///
    /// Same rule the ledger queries apply in SQL: open-ended, or closing
    /// strictly after `at`.
    pub fn is_active_at(&self, at: DateTime<Utc>) -> bool {
        self.deleted_at.map_or(true, |deleted_at| deleted_at > at)
    }
}

/// A single add/remove request for one user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MembershipUpdate {
    /// User whose memberships change
    pub user_id: UserId,

    /// Slugs to enroll the user into
    pub add: BTreeSet<String>,

    /// Slugs to remove the user from
    pub remove: BTreeSet<String>,

    /// Scheduled expiration for the newly added memberships
    pub expire_at: Option<DateTime<Utc>>,
}

impl MembershipUpdate {
    /// Empty update for `user_id`
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            add: BTreeSet::new(),
            remove: BTreeSet::new(),
            expire_at: None,
        }
    }

    /// Enroll into `slug`
    #[must_use]
    pub fn add(mut self, slug: impl Into<String>) -> Self {
        self.add.insert(slug.into());
        self
    }

    /// Remove from `slug`
    #[must_use]
    pub fn remove(mut self, slug: impl Into<String>) -> Self {
        self.remove.insert(slug.into());
        self
    }

    /// Schedule expiry of the added memberships
    #[must_use]
    pub fn expire_at(mut self, at: DateTime<Utc>) -> Self {
        self.expire_at = Some(at);
        self
    }
}
