//! Segment catalog types
use super::ids::SegmentId;
use crate::error::{MembershipError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A named cohort users can belong to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    /// Datastore-assigned identifier
    pub id: SegmentId,

    /// Unique human-readable name
    pub slug: String,

    /// When the segment was created
    pub created_at: DateTime<Utc>,
}

/// Share of known users to enroll when a segment is created
///
/// Guaranteed to lie in `0..=100`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Percentage(u8);

impl Percentage {
    /// No automatic enrollment
    pub const ZERO: Self = Self(0);

    /// Validate a raw percentage
    pub fn new(value: u32) -> Result<Self> {
        u8::try_from(value)
            .ok()
            .filter(|v| *v <= 100)
            .map(Self)
            .ok_or_else(|| {
                MembershipError::invalid_input(format!(
                    "percentage must be between 0 and 100, got {value}"
                ))
            })
    }

    /// Get the inner value
    pub fn get(self) -> u8 {
        self.0
    }

    /// Whether creation skips enrollment entirely
    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Number of users to enroll out of `total_users`, rounded down
    pub fn enrollment_limit(self, total_users: u64) -> u64 {
        (u128::from(total_users) * u128::from(self.0) / 100) as u64
    }
}

/// Outcome of creating a segment with random enrollment
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SegmentEnrollment {
    /// The newly created segment
    pub segment: Segment,

    /// How many users were enrolled into the new segment
    pub enrolled: u64,
}
