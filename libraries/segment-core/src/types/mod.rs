//! Domain types for segments, users and the membership ledger

mod history;
mod ids;
mod membership;
mod segment;
mod user;

pub use history::{HistoryEntry, HistoryPeriod, MAX_HISTORY_YEAR, MIN_HISTORY_YEAR};
pub use ids::{MembershipId, SegmentId, UserId};
pub use membership::{Membership, MembershipUpdate};
pub use segment::{Percentage, Segment, SegmentEnrollment};
pub use user::User;
