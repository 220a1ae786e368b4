//! Segment Core
//!
//! Platform-agnostic domain types, traits and error handling for the segment
//! membership service.
//!
//! # Architecture
//!
//! The core crate defines:
//! - **Domain Types**: `Segment`, `Membership`, `HistoryEntry`, etc.
//! - **Engine Seam**: the `MembershipEngine` trait implemented by storage backends
//! - **Error Handling**: the `MembershipError` taxonomy and `Result` alias
//!
//! # Example
//!
//! ```rust
//! use segment_core::types::{MembershipUpdate, Percentage, UserId};
//!
//! let user_id = UserId::try_from(42_u64).unwrap();
//! let update = MembershipUpdate::new(user_id)
//!     .add("beta")
//!     .remove("legacy-checkout");
//!
//! assert_eq!(Percentage::new(30).unwrap().enrollment_limit(10), 3);
//! assert!(update.add.contains("beta"));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod engine;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use engine::MembershipEngine;
pub use error::{MembershipError, Result};

pub use types::{
    HistoryEntry, HistoryPeriod, Membership, MembershipId, MembershipUpdate, Percentage, Segment,
    SegmentEnrollment, SegmentId, User, UserId,
};
