//! Core error types for the segment service
use thiserror::Error;

/// Result type alias using `MembershipError`
pub type Result<T> = std::result::Result<T, MembershipError>;

/// Error taxonomy shared by the engine and its boundaries
#[derive(Error, Debug)]
pub enum MembershipError {
    /// No matching segment, membership or history
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of thing that was looked up
        entity: String,
        /// Key it was looked up by
        id: String,
    },

    /// A live segment already uses this slug
    #[error("Segment already exists: {0}")]
    DuplicateSlug(String),

    /// None of the requested slugs resolved to a live segment
    #[error("Invalid segments: {}", .0.join(", "))]
    InvalidSegments(Vec<String>),

    /// A value rejected while constructing a domain type
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Any failure of the underlying datastore
    #[error("Storage error: {0}")]
    Storage(String),
}

impl MembershipError {
    /// Create a not found error
    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Create a storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}

#[cfg(feature = "sqlx-support")]
impl From<sqlx::Error> for MembershipError {
    fn from(err: sqlx::Error) -> Self {
        Self::Storage(err.to_string())
    }
}
