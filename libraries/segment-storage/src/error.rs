/// Storage bootstrap errors
use thiserror::Error;

/// Errors raised while connecting to or migrating the database
///
/// Failures inside the workflows are reported as `MembershipError::Storage`.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Database error from `SQLx`
    #[error(transparent)]
    Database(#[from] sqlx::Error),

    /// Migration error
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl From<StorageError> for segment_core::MembershipError {
    fn from(err: StorageError) -> Self {
        segment_core::MembershipError::storage(err.to_string())
    }
}
