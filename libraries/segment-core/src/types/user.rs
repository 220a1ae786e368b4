//! User domain type
use super::ids::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A user known to the service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Caller-supplied identifier
    pub id: UserId,

    /// When the user was first referenced by a membership operation
    pub created_at: DateTime<Utc>,
}
