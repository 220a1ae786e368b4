//! ID types for segment service entities
use crate::error::MembershipError;
use serde::{Deserialize, Serialize};
use std::fmt;

#[cfg(feature = "sqlx-support")]
use sqlx::{
    encode::IsNull,
    error::BoxDynError,
    sqlite::{SqliteArgumentValue, SqliteTypeInfo, SqliteValueRef},
    Decode, Encode, Sqlite, Type,
};

/// Implements `SQLite` integer encoding for an `i64` newtype id.
macro_rules! sqlite_integer_id {
    ($name:ident) => {
        #[cfg(feature = "sqlx-support")]
        impl Type<Sqlite> for $name {
            fn type_info() -> SqliteTypeInfo {
                <i64 as Type<Sqlite>>::type_info()
            }

            fn compatible(ty: &SqliteTypeInfo) -> bool {
                <i64 as Type<Sqlite>>::compatible(ty)
            }
        }

        #[cfg(feature = "sqlx-support")]
        impl<'q> Encode<'q, Sqlite> for $name {
            fn encode_by_ref(
                &self,
                args: &mut Vec<SqliteArgumentValue<'q>>,
            ) -> Result<IsNull, BoxDynError> {
                <i64 as Encode<Sqlite>>::encode_by_ref(&self.0, args)
            }
        }

        #[cfg(feature = "sqlx-support")]
        impl<'r> Decode<'r, Sqlite> for $name {
            fn decode(value: SqliteValueRef<'r>) -> Result<Self, BoxDynError> {
                let raw = <i64 as Decode<Sqlite>>::decode(value)?;
                Ok($name(raw))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

/// Externally supplied user identifier
///
/// Always positive. The service never allocates user ids itself; they arrive
/// from callers and are registered on first use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(i64);

impl UserId {
    /// Wrap a raw id read back from storage
    pub fn from_raw(id: i64) -> Self {
        Self(id)
    }

    /// Get the inner value
    pub fn get(self) -> i64 {
        self.0
    }
}

impl TryFrom<u64> for UserId {
    type Error = MembershipError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        match i64::try_from(value) {
            Ok(id) if id > 0 => Ok(Self(id)),
            _ => Err(MembershipError::invalid_input(format!(
                "user id must be a positive integer up to {}, got {value}",
                i64::MAX
            ))),
        }
    }
}

sqlite_integer_id!(UserId);

/// Segment identifier (datastore-assigned)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SegmentId(i64);

impl SegmentId {
    /// Wrap a raw id read back from storage
    pub fn from_raw(id: i64) -> Self {
        Self(id)
    }

    /// Get the inner value
    pub fn get(self) -> i64 {
        self.0
    }
}

sqlite_integer_id!(SegmentId);

/// Membership ledger entry identifier (datastore-assigned)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MembershipId(i64);

impl MembershipId {
    /// Wrap a raw id read back from storage
    pub fn from_raw(id: i64) -> Self {
        Self(id)
    }

    /// Get the inner value
    pub fn get(self) -> i64 {
        self.0
    }
}

sqlite_integer_id!(MembershipId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_id_accepts_positive_values() {
        let id = UserId::try_from(42_u64).unwrap();
        assert_eq!(id.get(), 42);
        assert_eq!(id.to_string(), "42");
    }

    #[test]
    fn user_id_rejects_zero() {
        assert!(matches!(
            UserId::try_from(0_u64),
            Err(MembershipError::InvalidInput(_))
        ));
    }

    #[test]
    fn user_id_rejects_values_beyond_i64() {
        assert!(UserId::try_from(u64::MAX).is_err());
        assert!(UserId::try_from(i64::MAX as u64).is_ok());
    }

    #[test]
    fn ids_serialize_as_plain_integers() {
        let json = serde_json::to_string(&SegmentId::from_raw(7)).unwrap();
        assert_eq!(json, "7");
    }
}
