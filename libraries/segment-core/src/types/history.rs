//! Membership history types
use crate::error::{MembershipError, Result};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Earliest year accepted for history queries
pub const MIN_HISTORY_YEAR: i32 = 1970;

/// Latest year accepted for history queries
pub const MAX_HISTORY_YEAR: i32 = 9999;

/// One ledger row as reported by a history query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Slug of the segment, even if it has since been retired
    pub slug: String,

    /// Enrollment time
    pub created_at: DateTime<Utc>,

    /// Removal or scheduled expiration, `None` while open-ended
    pub deleted_at: Option<DateTime<Utc>>,
}

/// A calendar month in UTC
///
/// Holds the half-open range `[start, end)` covering the month.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryPeriod {
    month: u32,
    year: i32,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl HistoryPeriod {
    /// Validate a month (1-12) and year and compute the month's bounds
    pub fn new(month: u32, year: i32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(MembershipError::invalid_input(format!(
                "month must be between 1 and 12, got {month}"
            )));
        }
        if !(MIN_HISTORY_YEAR..=MAX_HISTORY_YEAR).contains(&year) {
            return Err(MembershipError::invalid_input(format!(
                "year must be between {MIN_HISTORY_YEAR} and {MAX_HISTORY_YEAR}, got {year}"
            )));
        }

        let (next_month, next_year) = if month == 12 {
            (1, year + 1)
        } else {
            (month + 1, year)
        };

        let start = month_start(year, month)?;
        let end = month_start(next_year, next_month)?;

        Ok(Self {
            month,
            year,
            start,
            end,
        })
    }

    /// The month containing `at`
    pub fn containing(at: DateTime<Utc>) -> Result<Self> {
        Self::new(at.month(), at.year())
    }

    /// Calendar month, 1-12
    pub fn month(&self) -> u32 {
        self.month
    }

    /// Calendar year
    pub fn year(&self) -> i32 {
        self.year
    }

    /// First instant of the month
    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// First instant of the following month
    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Whether `at` falls inside the month
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at < self.end
    }
}

fn month_start(year: i32, month: u32) -> Result<DateTime<Utc>> {
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| MembershipError::invalid_input(format!("invalid month {year}-{month:02}")))
}
