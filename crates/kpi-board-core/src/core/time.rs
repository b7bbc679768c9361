// crates/kpi-board-core/src/core/time.rs
// ============================================================================
// Module: KPI Board Time Model
// Description: Ingestion timestamps attached to stored KPI generations.
// Purpose: Provide a single wall-clock reading per replace operation.
// Dependencies: serde, time
// ============================================================================

//! ## Overview
//! Every replace operation stamps the rows it writes with one [`IngestedAt`]
//! value. Callers never supply it; stores read the wall clock exactly once
//! per generation so every row of a generation compares equal.

// ============================================================================
// SECTION: Imports
// ============================================================================

use ::time::OffsetDateTime;
use ::time::format_description::well_known::Rfc3339;
use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Time Values
// ============================================================================

/// Ingestion timestamp in unix epoch milliseconds.
///
/// # Invariants
/// - Ordering follows the numeric millisecond value.
/// - All rows written by one replace share the same value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IngestedAt(i64);

impl IngestedAt {
    /// Wraps a raw unix millisecond value.
    #[must_use]
    pub const fn from_unix_millis(value: i64) -> Self {
        Self(value)
    }

    /// Reads the current wall-clock time.
    #[must_use]
    pub fn now() -> Self {
        let nanos = OffsetDateTime::now_utc().unix_timestamp_nanos();
        Self(i64::try_from(nanos / 1_000_000).unwrap_or(i64::MAX))
    }

    /// Returns the unix millisecond value.
    #[must_use]
    pub const fn as_unix_millis(self) -> i64 {
        self.0
    }

    /// Formats the timestamp as RFC 3339 (UTC), or `None` when out of range.
    #[must_use]
    pub fn to_rfc3339(self) -> Option<String> {
        let nanos = i128::from(self.0) * 1_000_000;
        OffsetDateTime::from_unix_timestamp_nanos(nanos).ok()?.format(&Rfc3339).ok()
    }
}
