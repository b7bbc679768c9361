// crates/kpi-board-core/src/interfaces/mod.rs
// ============================================================================
// Module: KPI Board Interfaces
// Description: Backend-agnostic persistence contract for KPI snapshots.
// Purpose: Define the store surface used by ingestion, HTTP, and the board.
// Dependencies: crate::core, thiserror
// ============================================================================

//! ## Overview
//! A [`KpiStore`] holds exactly one generation of KPI records. Writers replace
//! the whole generation at once; readers see either the previous generation
//! or the new one, never a partial or empty table mid-swap. Implementations
//! must reject invalid batches without modifying stored data.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::core::IngestedAt;
use crate::core::KpiRecord;
use crate::core::StoredKpi;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum number of records accepted by a single replace.
pub const MAX_REPLACE_RECORDS: usize = 10_000;

// ============================================================================
// SECTION: KPI Store
// ============================================================================

/// KPI store errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Store I/O error.
    #[error("kpi store io error: {0}")]
    Io(String),
    /// Store data is corrupted or fails integrity checks.
    #[error("kpi store corruption: {0}")]
    Corrupt(String),
    /// Store schema is incompatible.
    #[error("kpi store version mismatch: {0}")]
    VersionMismatch(String),
    /// Input batch is invalid; nothing was written.
    #[error("kpi store invalid data: {0}")]
    Invalid(String),
    /// Store reported an error.
    #[error("kpi store error: {0}")]
    Store(String),
}

/// Single-generation KPI snapshot store.
pub trait KpiStore {
    /// Atomically replaces every stored record with `records`.
    ///
    /// All written rows share the returned timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Invalid`] for rejected batches and other
    /// [`StoreError`] variants when the write fails. The store is unchanged
    /// on error.
    fn replace_all(&self, records: &[KpiRecord]) -> Result<IngestedAt, StoreError>;

    /// Returns up to `limit` most recent records in insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when reading fails.
    fn recent(&self, limit: usize) -> Result<Vec<StoredKpi>, StoreError>;

    /// Reports store readiness for health probes.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store is unavailable.
    fn readiness(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Checks a replace batch against store limits and record invariants.
///
/// # Errors
///
/// Returns [`StoreError::Invalid`] naming the first offending record.
pub fn validate_batch(records: &[KpiRecord]) -> Result<(), StoreError> {
    if records.len() > MAX_REPLACE_RECORDS {
        return Err(StoreError::Invalid(format!(
            "batch of {} records exceeds limit of {MAX_REPLACE_RECORDS}",
            records.len()
        )));
    }
    for (index, record) in records.iter().enumerate() {
        record
            .validate()
            .map_err(|err| StoreError::Invalid(format!("record {index}: {err}")))?;
    }
    Ok(())
}
