// crates/kpi-board-core/src/runtime/ingest.rs
// ============================================================================
// Module: Bulk Ingestion Pipeline
// Description: Reads bulk KPI files and replaces the stored snapshot.
// Purpose: Run normalize-then-replace with size limits and schema gating.
// Dependencies: crate::{core, interfaces}, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! The pipeline reads a JSON array of loosely-typed rows from disk, normalizes
//! it, and hands the surviving records to [`KpiStore::replace_all`]. Schema
//! failures abort before the store is touched. Rows dropped for a missing
//! weight are only counted in the [`IngestReport`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::File;
use std::io::ErrorKind;
use std::io::Read;
use std::path::Path;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::core::IngestedAt;
use crate::core::NormalizeError;
use crate::core::RawRow;
use crate::core::normalize_rows;
use crate::core::rows_from_value;
use crate::interfaces::KpiStore;
use crate::interfaces::StoreError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default maximum size of a bulk KPI file.
pub const MAX_BULK_FILE_BYTES: usize = 8 * 1024 * 1024;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Summary of one ingestion run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    /// Input rows read.
    pub rows_read: usize,
    /// Records written to the store.
    pub rows_kept: usize,
    /// Rows dropped for a missing or non-numeric weight.
    pub rows_dropped: usize,
    /// Timestamp of the written generation.
    pub ingested_at: IngestedAt,
}

/// Ingestion failures.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Bulk file does not exist.
    #[error("bulk file not found: {0}")]
    NotFound(String),
    /// Bulk file could not be read.
    #[error("bulk file io error: {0}")]
    Io(String),
    /// Bulk file exceeds the size limit.
    #[error("bulk file exceeds size limit: {actual_bytes} bytes (max {max_bytes})")]
    TooLarge {
        /// Maximum allowed bytes.
        max_bytes: usize,
        /// Observed size in bytes.
        actual_bytes: u64,
    },
    /// Bulk file is not valid JSON.
    #[error("bulk file is not valid json: {0}")]
    Parse(String),
    /// Bulk file does not have the expected schema.
    #[error("bulk file schema error: {0}")]
    Schema(#[from] NormalizeError),
    /// Store rejected the records.
    #[error(transparent)]
    Store(#[from] StoreError),
}

// ============================================================================
// SECTION: Pipeline
// ============================================================================

/// Reads a bulk KPI file into rows.
///
/// # Errors
///
/// Returns [`IngestError`] when the file is missing, unreadable, larger than
/// `max_bytes`, not JSON, or not an array of objects.
pub fn read_bulk_file(path: &Path, max_bytes: usize) -> Result<Vec<RawRow>, IngestError> {
    let bytes = read_bytes_with_limit(path, max_bytes)?;
    let value: Value =
        serde_json::from_slice(&bytes).map_err(|err| IngestError::Parse(err.to_string()))?;
    Ok(rows_from_value(value)?)
}

/// Normalizes rows and replaces the stored snapshot with the result.
///
/// # Errors
///
/// Returns [`IngestError::Schema`] without touching the store when required
/// columns are missing, or [`IngestError::Store`] when the write fails.
pub fn ingest_rows<S>(rows: &[RawRow], store: &S) -> Result<IngestReport, IngestError>
where
    S: KpiStore + ?Sized,
{
    let outcome = normalize_rows(rows)?;
    let ingested_at = store.replace_all(&outcome.records)?;
    Ok(IngestReport {
        rows_read: outcome.rows_read,
        rows_kept: outcome.records.len(),
        rows_dropped: outcome.rows_dropped,
        ingested_at,
    })
}

/// Reads a bulk KPI file and ingests it into `store`.
///
/// # Errors
///
/// Returns [`IngestError`] from reading, normalizing, or storing.
pub fn ingest_bulk_file<S>(
    path: &Path,
    max_bytes: usize,
    store: &S,
) -> Result<IngestReport, IngestError>
where
    S: KpiStore + ?Sized,
{
    let rows = read_bulk_file(path, max_bytes)?;
    ingest_rows(&rows, store)
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Reads a file from disk while enforcing a hard size limit.
fn read_bytes_with_limit(path: &Path, max_bytes: usize) -> Result<Vec<u8>, IngestError> {
    let file = File::open(path).map_err(|err| {
        if err.kind() == ErrorKind::NotFound {
            IngestError::NotFound(path.display().to_string())
        } else {
            IngestError::Io(err.to_string())
        }
    })?;
    let size = file.metadata().map_err(|err| IngestError::Io(err.to_string()))?.len();
    let limit = u64::try_from(max_bytes).unwrap_or(u64::MAX);
    if size > limit {
        return Err(IngestError::TooLarge {
            max_bytes,
            actual_bytes: size,
        });
    }
    let mut limited = file.take(limit.saturating_add(1));
    let mut bytes = Vec::new();
    limited.read_to_end(&mut bytes).map_err(|err| IngestError::Io(err.to_string()))?;
    if bytes.len() > max_bytes {
        return Err(IngestError::TooLarge {
            max_bytes,
            actual_bytes: u64::try_from(bytes.len()).unwrap_or(u64::MAX),
        });
    }
    Ok(bytes)
}
