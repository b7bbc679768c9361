// crates/kpi-board-core/src/core/normalize.rs
// ============================================================================
// Module: Record Normalizer
// Description: Maps loosely-typed bulk rows onto canonical KPI records.
// Purpose: Rename columns, coerce numerics leniently, and synthesize labels.
// Dependencies: serde_json, thiserror
// ============================================================================

//! ## Overview
//! Bulk KPI files are JSON arrays of objects keyed by French column names.
//! Normalization runs in two phases:
//! 1. A schema check over the union of keys in every row. Missing required
//!    columns abort the whole batch.
//! 2. A per-row pass that coerces numerics (unparsable values become `None`),
//!    scales the realization rate to a percentage, drops rows without a
//!    numeric weight, and fills in a name from fallback columns.
//!
//! Row-level problems are never reported individually; they are counted in
//! [`NormalizeOutcome::rows_dropped`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use serde_json::Map;
use serde_json::Value;
use thiserror::Error;

use crate::core::record::KpiRecord;

// ============================================================================
// SECTION: Columns
// ============================================================================

/// Source column names used by the bulk file format.
pub mod columns {
    /// Composite KPI label.
    pub const NAME: &str = "Objectifs";
    /// Realization rate, encoded as a fraction.
    pub const RATE: &str = "Taux de réalisation";
    /// Yearly objective; feeds both `target` and `objective`.
    pub const TARGET: &str = "OBJECTIF 2025";
    /// Weight.
    pub const WEIGHT: &str = "poids";
    /// Realized value.
    pub const REALIZED: &str = "Réalisation 2025";
    /// Raw score.
    pub const SCORE: &str = "score";
    /// First fallback label column (group).
    pub const FALLBACK_GROUP: &str = "Column2";
    /// Second fallback label column (subcategory).
    pub const FALLBACK_SUBCATEGORY: &str = "Column3";
}

/// Columns that must appear somewhere in the input schema.
pub const REQUIRED_COLUMNS: &[&str] = &[
    columns::NAME,
    columns::RATE,
    columns::TARGET,
    columns::WEIGHT,
    columns::REALIZED,
    columns::SCORE,
];

/// Placeholder used when a fallback label is missing.
pub const UNKNOWN_LABEL: &str = "Unknown";

/// Scale applied to fractional realization rates.
const RATE_SCALE: f64 = 100.0;

// ============================================================================
// SECTION: Types
// ============================================================================

/// One loosely-typed input row.
pub type RawRow = Map<String, Value>;

/// Result of normalizing a batch of rows.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizeOutcome {
    /// Records that survived normalization, in input order.
    pub records: Vec<KpiRecord>,
    /// Number of input rows.
    pub rows_read: usize,
    /// Number of rows dropped for a missing or non-numeric weight.
    pub rows_dropped: usize,
}

/// Schema-level normalization failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizeError {
    /// Required columns are absent from the input schema.
    #[error("missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),
    /// The payload is not a JSON array.
    #[error("expected a JSON array of rows")]
    NotAnArray,
    /// A row is not a JSON object.
    #[error("row {index} is not a JSON object")]
    RowNotObject {
        /// Zero-based row index.
        index: usize,
    },
}

// ============================================================================
// SECTION: Normalization
// ============================================================================

/// Splits a JSON payload into rows.
///
/// # Errors
///
/// Returns [`NormalizeError`] when the payload is not an array of objects.
pub fn rows_from_value(value: Value) -> Result<Vec<RawRow>, NormalizeError> {
    let Value::Array(items) = value else {
        return Err(NormalizeError::NotAnArray);
    };
    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| match item {
            Value::Object(row) => Ok(row),
            _ => Err(NormalizeError::RowNotObject {
                index,
            }),
        })
        .collect()
}

/// Normalizes bulk rows into KPI records.
///
/// # Errors
///
/// Returns [`NormalizeError::MissingColumns`] when a required column never
/// appears in any row. Per-row defects are not errors.
pub fn normalize_rows(rows: &[RawRow]) -> Result<NormalizeOutcome, NormalizeError> {
    check_schema(rows)?;
    let records: Vec<KpiRecord> = rows.iter().filter_map(normalize_row).collect();
    Ok(NormalizeOutcome {
        rows_read: rows.len(),
        rows_dropped: rows.len() - records.len(),
        records,
    })
}

/// Coerces a loosely-typed value to a finite `f64`.
///
/// Numbers pass through, strings are trimmed and parsed. Everything else,
/// including non-finite results, yields `None`.
#[must_use]
pub fn coerce_number(value: Option<&Value>) -> Option<f64> {
    let parsed = match value? {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    parsed.is_finite().then_some(parsed)
}

/// Returns the name used when both fallback labels are missing.
#[must_use]
pub fn unknown_name() -> String {
    format!("{UNKNOWN_LABEL} - {UNKNOWN_LABEL}")
}

/// Verifies that every required column appears in at least one row.
fn check_schema(rows: &[RawRow]) -> Result<(), NormalizeError> {
    let present: BTreeSet<&str> = rows.iter().flat_map(|row| row.keys().map(String::as_str)).collect();
    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|column| !present.contains(**column))
        .map(|column| (*column).to_string())
        .collect();
    if missing.is_empty() { Ok(()) } else { Err(NormalizeError::MissingColumns(missing)) }
}

/// Normalizes a single row, or drops it when the weight is unusable.
fn normalize_row(row: &RawRow) -> Option<KpiRecord> {
    let weight = coerce_number(row.get(columns::WEIGHT))?;
    let target = coerce_number(row.get(columns::TARGET));
    Some(KpiRecord {
        name: resolve_name(row),
        rate: coerce_number(row.get(columns::RATE))
            .map(|rate| rate * RATE_SCALE)
            .filter(|rate| rate.is_finite()),
        target,
        weight,
        objective: target,
        realized: coerce_number(row.get(columns::REALIZED)),
        score: coerce_number(row.get(columns::SCORE)),
    })
}

/// Takes the name column verbatim, or synthesizes it from fallback columns.
fn resolve_name(row: &RawRow) -> String {
    label_text(row.get(columns::NAME)).unwrap_or_else(|| {
        let group = label_text(row.get(columns::FALLBACK_GROUP));
        let subcategory = label_text(row.get(columns::FALLBACK_SUBCATEGORY));
        format!(
            "{} - {}",
            group.as_deref().unwrap_or(UNKNOWN_LABEL),
            subcategory.as_deref().unwrap_or(UNKNOWN_LABEL)
        )
    })
}

/// Renders a label cell; null and missing cells yield `None`.
fn label_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only assertions."
    )]

    use serde_json::Value;
    use serde_json::json;

    use super::coerce_number;
    use super::label_text;

    #[test]
    fn coerce_number_handles_text_and_junk() {
        assert_eq!(coerce_number(Some(&json!(" 12.5 "))), Some(12.5));
        assert_eq!(coerce_number(Some(&json!(3))), Some(3.0));
        assert_eq!(coerce_number(Some(&json!("n/a"))), None);
        assert_eq!(coerce_number(Some(&json!("NaN"))), None);
        assert_eq!(coerce_number(Some(&json!("inf"))), None);
        assert_eq!(coerce_number(Some(&json!(true))), None);
        assert_eq!(coerce_number(Some(&json!([1]))), None);
        assert_eq!(coerce_number(Some(&Value::Null)), None);
        assert_eq!(coerce_number(None), None);
    }

    #[test]
    fn label_text_renders_scalars() {
        assert_eq!(label_text(Some(&json!("Sales"))).as_deref(), Some("Sales"));
        assert_eq!(label_text(Some(&json!(7))).as_deref(), Some("7"));
        assert_eq!(label_text(Some(&Value::Null)), None);
        assert_eq!(label_text(None), None);
    }
}
