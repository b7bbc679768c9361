// crates/kpi-board-core/src/core/record.rs
// ============================================================================
// Module: KPI Records
// Description: Canonical KPI record shape shared by ingestion, storage, and HTTP.
// Purpose: Define the single wire and storage representation of an indicator.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! [`KpiRecord`] is the normalized form of one performance indicator. The wire
//! shape is `{name, rate, target, weight, objective, realized, score}`; the
//! legacy field names `kpi_name`, `poids`, `obj`, and `real` are accepted on
//! input. `weight` is mandatory: a record without it cannot exist in storage.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::time::IngestedAt;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum accepted length of a record name in bytes.
pub const MAX_NAME_BYTES: usize = 1024;

// ============================================================================
// SECTION: Types
// ============================================================================

/// One performance indicator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiRecord {
    /// Composite label, usually "Group - Subcategory".
    #[serde(alias = "kpi_name")]
    pub name: String,
    /// Realization rate as a 0-100 percentage.
    #[serde(default)]
    pub rate: Option<f64>,
    /// Target value.
    #[serde(default)]
    pub target: Option<f64>,
    /// Weight used to normalize the score.
    #[serde(alias = "poids")]
    pub weight: f64,
    /// Objective value (mirrors `target` for bulk ingestion).
    #[serde(default, alias = "obj")]
    pub objective: Option<f64>,
    /// Raw realized value.
    #[serde(default, alias = "real")]
    pub realized: Option<f64>,
    /// Raw score; `None` counts as no progress.
    #[serde(default)]
    pub score: Option<f64>,
}

impl KpiRecord {
    /// Checks the storage invariants of a record.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError`] when the weight is not finite or the name is
    /// too long.
    pub fn validate(&self) -> Result<(), RecordError> {
        if !self.weight.is_finite() {
            return Err(RecordError::NonFiniteWeight);
        }
        if self.name.len() > MAX_NAME_BYTES {
            return Err(RecordError::NameTooLong {
                max_bytes: MAX_NAME_BYTES,
                actual_bytes: self.name.len(),
            });
        }
        Ok(())
    }
}

/// A record as read back from a store, with its generation timestamp.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredKpi {
    /// Stored record.
    #[serde(flatten)]
    pub record: KpiRecord,
    /// Timestamp of the replace that wrote the record.
    pub ingested_at: IngestedAt,
}

/// Record invariant violations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    /// Weight is NaN or infinite.
    #[error("weight must be a finite number")]
    NonFiniteWeight,
    /// Name exceeds [`MAX_NAME_BYTES`].
    #[error("name exceeds {max_bytes} bytes ({actual_bytes})")]
    NameTooLong {
        /// Maximum allowed bytes.
        max_bytes: usize,
        /// Actual name length in bytes.
        actual_bytes: usize,
    },
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only assertions."
    )]

    use serde_json::json;

    use super::KpiRecord;
    use super::RecordError;

    #[test]
    fn legacy_field_names_deserialize() {
        let record: KpiRecord = serde_json::from_value(json!({
            "kpi_name": "Sales - Q1",
            "rate": 50.0,
            "target": 100.0,
            "poids": 10.0,
            "obj": 100.0,
            "real": 90.0,
            "score": null
        }))
        .expect("legacy record");
        assert_eq!(record.name, "Sales - Q1");
        assert!((record.weight - 10.0).abs() < f64::EPSILON);
        assert_eq!(record.objective, Some(100.0));
        assert_eq!(record.realized, Some(90.0));
        assert_eq!(record.score, None);
    }

    #[test]
    fn missing_weight_is_rejected() {
        let result = serde_json::from_value::<KpiRecord>(json!({"name": "x", "score": 1.0}));
        assert!(result.is_err());
    }

    #[test]
    fn optional_fields_default_to_none() {
        let record: KpiRecord =
            serde_json::from_value(json!({"name": "x", "weight": 2})).expect("minimal record");
        assert_eq!(record.rate, None);
        assert_eq!(record.target, None);
        assert_eq!(record.objective, None);
        assert_eq!(record.realized, None);
        assert_eq!(record.score, None);
    }

    #[test]
    fn validate_rejects_non_finite_weight() {
        let record = KpiRecord {
            name: "x".to_string(),
            rate: None,
            target: None,
            weight: f64::NAN,
            objective: None,
            realized: None,
            score: None,
        };
        assert_eq!(record.validate(), Err(RecordError::NonFiniteWeight));
    }
}
