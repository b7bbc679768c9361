// crates/kpi-board-core/src/core/mod.rs
// ============================================================================
// Module: KPI Board Core Types
// Description: Canonical KPI records, normalization, and gauge scoring.
// Purpose: Provide stable, serializable types shared by every KPI Board surface.
// Dependencies: serde, serde_json, time
// ============================================================================

//! ## Overview
//! Core types define the canonical [`KpiRecord`] shape, the lenient
//! normalization of bulk rows into records, and the score calculator used to
//! drive gauges. These types are the source of truth for the HTTP and CLI
//! surfaces.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod normalize;
pub mod record;
pub mod scoring;
pub mod time;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use normalize::NormalizeError;
pub use normalize::NormalizeOutcome;
pub use normalize::RawRow;
pub use normalize::REQUIRED_COLUMNS;
pub use normalize::UNKNOWN_LABEL;
pub use normalize::coerce_number;
pub use normalize::normalize_rows;
pub use normalize::rows_from_value;
pub use normalize::unknown_name;
pub use record::KpiRecord;
pub use record::RecordError;
pub use record::StoredKpi;
pub use scoring::BandThresholds;
pub use scoring::DEFAULT_GOOD_THRESHOLD;
pub use scoring::DEFAULT_WARN_THRESHOLD;
pub use scoring::GaugeBand;
pub use scoring::GaugeReading;
pub use scoring::ScoringError;
pub use scoring::display_percent;
pub use self::time::IngestedAt;
