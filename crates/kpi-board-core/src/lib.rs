// crates/kpi-board-core/src/lib.rs
// ============================================================================
// Module: KPI Board Core Library
// Description: Public API surface for the KPI Board core.
// Purpose: Expose record types, normalization, scoring, and store interfaces.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! KPI Board core turns loosely-typed indicator rows into canonical
//! [`KpiRecord`] values, derives gauge readings from them, and defines the
//! [`KpiStore`] contract that persistence backends implement. It performs no
//! network I/O; hosts wire it to HTTP and `SQLite` through the sibling crates.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use crate::core::*;

pub use interfaces::KpiStore;
pub use interfaces::MAX_REPLACE_RECORDS;
pub use interfaces::StoreError;
pub use interfaces::validate_batch;
pub use runtime::InMemoryKpiStore;
pub use runtime::IngestError;
pub use runtime::IngestReport;
pub use runtime::MAX_BULK_FILE_BYTES;
pub use runtime::SharedKpiStore;
pub use runtime::ingest_bulk_file;
pub use runtime::ingest_rows;
pub use runtime::read_bulk_file;
