// crates/kpi-board-core/src/runtime/mod.rs
// ============================================================================
// Module: KPI Board Runtime
// Description: In-memory store and bulk-file ingestion pipeline.
// Purpose: Connect the normalizer to any KPI store implementation.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! Runtime modules move records from a bulk file into a [`crate::KpiStore`].
//! Every surface (CLI ingest, server seeding, board fallback) goes through
//! the same pipeline.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod ingest;
pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use ingest::IngestError;
pub use ingest::IngestReport;
pub use ingest::MAX_BULK_FILE_BYTES;
pub use ingest::ingest_bulk_file;
pub use ingest::ingest_rows;
pub use ingest::read_bulk_file;
pub use store::InMemoryKpiStore;
pub use store::SharedKpiStore;
