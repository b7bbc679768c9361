// crates/kpi-board-store-sqlite/src/lib.rs
// ============================================================================
// Module: SQLite KPI Store
// Description: Durable KpiStore backend using SQLite.
// Purpose: Persist the current KPI generation in a single local table.
// Dependencies: kpi-board-core, rusqlite
// ============================================================================

//! ## Overview
//! This crate provides a SQLite-backed [`kpi_board_core::KpiStore`] that keeps
//! one generation of KPI records in the `kpis` table. Replacements run in a
//! single transaction, and existing databases are evolved in place by adding
//! missing columns.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use store::KPI_TABLE;
pub use store::SqliteKpiStore;
pub use store::SqliteStoreConfig;
pub use store::SqliteStoreError;
pub use store::SqliteStoreMode;
pub use store::SqliteSyncMode;
