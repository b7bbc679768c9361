// crates/kpi-board-config/src/lib.rs
// ============================================================================
// Module: KPI Board Config Library
// Description: Canonical config model and validation.
// Purpose: Single source of truth for kpi-board.toml semantics.
// Dependencies: kpi-board-core, kpi-board-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! `kpi-board-config` defines the configuration model shared by the server
//! and the CLI. Loading applies size and path limits; validation fails closed.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
