// crates/kpi-board-server/src/lib.rs
// ============================================================================
// Module: KPI Board Server Library
// Description: HTTP surface for the KPI Board store.
// Purpose: Expose retrieval, replace, gauge, and health endpoints.
// Dependencies: axum, kpi-board-core, kpi-board-config, tokio
// ============================================================================

//! ## Overview
//! `kpi-board-server` wraps a [`kpi_board_core::KpiStore`] in a small axum
//! application. Replace requests are validated in full before the store is
//! touched, and every request emits one structured audit event.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod server;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::FileAuditSink;
pub use audit::KpiAuditSink;
pub use audit::KpiIngestEvent;
pub use audit::KpiRequestEvent;
pub use audit::KpiRequestEventParams;
pub use audit::NoopAuditSink;
pub use audit::StderrAuditSink;
pub use audit::audit_sink_from_config;
pub use server::INVALID_FORMAT_MESSAGE;
pub use server::KpiServer;
pub use server::KpiServerError;
pub use server::UPDATED_MESSAGE;
