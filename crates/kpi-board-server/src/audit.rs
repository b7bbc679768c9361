// crates/kpi-board-server/src/audit.rs
// ============================================================================
// Module: KPI Board Audit Logging
// Description: Structured audit events for KPI requests and ingests.
// Purpose: Emit JSON-line audit logs without a logging framework.
// Dependencies: kpi-board-config, kpi-board-core, serde, serde_json
// ============================================================================

//! ## Overview
//! Audit events are serialized as one JSON object per line. Sinks decide the
//! destination: stderr, an append-only file, or nowhere. Events never carry
//! record payloads, only counts and sizes.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use kpi_board_config::ServerAuditConfig;
use kpi_board_core::IngestError;
use kpi_board_core::IngestReport;
use serde::Serialize;

// ============================================================================
// SECTION: Types
// ============================================================================

/// HTTP request audit event payload.
#[derive(Debug, Clone, Serialize)]
pub struct KpiRequestEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// HTTP method.
    pub method: &'static str,
    /// Route path.
    pub route: &'static str,
    /// Response status code.
    pub status: u16,
    /// Records returned or written, when known.
    pub record_count: Option<usize>,
    /// Request body size in bytes.
    pub request_bytes: usize,
    /// Peer IP address when available.
    pub peer_ip: Option<String>,
    /// Normalized error kind label.
    pub error_kind: Option<&'static str>,
}

/// Inputs for [`KpiRequestEvent::new`].
#[derive(Debug, Clone)]
pub struct KpiRequestEventParams {
    /// HTTP method.
    pub method: &'static str,
    /// Route path.
    pub route: &'static str,
    /// Response status code.
    pub status: u16,
    /// Records returned or written, when known.
    pub record_count: Option<usize>,
    /// Request body size in bytes.
    pub request_bytes: usize,
    /// Peer IP address when available.
    pub peer_ip: Option<String>,
    /// Normalized error kind label.
    pub error_kind: Option<&'static str>,
}

impl KpiRequestEvent {
    /// Creates a request event stamped with the current time.
    #[must_use]
    pub fn new(params: KpiRequestEventParams) -> Self {
        Self {
            event: "kpi_request",
            timestamp_ms: now_millis(),
            method: params.method,
            route: params.route,
            status: params.status,
            record_count: params.record_count,
            request_bytes: params.request_bytes,
            peer_ip: params.peer_ip,
            error_kind: params.error_kind,
        }
    }
}

/// Bulk ingestion audit event payload.
#[derive(Debug, Clone, Serialize)]
pub struct KpiIngestEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Bulk file path.
    pub source: String,
    /// `ok`, `error`, or `skipped`.
    pub outcome: &'static str,
    /// Input rows read.
    pub rows_read: Option<usize>,
    /// Records written.
    pub rows_kept: Option<usize>,
    /// Rows dropped for a missing weight.
    pub rows_dropped: Option<usize>,
    /// Failure or skip reason.
    pub message: Option<String>,
}

impl KpiIngestEvent {
    /// Creates an event describing an ingestion result.
    #[must_use]
    pub fn from_result(source: &Path, result: &Result<IngestReport, IngestError>) -> Self {
        let base = Self::base(source);
        match result {
            Ok(report) => Self {
                outcome: "ok",
                rows_read: Some(report.rows_read),
                rows_kept: Some(report.rows_kept),
                rows_dropped: Some(report.rows_dropped),
                ..base
            },
            Err(err) => Self {
                outcome: "error",
                message: Some(err.to_string()),
                ..base
            },
        }
    }

    /// Creates an event for an ingestion that did not run.
    #[must_use]
    pub fn skipped(source: &Path, reason: &str) -> Self {
        Self {
            outcome: "skipped",
            message: Some(reason.to_string()),
            ..Self::base(source)
        }
    }

    /// Returns an event with only the identifying fields set.
    fn base(source: &Path) -> Self {
        Self {
            event: "kpi_ingest",
            timestamp_ms: now_millis(),
            source: source.display().to_string(),
            outcome: "ok",
            rows_read: None,
            rows_kept: None,
            rows_dropped: None,
            message: None,
        }
    }
}

/// Returns the current unix epoch in milliseconds.
fn now_millis() -> u128 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis()
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Audit sink for KPI Board events.
pub trait KpiAuditSink: Send + Sync {
    /// Record a request audit event.
    fn record_request(&self, event: &KpiRequestEvent);

    /// Record an ingestion audit event.
    fn record_ingest(&self, _event: &KpiIngestEvent) {}
}

/// Audit sink that logs JSON lines to stderr.
pub struct StderrAuditSink;

impl KpiAuditSink for StderrAuditSink {
    fn record_request(&self, event: &KpiRequestEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(io::stderr(), "{payload}");
        }
    }

    fn record_ingest(&self, event: &KpiIngestEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(io::stderr(), "{payload}");
        }
    }
}

/// Audit sink that appends JSON lines to a file.
pub struct FileAuditSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileAuditSink {
    /// Opens the audit log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }

    /// Writes one serialized line.
    fn write_line<T: Serialize>(&self, event: &T) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

impl KpiAuditSink for FileAuditSink {
    fn record_request(&self, event: &KpiRequestEvent) {
        self.write_line(event);
    }

    fn record_ingest(&self, event: &KpiIngestEvent) {
        self.write_line(event);
    }
}

/// No-op audit sink.
pub struct NoopAuditSink;

impl KpiAuditSink for NoopAuditSink {
    fn record_request(&self, _event: &KpiRequestEvent) {}
}

/// Builds the audit sink selected by configuration.
///
/// # Errors
///
/// Returns an error when the configured audit file cannot be opened.
pub fn audit_sink_from_config(config: &ServerAuditConfig) -> io::Result<Arc<dyn KpiAuditSink>> {
    if !config.enabled {
        return Ok(Arc::new(NoopAuditSink));
    }
    match &config.path {
        Some(path) => Ok(Arc::new(FileAuditSink::new(Path::new(path.trim()))?)),
        None => Ok(Arc::new(StderrAuditSink)),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
