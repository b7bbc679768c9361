// crates/kpi-board-server/src/server.rs
// ============================================================================
// Module: KPI Board HTTP Server
// Description: Retrieval, replace, gauge, and health endpoints over axum.
// Purpose: Serve the current KPI generation and accept full replacements.
// Dependencies: axum, kpi-board-core, kpi-board-config, kpi-board-store-sqlite, tokio
// ============================================================================

//! ## Overview
//! Routes:
//! - `GET /api/kpis` returns up to `store.read_limit` most recent records.
//! - `POST /api/kpis` replaces the stored set with a JSON array of records.
//! - `GET /api/gauges` returns gauge readings for the same records.
//! - `GET /healthz` reports store readiness.
//!
//! A replace body is parsed and validated in full before the store is called,
//! so every rejection leaves stored data untouched. Store calls are
//! synchronous and run under `block_in_place` on multi-thread runtimes.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::body::Bytes;
use axum::extract::ConnectInfo;
use axum::extract::DefaultBodyLimit;
use axum::extract::State;
use axum::extract::rejection::BytesRejection;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::get;
use kpi_board_config::KpiBoardConfig;
use kpi_board_core::BandThresholds;
use kpi_board_core::GaugeReading;
use kpi_board_core::IngestReport;
use kpi_board_core::KpiRecord;
use kpi_board_core::KpiStore;
use kpi_board_core::SharedKpiStore;
use kpi_board_core::StoreError;
use kpi_board_core::ingest_bulk_file;
use kpi_board_store_sqlite::SqliteKpiStore;
use serde::Serialize;
use serde_json::Value;
use serde_json::json;
use thiserror::Error;
use tokio::net::TcpListener;

use crate::audit::KpiAuditSink;
use crate::audit::KpiIngestEvent;
use crate::audit::KpiRequestEvent;
use crate::audit::KpiRequestEventParams;
use crate::audit::audit_sink_from_config;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Error message for bodies that are not a JSON array.
pub const INVALID_FORMAT_MESSAGE: &str = "Invalid data format, expected a list of KPI records";
/// Success message for a completed replace.
pub const UPDATED_MESSAGE: &str = "KPI data updated successfully";
/// Retrieval and replace route.
const KPIS_ROUTE: &str = "/api/kpis";
/// Gauge route.
const GAUGES_ROUTE: &str = "/api/gauges";
/// Health route.
const HEALTH_ROUTE: &str = "/healthz";

// ============================================================================
// SECTION: KPI Server
// ============================================================================

/// KPI Board HTTP server.
pub struct KpiServer {
    /// Validated configuration.
    config: KpiBoardConfig,
    /// Shared handler state.
    state: Arc<ServerState>,
}

impl KpiServer {
    /// Builds a server backed by the configured `SQLite` store.
    ///
    /// # Errors
    ///
    /// Returns [`KpiServerError`] when configuration is invalid or the store
    /// or audit sink cannot be opened.
    pub fn from_config(mut config: KpiBoardConfig) -> Result<Self, KpiServerError> {
        config.validate().map_err(|err| KpiServerError::Config(err.to_string()))?;
        let store = SqliteKpiStore::new(&config.store.sqlite_config())
            .map_err(|err| KpiServerError::Init(err.to_string()))?;
        let audit = audit_sink_from_config(&config.server.audit)
            .map_err(|err| KpiServerError::Init(format!("audit sink: {err}")))?;
        Self::with_store(config, SharedKpiStore::from_store(store), audit)
    }

    /// Builds a server over an existing store and audit sink.
    ///
    /// # Errors
    ///
    /// Returns [`KpiServerError::Config`] when the board thresholds are invalid.
    pub fn with_store(
        config: KpiBoardConfig,
        store: SharedKpiStore,
        audit: Arc<dyn KpiAuditSink>,
    ) -> Result<Self, KpiServerError> {
        let thresholds =
            config.board.thresholds().map_err(|err| KpiServerError::Config(err.to_string()))?;
        let state = Arc::new(ServerState {
            store,
            audit,
            thresholds,
            read_limit: config.store.read_limit,
            max_body_bytes: config.server.max_body_bytes,
        });
        Ok(Self {
            config,
            state,
        })
    }

    /// Ingests the configured bulk file when startup seeding is enabled.
    ///
    /// Failures are audited and never prevent the server from starting.
    pub fn seed_from_source(&self) -> Option<IngestReport> {
        let source = &self.config.source;
        if !source.seed_on_startup {
            return None;
        }
        if !source.file.exists() {
            self.state.audit.record_ingest(&KpiIngestEvent::skipped(&source.file, "bulk file not found"));
            return None;
        }
        let result = ingest_bulk_file(&source.file, source.max_file_bytes, &self.state.store);
        self.state.audit.record_ingest(&KpiIngestEvent::from_result(&source.file, &result));
        result.ok()
    }

    /// Returns the axum router for this server.
    #[must_use]
    pub fn router(&self) -> Router {
        build_router(Arc::clone(&self.state))
    }

    /// Binds the configured address and serves until the process exits.
    ///
    /// # Errors
    ///
    /// Returns [`KpiServerError`] when binding or serving fails.
    pub async fn serve(self) -> Result<(), KpiServerError> {
        let addr =
            self.config.server.bind_addr().map_err(|err| KpiServerError::Config(err.to_string()))?;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|err| KpiServerError::Transport(format!("http bind failed: {err}")))?;
        self.serve_on(listener, std::future::pending()).await
    }

    /// Serves on an already bound listener until `shutdown` resolves.
    ///
    /// # Errors
    ///
    /// Returns [`KpiServerError::Transport`] when the server fails.
    pub async fn serve_on<F>(self, listener: TcpListener, shutdown: F) -> Result<(), KpiServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = self.router();
        axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|err| KpiServerError::Transport(format!("http server failed: {err}")))
    }
}

/// Shared server state for HTTP handlers.
struct ServerState {
    /// KPI store.
    store: SharedKpiStore,
    /// Audit sink for request events.
    audit: Arc<dyn KpiAuditSink>,
    /// Band thresholds for gauge readings.
    thresholds: BandThresholds,
    /// Maximum records returned by reads.
    read_limit: usize,
    /// Maximum allowed request body size.
    max_body_bytes: usize,
}

/// Builds the router over shared state.
fn build_router(state: Arc<ServerState>) -> Router {
    let max_body_bytes = state.max_body_bytes;
    Router::new()
        .route(KPIS_ROUTE, get(handle_get_kpis).post(handle_post_kpis))
        .route(GAUGES_ROUTE, get(handle_get_gauges))
        .route(HEALTH_ROUTE, get(handle_healthz))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .with_state(state)
}

// ============================================================================
// SECTION: Handlers
// ============================================================================

/// Handles `GET /api/kpis`.
async fn handle_get_kpis(
    State(state): State<Arc<ServerState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
) -> Response {
    let response = get_kpis(&state);
    response.audit(&state, "GET", KPIS_ROUTE, 0, peer).into_response()
}

/// Handles `POST /api/kpis`.
async fn handle_post_kpis(
    State(state): State<Arc<ServerState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let (response, body_len) = match body {
        Ok(bytes) => (replace_kpis(&state, &bytes), bytes.len()),
        Err(rejection) => (ReplaceRejection::from_body_rejection(&rejection).into_response_body(), 0),
    };
    response.audit(&state, "POST", KPIS_ROUTE, body_len, peer).into_response()
}

/// Handles `GET /api/gauges`.
async fn handle_get_gauges(
    State(state): State<Arc<ServerState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
) -> Response {
    let response = get_gauges(&state);
    response.audit(&state, "GET", GAUGES_ROUTE, 0, peer).into_response()
}

/// Handles `GET /healthz`.
async fn handle_healthz(
    State(state): State<Arc<ServerState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
) -> Response {
    let response = match run_blocking(|| state.store.readiness()) {
        Ok(()) => ApiResponse::ok(json!({"status": "ok"}), None),
        Err(_) => ApiResponse::error(
            StatusCode::SERVICE_UNAVAILABLE,
            json!({"status": "unavailable"}),
            "store_unavailable",
        ),
    };
    response.audit(&state, "GET", HEALTH_ROUTE, 0, peer).into_response()
}

// ============================================================================
// SECTION: Operations
// ============================================================================

/// Handler outcome before conversion into an HTTP response.
#[derive(Debug)]
struct ApiResponse {
    /// HTTP status.
    status: StatusCode,
    /// JSON body.
    body: Value,
    /// Records returned or written.
    record_count: Option<usize>,
    /// Error kind label for audit.
    error_kind: Option<&'static str>,
}

impl ApiResponse {
    /// Successful response.
    const fn ok(body: Value, record_count: Option<usize>) -> Self {
        Self {
            status: StatusCode::OK,
            body,
            record_count,
            error_kind: None,
        }
    }

    /// Error response.
    const fn error(status: StatusCode, body: Value, error_kind: &'static str) -> Self {
        Self {
            status,
            body,
            record_count: None,
            error_kind: Some(error_kind),
        }
    }

    /// Error response with an `{"error": message}` body.
    fn message(status: StatusCode, message: &str, error_kind: &'static str) -> Self {
        Self::error(status, json!({"error": message}), error_kind)
    }

    /// Records the request audit event and passes the response through.
    fn audit(
        self,
        state: &ServerState,
        method: &'static str,
        route: &'static str,
        request_bytes: usize,
        peer: SocketAddr,
    ) -> Self {
        state.audit.record_request(&KpiRequestEvent::new(KpiRequestEventParams {
            method,
            route,
            status: self.status.as_u16(),
            record_count: self.record_count,
            request_bytes,
            peer_ip: Some(peer.ip().to_string()),
            error_kind: self.error_kind,
        }));
        self
    }
}

impl IntoResponse for ApiResponse {
    fn into_response(self) -> Response {
        (self.status, axum::Json(self.body)).into_response()
    }
}

/// Reads the most recent records.
fn get_kpis(state: &ServerState) -> ApiResponse {
    match read_records(state) {
        Ok(records) => json_list(&records),
        Err(_) => store_failure(),
    }
}

/// Reads gauge readings for the most recent records.
fn get_gauges(state: &ServerState) -> ApiResponse {
    match read_records(state) {
        Ok(records) => {
            let readings: Vec<GaugeReading> = records
                .iter()
                .map(|record| GaugeReading::from_record(record, &state.thresholds))
                .collect();
            json_list(&readings)
        }
        Err(_) => store_failure(),
    }
}

/// Validates a replace body and swaps the stored generation.
fn replace_kpis(state: &ServerState, bytes: &[u8]) -> ApiResponse {
    let records = match parse_replace_body(bytes) {
        Ok(records) => records,
        Err(rejection) => return rejection.into_response_body(),
    };
    match run_blocking(|| state.store.replace_all(&records)) {
        Ok(_) => ApiResponse::ok(
            json!({"message": UPDATED_MESSAGE, "count": records.len()}),
            Some(records.len()),
        ),
        Err(StoreError::Invalid(message)) => {
            ApiResponse::message(StatusCode::BAD_REQUEST, &message, "invalid_batch")
        }
        Err(_) => store_failure(),
    }
}

/// Reads records from the store, dropping generation timestamps.
fn read_records(state: &ServerState) -> Result<Vec<KpiRecord>, StoreError> {
    let stored = run_blocking(|| state.store.recent(state.read_limit))?;
    Ok(stored.into_iter().map(|row| row.record).collect())
}

/// Serializes a list into a 200 response.
fn json_list<T: Serialize>(items: &[T]) -> ApiResponse {
    match serde_json::to_value(items) {
        Ok(body) => ApiResponse::ok(body, Some(items.len())),
        Err(_) => ApiResponse::message(
            StatusCode::INTERNAL_SERVER_ERROR,
            "serialization failed",
            "serialization",
        ),
    }
}

/// Maps a store failure to a 500 response without leaking details.
fn store_failure() -> ApiResponse {
    ApiResponse::message(StatusCode::INTERNAL_SERVER_ERROR, "KPI store unavailable", "store")
}

/// Reasons a replace body is rejected before reaching the store.
#[derive(Debug, PartialEq, Eq)]
enum ReplaceRejection {
    /// Body exceeds the configured limit.
    TooLarge,
    /// Body is not JSON or not an array.
    InvalidFormat,
    /// An element is not a valid record.
    InvalidRecord {
        /// Zero-based element index.
        index: usize,
        /// Decoder or validation message.
        reason: String,
    },
}

impl ReplaceRejection {
    /// Classifies a body that axum failed to buffer.
    fn from_body_rejection(rejection: &BytesRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Self::TooLarge
        } else {
            Self::InvalidFormat
        }
    }

    /// Converts the rejection into an error response.
    fn into_response_body(self) -> ApiResponse {
        match self {
            Self::TooLarge => ApiResponse::message(
                StatusCode::PAYLOAD_TOO_LARGE,
                "request body too large",
                "too_large",
            ),
            Self::InvalidFormat => {
                ApiResponse::message(StatusCode::BAD_REQUEST, INVALID_FORMAT_MESSAGE, "invalid_format")
            }
            Self::InvalidRecord {
                index,
                reason,
            } => ApiResponse::error(
                StatusCode::BAD_REQUEST,
                json!({
                    "error": format!("Invalid KPI record at index {index}: {reason}"),
                    "index": index,
                }),
                "invalid_record",
            ),
        }
    }
}

/// Parses and validates a replace body.
fn parse_replace_body(bytes: &[u8]) -> Result<Vec<KpiRecord>, ReplaceRejection> {
    let Ok(Value::Array(items)) = serde_json::from_slice::<Value>(bytes) else {
        return Err(ReplaceRejection::InvalidFormat);
    };
    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            let record: KpiRecord =
                serde_json::from_value(item).map_err(|err| ReplaceRejection::InvalidRecord {
                    index,
                    reason: err.to_string(),
                })?;
            record.validate().map_err(|err| ReplaceRejection::InvalidRecord {
                index,
                reason: err.to_string(),
            })?;
            Ok(record)
        })
        .collect()
}

/// Runs a store call, shifting to a blocking context when available.
fn run_blocking<T>(operation: impl FnOnce() -> T) -> T {
    match tokio::runtime::Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == tokio::runtime::RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(operation)
        }
        _ => operation(),
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// KPI server errors.
#[derive(Debug, Error)]
pub enum KpiServerError {
    /// Configuration errors.
    #[error("config error: {0}")]
    Config(String),
    /// Initialization errors.
    #[error("init error: {0}")]
    Init(String),
    /// Transport errors.
    #[error("transport error: {0}")]
    Transport(String),
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
