// crates/kpi-board-cli/tests/common/mod.rs
// ============================================================================
// Module: Board Feed Test Helpers
// Description: Stub retrieval endpoint and bulk file fixtures.
// Purpose: Drive feed fallbacks against a real HTTP listener.
// Dependencies: axum, tokio
// ============================================================================

//! Shared helpers for board feed integration tests.

#![allow(dead_code, reason = "Helpers are shared across integration test crates.")]

use std::net::TcpListener as StdTcpListener;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use kpi_board_cli::FeedSettings;
use serde_json::Value;
use serde_json::json;
use tokio::runtime::Builder;
use tokio::sync::oneshot;

/// Canned stub reply.
#[derive(Clone)]
struct StubState {
    status: StatusCode,
    body: String,
    hits: Arc<AtomicUsize>,
}

/// Handle for the stub retrieval endpoint.
pub struct KpiApiStub {
    url: String,
    hits: Arc<AtomicUsize>,
    shutdown: Option<oneshot::Sender<()>>,
    join: Option<thread::JoinHandle<()>>,
}

impl KpiApiStub {
    /// Returns the retrieval URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns the number of requests served.
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

impl Drop for KpiApiStub {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

async fn handle_kpis(State(state): State<StubState>) -> impl IntoResponse {
    state.hits.fetch_add(1, Ordering::SeqCst);
    (state.status, state.body)
}

/// Spawns a stub that answers `GET /api/kpis` with a fixed status and body.
pub fn spawn_kpi_stub(status: StatusCode, body: impl Into<String>) -> Result<KpiApiStub, String> {
    let listener =
        StdTcpListener::bind("127.0.0.1:0").map_err(|err| format!("stub bind failed: {err}"))?;
    listener.set_nonblocking(true).map_err(|err| format!("stub nonblocking failed: {err}"))?;
    let addr = listener.local_addr().map_err(|err| format!("stub local addr failed: {err}"))?;
    let hits = Arc::new(AtomicUsize::new(0));
    let state = StubState {
        status,
        body: body.into(),
        hits: Arc::clone(&hits),
    };
    let app = Router::new().route("/api/kpis", get(handle_kpis)).with_state(state);
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let join = thread::spawn(move || {
        let Ok(runtime) = Builder::new_current_thread().enable_all().build() else {
            return;
        };
        runtime.block_on(async move {
            let Ok(listener) = tokio::net::TcpListener::from_std(listener) else {
                return;
            };
            let server = axum::serve(listener, app).with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            });
            let _ = server.await;
        });
    });
    Ok(KpiApiStub {
        url: format!("http://{addr}/api/kpis"),
        hits,
        shutdown: Some(shutdown_tx),
        join: Some(join),
    })
}

/// Returns a URL on a port with no listener.
pub fn unreachable_url() -> Result<String, String> {
    let listener =
        StdTcpListener::bind("127.0.0.1:0").map_err(|err| format!("bind failed: {err}"))?;
    let addr = listener.local_addr().map_err(|err| format!("local addr failed: {err}"))?;
    drop(listener);
    Ok(format!("http://{addr}/api/kpis"))
}

/// Feed settings pointing at `url` with `file` as fallback.
pub fn settings(url: &str, file: &Path, cache_ttl: Duration) -> FeedSettings {
    FeedSettings {
        api_url: url.to_string(),
        request_timeout: Duration::from_secs(5),
        cache_ttl,
        fallback_file: file.to_path_buf(),
        max_file_bytes: 1024 * 1024,
        read_limit: 16,
    }
}

/// Records in the retrieval wire shape.
pub fn api_records() -> Value {
    json!([
        {"name": "Sales - Q1", "rate": 80.0, "target": 100.0, "weight": 10.0,
         "objective": 100.0, "realized": 80.0, "score": 8.0},
        {"name": "Ops - Uptime", "rate": null, "target": null, "weight": 5.0,
         "objective": null, "realized": null, "score": null}
    ])
}

/// Rows in the bulk file format.
pub fn bulk_rows() -> Value {
    json!([
        {"Objectifs": null, "Column2": "Sales", "Column3": "Q1", "poids": 10, "score": 8,
         "Taux de réalisation": 0.5, "OBJECTIF 2025": 100, "Réalisation 2025": 90},
        {"Objectifs": "No Weight", "poids": null, "score": 1,
         "Taux de réalisation": 1, "OBJECTIF 2025": 1, "Réalisation 2025": 1}
    ])
}

/// `count` bulk rows named `KPI {idx}`, all with a weight.
pub fn many_bulk_rows(count: usize) -> Value {
    let rows: Vec<Value> = (0 .. count)
        .map(|idx| {
            json!({"Objectifs": format!("KPI {idx}"), "poids": 2, "score": 1,
                   "Taux de réalisation": 0.5, "OBJECTIF 2025": 10, "Réalisation 2025": 5})
        })
        .collect();
    Value::Array(rows)
}

/// Writes a JSON value to `path`.
pub fn write_json(path: &Path, value: &Value) -> Result<(), String> {
    let bytes = serde_json::to_vec(value).map_err(|err| err.to_string())?;
    std::fs::write(path, bytes).map_err(|err| err.to_string())
}
