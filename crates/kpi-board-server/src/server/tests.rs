// crates/kpi-board-server/src/server/tests.rs
// ============================================================================
// Module: KPI Server Unit Tests
// Description: Handler, body parsing, seeding, and audit tests.
// Purpose: Validate HTTP semantics against in-memory fixtures.
// Dependencies: kpi-board-server
// ============================================================================

//! ## Overview
//! Calls the axum handlers directly with in-memory stores and a recording
//! audit sink.

// ============================================================================
// SECTION: Lint Configuration
// ============================================================================

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::float_cmp,
    reason = "Test-only assertions."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Read;
use std::io::Write;
use std::net::SocketAddr;
use std::net::TcpStream;
use std::sync::Arc;
use std::sync::Mutex;

use axum::body::Bytes;
use axum::body::to_bytes;
use axum::extract::ConnectInfo;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Response;
use kpi_board_config::KpiBoardConfig;
use kpi_board_core::IngestedAt;
use kpi_board_core::InMemoryKpiStore;
use kpi_board_core::KpiRecord;
use kpi_board_core::KpiStore;
use kpi_board_core::SharedKpiStore;
use kpi_board_core::StoreError;
use kpi_board_core::StoredKpi;
use serde_json::Value;
use serde_json::json;
use tokio::net::TcpListener;

use super::INVALID_FORMAT_MESSAGE;
use super::KpiServer;
use super::ReplaceRejection;
use super::UPDATED_MESSAGE;
use super::handle_get_gauges;
use super::handle_get_kpis;
use super::handle_healthz;
use super::handle_post_kpis;
use super::parse_replace_body;
use crate::audit::KpiAuditSink;
use crate::audit::KpiIngestEvent;
use crate::audit::KpiRequestEvent;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

#[derive(Default)]
struct RecordingAuditSink {
    requests: Mutex<Vec<KpiRequestEvent>>,
    ingests: Mutex<Vec<KpiIngestEvent>>,
}

impl KpiAuditSink for RecordingAuditSink {
    fn record_request(&self, event: &KpiRequestEvent) {
        self.requests.lock().unwrap().push(event.clone());
    }

    fn record_ingest(&self, event: &KpiIngestEvent) {
        self.ingests.lock().unwrap().push(event.clone());
    }
}

struct UnavailableStore;

impl KpiStore for UnavailableStore {
    fn replace_all(&self, _records: &[KpiRecord]) -> Result<IngestedAt, StoreError> {
        Err(StoreError::Io("disk gone".to_string()))
    }

    fn recent(&self, _limit: usize) -> Result<Vec<StoredKpi>, StoreError> {
        Err(StoreError::Io("disk gone".to_string()))
    }

    fn readiness(&self) -> Result<(), StoreError> {
        Err(StoreError::Io("disk gone".to_string()))
    }
}

struct Fixture {
    server: KpiServer,
    store: InMemoryKpiStore,
    audit: Arc<RecordingAuditSink>,
}

fn fixture(config: KpiBoardConfig) -> Fixture {
    let store = InMemoryKpiStore::new();
    let audit = Arc::new(RecordingAuditSink::default());
    let server = KpiServer::with_store(
        config,
        SharedKpiStore::from_store(store.clone()),
        Arc::clone(&audit) as Arc<dyn KpiAuditSink>,
    )
    .unwrap();
    Fixture {
        server,
        store,
        audit,
    }
}

fn peer() -> ConnectInfo<SocketAddr> {
    ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 3456)))
}

fn record(name: &str, weight: f64, score: Option<f64>) -> KpiRecord {
    KpiRecord {
        name: name.to_string(),
        rate: Some(80.0),
        target: Some(100.0),
        weight,
        objective: Some(100.0),
        realized: Some(80.0),
        score,
    }
}

fn body_json(response: Response) -> (StatusCode, Value) {
    let status = response.status();
    let runtime = tokio::runtime::Runtime::new().expect("runtime");
    let bytes = runtime.block_on(to_bytes(response.into_body(), usize::MAX)).unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn post(fixture: &Fixture, body: &[u8]) -> (StatusCode, Value) {
    let runtime = tokio::runtime::Runtime::new().expect("runtime");
    let response = runtime.block_on(handle_post_kpis(
        State(Arc::clone(&fixture.server.state)),
        peer(),
        Ok(Bytes::copy_from_slice(body)),
    ));
    body_json(response)
}

fn get_kpis(fixture: &Fixture) -> (StatusCode, Value) {
    let runtime = tokio::runtime::Runtime::new().expect("runtime");
    let response =
        runtime.block_on(handle_get_kpis(State(Arc::clone(&fixture.server.state)), peer()));
    body_json(response)
}

// ============================================================================
// SECTION: Retrieval
// ============================================================================

#[test]
fn get_kpis_on_empty_store_returns_empty_list() {
    let fixture = fixture(KpiBoardConfig::default());
    let (status, body) = get_kpis(&fixture);
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[test]
fn get_kpis_caps_results_at_read_limit() {
    let mut config = KpiBoardConfig::default();
    config.store.read_limit = 3;
    let fixture = fixture(config);
    let records: Vec<KpiRecord> =
        (0 .. 5).map(|idx| record(&format!("kpi-{idx}"), 1.0, None)).collect();
    fixture.store.replace_all(&records).unwrap();

    let (status, body) = get_kpis(&fixture);
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> =
        body.as_array().unwrap().iter().map(|item| item["name"].as_str().unwrap()).collect();
    assert_eq!(names, ["kpi-0", "kpi-1", "kpi-2"]);
}

#[test]
fn get_kpis_exposes_null_score() {
    let fixture = fixture(KpiBoardConfig::default());
    fixture.store.replace_all(&[record("Ops - Uptime", 5.0, None)]).unwrap();
    let (_, body) = get_kpis(&fixture);
    assert_eq!(body[0]["score"], Value::Null);
    assert_eq!(body[0]["weight"], 5.0);
}

#[test]
fn get_gauges_scores_records() {
    let fixture = fixture(KpiBoardConfig::default());
    fixture
        .store
        .replace_all(&[record("Sales - Q1", 10.0, Some(8.0)), record("Zero", 0.0, Some(3.0))])
        .unwrap();
    let runtime = tokio::runtime::Runtime::new().expect("runtime");
    let response =
        runtime.block_on(handle_get_gauges(State(Arc::clone(&fixture.server.state)), peer()));
    let (status, body) = body_json(response);
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["display_percent"], 80.0);
    assert_eq!(body[0]["band"], "good");
    assert_eq!(body[0]["label"], "80.0%");
    assert_eq!(body[1]["display_percent"], 0.0);
    assert_eq!(body[1]["band"], "bad");
}

// ============================================================================
// SECTION: Replace
// ============================================================================

#[test]
fn post_replaces_stored_records() {
    let fixture = fixture(KpiBoardConfig::default());
    fixture.store.replace_all(&[record("Old", 1.0, None)]).unwrap();

    let body = json!([
        {"name": "Sales - Q1", "rate": 80.0, "target": 100.0, "weight": 10.0,
         "objective": 100.0, "realized": 80.0, "score": 8.0},
        {"name": "Ops - Uptime", "weight": 5.0}
    ]);
    let (status, reply) = post(&fixture, &serde_json::to_vec(&body).unwrap());
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reply, json!({"message": UPDATED_MESSAGE, "count": 2}));

    let (_, listed) = get_kpis(&fixture);
    let names: Vec<&str> =
        listed.as_array().unwrap().iter().map(|item| item["name"].as_str().unwrap()).collect();
    assert_eq!(names, ["Sales - Q1", "Ops - Uptime"]);
    assert_eq!(listed[1]["rate"], Value::Null);
}

#[test]
fn post_accepts_legacy_field_names() {
    let fixture = fixture(KpiBoardConfig::default());
    let body = json!([{"kpi_name": "Legacy", "poids": 2.0, "obj": 4.0, "real": 3.0}]);
    let (status, _) = post(&fixture, &serde_json::to_vec(&body).unwrap());
    assert_eq!(status, StatusCode::OK);
    let stored = fixture.store.recent(16).unwrap();
    assert_eq!(stored[0].record.name, "Legacy");
    assert_eq!(stored[0].record.objective, Some(4.0));
    assert_eq!(stored[0].record.realized, Some(3.0));
}

#[test]
fn post_empty_list_clears_store() {
    let fixture = fixture(KpiBoardConfig::default());
    fixture.store.replace_all(&[record("Old", 1.0, None)]).unwrap();
    let (status, reply) = post(&fixture, b"[]");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reply["count"], 0);
    assert!(fixture.store.recent(16).unwrap().is_empty());
}

#[test]
fn post_non_list_is_rejected_without_store_change() {
    let fixture = fixture(KpiBoardConfig::default());
    fixture.store.replace_all(&[record("Kept", 1.0, None)]).unwrap();

    for body in [&b"{\"name\": \"x\"}"[..], b"not json", b"42"] {
        let (status, reply) = post(&fixture, body);
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(reply, json!({"error": INVALID_FORMAT_MESSAGE}));
    }
    assert_eq!(fixture.store.recent(16).unwrap()[0].record.name, "Kept");
}

#[test]
fn post_bad_element_names_its_index() {
    let fixture = fixture(KpiBoardConfig::default());
    fixture.store.replace_all(&[record("Kept", 1.0, None)]).unwrap();
    let body = json!([{"name": "Fine", "weight": 1.0}, {"name": "No weight"}]);
    let (status, reply) = post(&fixture, &serde_json::to_vec(&body).unwrap());
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(reply["index"], 1);
    assert!(reply["error"].as_str().unwrap().contains("index 1"));
    assert_eq!(fixture.store.recent(16).unwrap()[0].record.name, "Kept");
}

#[test]
fn post_oversized_body_is_rejected_and_audited() {
    let mut config = KpiBoardConfig::default();
    config.server.max_body_bytes = 16;
    let fixture = fixture(config);
    let body = br#"[{"name": "a long enough name", "weight": 1}]"#;

    let runtime = tokio::runtime::Runtime::new().expect("runtime");
    let listener = runtime.block_on(TcpListener::bind("127.0.0.1:0")).unwrap();
    let addr = listener.local_addr().unwrap();
    let app = fixture.server.router().into_make_service_with_connect_info::<SocketAddr>();
    runtime.spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    let mut stream = TcpStream::connect(addr).unwrap();
    let mut request = format!(
        "POST /api/kpis HTTP/1.1\r\nHost: {addr}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        body.len()
    )
    .into_bytes();
    request.extend_from_slice(body);
    stream.write_all(&request).unwrap();
    let mut reply = String::new();
    stream.read_to_string(&mut reply).unwrap();

    assert!(reply.starts_with("HTTP/1.1 413"), "unexpected reply: {reply}");
    assert!(reply.contains("request body too large"));
    assert!(fixture.store.recent(16).unwrap().is_empty());
    let events = fixture.audit.requests.lock().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].status, 413);
    assert_eq!(events[0].error_kind, Some("too_large"));
}

#[test]
fn parse_replace_body_classifies_rejections() {
    assert!(matches!(
        parse_replace_body(b"[1]"),
        Err(ReplaceRejection::InvalidRecord { index: 0, .. })
    ));
    assert_eq!(parse_replace_body(b"null"), Err(ReplaceRejection::InvalidFormat));
    assert_eq!(parse_replace_body(b"[]"), Ok(Vec::new()));
}

#[test]
fn parse_replace_body_rejects_non_finite_weight_by_type() {
    let Err(ReplaceRejection::InvalidRecord {
        index, ..
    }) = parse_replace_body(br#"[{"name": "a", "weight": "NaN"}]"#)
    else {
        panic!("expected string weight to be rejected");
    };
    assert_eq!(index, 0);
}

// ============================================================================
// SECTION: Health and Audit
// ============================================================================

#[test]
fn healthz_reports_ok_and_unavailable() {
    let fixture = fixture(KpiBoardConfig::default());
    let runtime = tokio::runtime::Runtime::new().expect("runtime");
    let response =
        runtime.block_on(handle_healthz(State(Arc::clone(&fixture.server.state)), peer()));
    let (status, body) = body_json(response);
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok"}));

    let broken = KpiServer::with_store(
        KpiBoardConfig::default(),
        SharedKpiStore::from_store(UnavailableStore),
        Arc::new(RecordingAuditSink::default()),
    )
    .unwrap();
    let response = runtime.block_on(handle_healthz(State(Arc::clone(&broken.state)), peer()));
    let (status, _) = body_json(response);
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let response = runtime.block_on(handle_get_kpis(State(Arc::clone(&broken.state)), peer()));
    let (status, body) = body_json(response);
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(!body["error"].as_str().unwrap().contains("disk gone"));
}

#[test]
fn requests_are_audited_with_status_and_counts() {
    let fixture = fixture(KpiBoardConfig::default());
    let _ = post(&fixture, br#"[{"name": "a", "weight": 1}]"#);
    let _ = post(&fixture, b"{}");
    let _ = get_kpis(&fixture);

    let events = fixture.audit.requests.lock().unwrap();
    assert_eq!(events.len(), 3);
    assert_eq!(events[0].method, "POST");
    assert_eq!(events[0].status, 200);
    assert_eq!(events[0].record_count, Some(1));
    assert_eq!(events[1].status, 400);
    assert_eq!(events[1].error_kind, Some("invalid_format"));
    assert_eq!(events[2].route, "/api/kpis");
    assert_eq!(events[2].peer_ip.as_deref(), Some("127.0.0.1"));
}

// ============================================================================
// SECTION: Startup Seeding
// ============================================================================

#[test]
fn seed_from_source_ingests_bulk_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("kpi_data.json");
    let rows = json!([
        {"Objectifs": "Sales - Q1", "Taux de réalisation": 0.8, "OBJECTIF 2025": 100,
         "poids": 10, "Réalisation 2025": 80, "score": 8},
        {"Objectifs": "Dropped", "Taux de réalisation": 1, "OBJECTIF 2025": 1,
         "poids": null, "Réalisation 2025": 1, "score": 1}
    ]);
    std::fs::write(&path, serde_json::to_vec(&rows).unwrap()).unwrap();
    let mut config = KpiBoardConfig::default();
    config.source.file = path;
    let fixture = fixture(config);

    let report = fixture.server.seed_from_source().unwrap();
    assert_eq!(report.rows_kept, 1);
    assert_eq!(report.rows_dropped, 1);
    assert_eq!(fixture.store.recent(16).unwrap()[0].record.rate, Some(80.0));
    assert_eq!(fixture.audit.ingests.lock().unwrap()[0].outcome, "ok");
}

#[test]
fn seed_from_source_is_non_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = KpiBoardConfig::default();
    config.source.file = dir.path().join("missing.json");
    let fixture = fixture(config);
    assert!(fixture.server.seed_from_source().is_none());
    assert_eq!(fixture.audit.ingests.lock().unwrap()[0].outcome, "skipped");

    let bad = dir.path().join("bad.json");
    std::fs::write(&bad, br#"[{"Objectifs": "x"}]"#).unwrap();
    let mut config = KpiBoardConfig::default();
    config.source.file = bad;
    let fixture = self::fixture(config);
    assert!(fixture.server.seed_from_source().is_none());
    assert_eq!(fixture.audit.ingests.lock().unwrap()[0].outcome, "error");
    assert!(fixture.store.recent(16).unwrap().is_empty());
}

#[test]
fn seed_from_source_respects_disabled_flag() {
    let mut config = KpiBoardConfig::default();
    config.source.seed_on_startup = false;
    let fixture = fixture(config);
    assert!(fixture.server.seed_from_source().is_none());
    assert!(fixture.audit.ingests.lock().unwrap().is_empty());
}
