//! Section validation tests for kpi-board-config.
// crates/kpi-board-config/tests/section_validation.rs
// =============================================================================
// Module: Section Validation Tests
// Description: Validate per-section limits and cross-field rules.
// Purpose: Ensure invalid settings fail closed before any service starts.
// =============================================================================

use std::path::PathBuf;

mod common;

use common::assert_invalid;

type TestResult = Result<(), String>;

#[test]
fn default_config_is_valid() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.validate().map_err(|err| err.to_string())
}

#[test]
fn server_rejects_bad_bind() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.server.bind = "localhost".to_string();
    assert_invalid(config.validate(), "server.bind is invalid")
}

#[test]
fn server_rejects_zero_body_limit() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.server.max_body_bytes = 0;
    assert_invalid(config.validate(), "server.max_body_bytes")
}

#[test]
fn audit_path_must_be_non_empty() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.server.audit.path = Some("  ".to_string());
    assert_invalid(config.validate(), "server.audit.path must be non-empty")
}

#[test]
fn store_rejects_empty_path_and_bad_read_limit() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.store.path = PathBuf::new();
    assert_invalid(config.validate(), "store.path must be non-empty")?;

    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.store.read_limit = 0;
    assert_invalid(config.validate(), "store.read_limit")
}

#[test]
fn source_rejects_oversized_limit() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.source.max_file_bytes = usize::MAX;
    assert_invalid(config.validate(), "source.max_file_bytes")
}

#[test]
fn board_rejects_inverted_thresholds() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.board.good_threshold = 40.0;
    config.board.warn_threshold = 60.0;
    assert_invalid(config.validate(), "board thresholds")
}

#[test]
fn board_rejects_out_of_range_threshold() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.board.good_threshold = 120.0;
    assert_invalid(config.validate(), "good threshold")
}

#[test]
fn board_rejects_non_http_url() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.board.api_url = Some("ftp://example.com/kpis".to_string());
    assert_invalid(config.validate(), "board.api_url must be an http or https url")
}

#[test]
fn board_rejects_tiny_timeout() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.board.request_timeout_ms = 1;
    assert_invalid(config.validate(), "board.request_timeout_ms")
}
