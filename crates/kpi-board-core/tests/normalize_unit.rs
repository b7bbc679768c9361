// crates/kpi-board-core/tests/normalize_unit.rs
// ============================================================================
// Module: Record Normalizer Tests
// Description: Example-based tests for bulk row normalization.
// Purpose: Pin column mapping, coercion, and schema gating behavior.
// ============================================================================

//! Record normalizer example tests.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::float_cmp,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use kpi_board_core::BandThresholds;
use kpi_board_core::GaugeBand;
use kpi_board_core::GaugeReading;
use kpi_board_core::NormalizeError;
use kpi_board_core::RawRow;
use kpi_board_core::normalize_rows;
use kpi_board_core::rows_from_value;
use serde_json::Value;
use serde_json::json;

fn rows(value: Value) -> Vec<RawRow> {
    rows_from_value(value).expect("rows")
}

fn full_row(weight: Value) -> Value {
    json!({
        "Objectifs": "Sales - Q1",
        "Taux de réalisation": 0.25,
        "OBJECTIF 2025": 200,
        "poids": weight,
        "Réalisation 2025": 50,
        "score": 2
    })
}

#[test]
fn fallback_name_scenario_yields_expected_gauge() {
    let input = rows(json!([{
        "Objectifs": null,
        "Column2": "Sales",
        "Column3": "Q1",
        "poids": 10,
        "score": 8,
        "Taux de réalisation": 0.5,
        "OBJECTIF 2025": 100,
        "Réalisation 2025": 90
    }]));
    let outcome = normalize_rows(&input).expect("normalize");
    assert_eq!(outcome.records.len(), 1);
    let record = &outcome.records[0];
    assert_eq!(record.name, "Sales - Q1");
    assert_eq!(record.rate, Some(50.0));
    assert_eq!(record.target, Some(100.0));
    assert_eq!(record.objective, Some(100.0));
    assert_eq!(record.realized, Some(90.0));

    let reading = GaugeReading::from_record(record, &BandThresholds::default());
    assert_eq!(reading.display_percent, 80.0);
    assert_eq!(reading.band, GaugeBand::Good);
    assert_eq!(reading.label, "80.0%");
}

#[test]
fn missing_fallback_labels_become_unknown() {
    let input = rows(json!([
        full_row(json!(1)),
        {"Objectifs": null, "Column2": "Ops", "poids": 1},
        {"poids": 1}
    ]));
    let outcome = normalize_rows(&input).expect("normalize");
    let names: Vec<&str> = outcome.records.iter().map(|record| record.name.as_str()).collect();
    assert_eq!(names, vec!["Sales - Q1", "Ops - Unknown", "Unknown - Unknown"]);
}

#[test]
fn rows_without_numeric_weight_are_dropped_and_counted() {
    let input = rows(json!([
        full_row(json!(4)),
        full_row(Value::Null),
        full_row(json!("heavy")),
        full_row(json!(" 2.5 ")),
        {"Objectifs": "no weight"}
    ]));
    let outcome = normalize_rows(&input).expect("normalize");
    assert_eq!(outcome.rows_read, 5);
    assert_eq!(outcome.rows_dropped, 3);
    let weights: Vec<f64> = outcome.records.iter().map(|record| record.weight).collect();
    assert_eq!(weights, vec![4.0, 2.5]);
}

#[test]
fn unparsable_numerics_become_null() {
    let input = rows(json!([{
        "Objectifs": "Quality",
        "Taux de réalisation": "n/a",
        "OBJECTIF 2025": true,
        "poids": 3,
        "Réalisation 2025": {"nested": 1},
        "score": ""
    }]));
    let outcome = normalize_rows(&input).expect("normalize");
    let record = &outcome.records[0];
    assert_eq!(record.rate, None);
    assert_eq!(record.target, None);
    assert_eq!(record.objective, None);
    assert_eq!(record.realized, None);
    assert_eq!(record.score, None);
}

#[test]
fn missing_columns_are_listed_in_required_order() {
    let input = rows(json!([{"Objectifs": "x", "score": 1}]));
    let err = normalize_rows(&input).unwrap_err();
    assert_eq!(
        err,
        NormalizeError::MissingColumns(vec![
            "Taux de réalisation".to_string(),
            "OBJECTIF 2025".to_string(),
            "poids".to_string(),
            "Réalisation 2025".to_string(),
        ])
    );
}

#[test]
fn schema_is_union_of_row_keys() {
    let input = rows(json!([
        {"Objectifs": "a", "Taux de réalisation": 0.1, "OBJECTIF 2025": 1},
        {"poids": 1, "Réalisation 2025": 2, "score": 3}
    ]));
    let outcome = normalize_rows(&input).expect("normalize");
    assert_eq!(outcome.records.len(), 1);
    assert_eq!(outcome.rows_dropped, 1);
}

#[test]
fn empty_array_fails_schema_check() {
    let err = normalize_rows(&[]).unwrap_err();
    assert!(matches!(err, NormalizeError::MissingColumns(columns) if columns.len() == 6));
}

#[test]
fn non_array_and_non_object_rows_are_rejected() {
    assert_eq!(rows_from_value(json!({"poids": 1})).unwrap_err(), NormalizeError::NotAnArray);
    assert_eq!(
        rows_from_value(json!([{}, 3])).unwrap_err(),
        NormalizeError::RowNotObject {
            index: 1
        }
    );
}

#[test]
fn rate_overflowing_after_scaling_becomes_null() {
    let mut row = full_row(json!(4));
    row["Taux de réalisation"] = json!(1e307);
    let outcome = normalize_rows(&rows(json!([row]))).expect("normalize");
    assert_eq!(outcome.records.len(), 1);
    assert_eq!(outcome.records[0].rate, None);
    assert_eq!(outcome.records[0].weight, 4.0);
}
