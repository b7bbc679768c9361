// crates/kpi-board-cli/src/render.rs
// ============================================================================
// Module: Board Rendering
// Description: Text and JSON renderings of gauge readings.
// Purpose: Present a feed snapshot on a terminal.
// Dependencies: kpi-board-core, serde_json
// ============================================================================

//! ## Overview
//! The board renders each record as a gauge row: a fixed-width bar, the
//! percentage label, and the band. Notices are rendered separately so callers
//! can route them to stderr.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt::Write as _;

use kpi_board_core::BandThresholds;
use kpi_board_core::GaugeBand;
use kpi_board_core::GaugeReading;
use kpi_board_core::KpiRecord;

use crate::feed::FeedNotice;
use crate::t;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Width of the textual gauge bar in cells.
pub const GAUGE_WIDTH: usize = 20;
/// Maximum displayed name width in characters.
const NAME_WIDTH: usize = 36;

// ============================================================================
// SECTION: Readings
// ============================================================================

/// Scores records for display.
#[must_use]
pub fn gauge_readings(records: &[KpiRecord], thresholds: &BandThresholds) -> Vec<GaugeReading> {
    records.iter().map(|record| GaugeReading::from_record(record, thresholds)).collect()
}

/// Renders readings as pretty-printed JSON.
///
/// # Errors
///
/// Returns [`serde_json::Error`] when serialization fails.
pub fn render_json(readings: &[GaugeReading]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(readings)
}

/// Renders readings as an aligned text table.
#[must_use]
pub fn render_table(readings: &[GaugeReading]) -> String {
    if readings.is_empty() {
        return t!("board.empty");
    }
    let mut output = String::new();
    let _ = writeln!(
        output,
        "{:<NAME_WIDTH$}  {:<bar$}  {:>7}  {:<6}  {:>9}  {:>10}  {:>10}",
        t!("board.header.name"),
        t!("board.header.gauge"),
        t!("board.header.percent"),
        "",
        t!("board.header.rate"),
        t!("board.header.objective"),
        t!("board.header.realized"),
        bar = GAUGE_WIDTH + 2,
    );
    for reading in readings {
        let _ = writeln!(
            output,
            "{:<NAME_WIDTH$}  [{}]  {:>7}  {:<6}  {:>9}  {:>10}  {:>10}",
            truncate_name(&reading.name),
            gauge_bar(reading.display_percent),
            reading.label,
            band_label(reading.band),
            optional_number(reading.rate),
            optional_number(reading.objective),
            optional_number(reading.realized),
        );
    }
    output.truncate(output.trim_end().len());
    output
}

/// Renders a fixed-width bar for a percentage in `[0, 100]`.
#[must_use]
pub fn gauge_bar(percent: f64) -> String {
    let filled = filled_cells(percent);
    let mut bar = "#".repeat(filled);
    bar.push_str(&"-".repeat(GAUGE_WIDTH - filled));
    bar
}

/// Number of filled bar cells for a percentage.
fn filled_cells(percent: f64) -> usize {
    let clamped = if percent.is_finite() { percent.clamp(0.0, 100.0) } else { 0.0 };
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss,
        reason = "Value is clamped to 0..=GAUGE_WIDTH before the cast."
    )]
    let cells = (clamped / 100.0 * GAUGE_WIDTH as f64).round() as usize;
    cells.min(GAUGE_WIDTH)
}

/// Localized band label.
fn band_label(band: GaugeBand) -> String {
    match band {
        GaugeBand::Good => t!("board.band.good"),
        GaugeBand::Warn => t!("board.band.warn"),
        GaugeBand::Bad => t!("board.band.bad"),
    }
}

/// Formats an optional value with one decimal, `-` when absent.
fn optional_number(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |value| format!("{value:.1}"))
}

/// Shortens long names to the column width.
fn truncate_name(name: &str) -> String {
    if name.chars().count() <= NAME_WIDTH {
        return name.to_string();
    }
    let mut short: String = name.chars().take(NAME_WIDTH - 1).collect();
    short.push('~');
    short
}

// ============================================================================
// SECTION: Notices
// ============================================================================

/// Renders a feed notice as a localized line.
#[must_use]
pub fn notice_message(notice: &FeedNotice) -> String {
    match notice {
        FeedNotice::ApiEmpty => t!("notice.api_empty"),
        FeedNotice::ApiFailed(error) => t!("notice.api_failed", error = error),
        FeedNotice::FileFallback(path) => t!("notice.file_fallback", path = path.display()),
        FeedNotice::FileMissing(path) => t!("notice.file_missing", path = path.display()),
        FeedNotice::FileInvalid(error) => t!("notice.file_invalid", error = error),
        FeedNotice::MirrorFailed(error) => t!("notice.mirror_failed", error = error),
        FeedNotice::StoreFailed(error) => t!("notice.store_failed", error = error),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
