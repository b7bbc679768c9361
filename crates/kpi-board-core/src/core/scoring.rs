// crates/kpi-board-core/src/core/scoring.rs
// ============================================================================
// Module: Score Calculator
// Description: Weight-normalized display percentages and color bands.
// Purpose: Turn stored KPI records into gauge readings.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! A gauge shows `score / weight * 100`, clamped to `[0, 100]`. Zero weight,
//! a null score, or an undefined quotient all display as `0`; a quotient that
//! overflows saturates at the matching bound. The display
//! value is then classified into a [`GaugeBand`] by a [`BandThresholds`] pair.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Serialize;
use thiserror::Error;

use crate::core::record::KpiRecord;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default lower bound (inclusive) of the good band.
pub const DEFAULT_GOOD_THRESHOLD: f64 = 80.0;
/// Default lower bound (inclusive) of the warn band.
pub const DEFAULT_WARN_THRESHOLD: f64 = 50.0;

/// Lowest display percentage.
const MIN_PERCENT: f64 = 0.0;
/// Highest display percentage.
const MAX_PERCENT: f64 = 100.0;

// ============================================================================
// SECTION: Display Percentage
// ============================================================================

/// Computes the clamped display percentage for a score and weight.
#[must_use]
pub fn display_percent(score: Option<f64>, weight: f64) -> f64 {
    let Some(score) = score else {
        return MIN_PERCENT;
    };
    if weight == 0.0 {
        return MIN_PERCENT;
    }
    let percent = score / weight * MAX_PERCENT;
    if percent.is_nan() { MIN_PERCENT } else { percent.clamp(MIN_PERCENT, MAX_PERCENT) }
}

// ============================================================================
// SECTION: Bands
// ============================================================================

/// Color band of a gauge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GaugeBand {
    /// At or above the good threshold.
    Good,
    /// At or above the warn threshold.
    Warn,
    /// Below the warn threshold.
    Bad,
}

/// Validated threshold pair used to band display percentages.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandThresholds {
    /// Inclusive lower bound of the good band.
    good: f64,
    /// Inclusive lower bound of the warn band.
    warn: f64,
}

/// Threshold validation failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScoringError {
    /// A threshold lies outside `[0, 100]` or is not finite.
    #[error("{name} threshold must be within 0..=100")]
    ThresholdOutOfRange {
        /// Threshold name (`good` or `warn`).
        name: &'static str,
    },
    /// The warn threshold exceeds the good threshold.
    #[error("warn threshold must not exceed good threshold")]
    ThresholdOrder,
}

impl BandThresholds {
    /// Builds a threshold pair.
    ///
    /// # Errors
    ///
    /// Returns [`ScoringError`] when either value is outside `[0, 100]` or
    /// `warn > good`.
    pub fn new(good: f64, warn: f64) -> Result<Self, ScoringError> {
        check_percent("good", good)?;
        check_percent("warn", warn)?;
        if warn > good {
            return Err(ScoringError::ThresholdOrder);
        }
        Ok(Self {
            good,
            warn,
        })
    }

    /// Lower bound of the good band.
    #[must_use]
    pub const fn good(&self) -> f64 {
        self.good
    }

    /// Lower bound of the warn band.
    #[must_use]
    pub const fn warn(&self) -> f64 {
        self.warn
    }

    /// Classifies a display percentage.
    #[must_use]
    pub fn classify(&self, percent: f64) -> GaugeBand {
        if percent >= self.good {
            GaugeBand::Good
        } else if percent >= self.warn {
            GaugeBand::Warn
        } else {
            GaugeBand::Bad
        }
    }
}

impl Default for BandThresholds {
    fn default() -> Self {
        Self {
            good: DEFAULT_GOOD_THRESHOLD,
            warn: DEFAULT_WARN_THRESHOLD,
        }
    }
}

/// Rejects thresholds outside `[0, 100]`.
fn check_percent(name: &'static str, value: f64) -> Result<(), ScoringError> {
    if value.is_finite() && (MIN_PERCENT ..= MAX_PERCENT).contains(&value) {
        Ok(())
    } else {
        Err(ScoringError::ThresholdOutOfRange {
            name,
        })
    }
}

// ============================================================================
// SECTION: Gauge Readings
// ============================================================================

/// Gauge view of one KPI record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GaugeReading {
    /// KPI name.
    pub name: String,
    /// Clamped weight-normalized percentage.
    pub display_percent: f64,
    /// Color band for `display_percent`.
    pub band: GaugeBand,
    /// Gauge label, e.g. `"80.0%"`.
    pub label: String,
    /// Realization rate percentage.
    pub rate: Option<f64>,
    /// Objective value.
    pub objective: Option<f64>,
    /// Realized value.
    pub realized: Option<f64>,
}

impl GaugeReading {
    /// Derives a gauge reading from a record.
    #[must_use]
    pub fn from_record(record: &KpiRecord, thresholds: &BandThresholds) -> Self {
        let percent = display_percent(record.score, record.weight);
        Self {
            name: record.name.clone(),
            display_percent: percent,
            band: thresholds.classify(percent),
            label: format!("{percent:.1}%"),
            rate: record.rate,
            objective: record.objective,
            realized: record.realized,
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        reason = "Test-only assertions on exact float constants."
    )]

    use super::BandThresholds;
    use super::GaugeBand;
    use super::GaugeReading;
    use super::ScoringError;
    use super::display_percent;
    use crate::core::record::KpiRecord;

    #[test]
    fn display_percent_degenerate_inputs_are_zero() {
        assert_eq!(display_percent(None, 10.0), 0.0);
        assert_eq!(display_percent(Some(5.0), 0.0), 0.0);
        assert_eq!(display_percent(Some(f64::NAN), 10.0), 0.0);
    }

    #[test]
    fn display_percent_overflow_saturates() {
        assert_eq!(display_percent(Some(1e300), 1e-10), 100.0);
        assert_eq!(display_percent(Some(f64::MAX), f64::MIN_POSITIVE), 100.0);
        assert_eq!(display_percent(Some(-f64::MAX), f64::MIN_POSITIVE), 0.0);
        let reading = GaugeReading::from_record(
            &KpiRecord {
                name: "Huge".to_string(),
                rate: None,
                target: None,
                weight: 1e-10,
                objective: None,
                realized: None,
                score: Some(1e300),
            },
            &BandThresholds::default(),
        );
        assert_eq!(reading.band, GaugeBand::Good);
        assert_eq!(reading.label, "100.0%");
    }

    #[test]
    fn display_percent_clamps() {
        assert_eq!(display_percent(Some(8.0), 10.0), 80.0);
        assert_eq!(display_percent(Some(30.0), 10.0), 100.0);
        assert_eq!(display_percent(Some(-3.0), 10.0), 0.0);
        assert_eq!(display_percent(Some(-3.0), -10.0), 30.0);
    }

    #[test]
    fn default_bands_split_at_80_and_50() {
        let thresholds = BandThresholds::default();
        assert_eq!(thresholds.classify(80.0), GaugeBand::Good);
        assert_eq!(thresholds.classify(79.9), GaugeBand::Warn);
        assert_eq!(thresholds.classify(50.0), GaugeBand::Warn);
        assert_eq!(thresholds.classify(49.9), GaugeBand::Bad);
    }

    #[test]
    fn thresholds_validate_range_and_order() {
        assert_eq!(BandThresholds::new(50.0, 80.0), Err(ScoringError::ThresholdOrder));
        assert_eq!(
            BandThresholds::new(101.0, 50.0),
            Err(ScoringError::ThresholdOutOfRange {
                name: "good"
            })
        );
        assert_eq!(
            BandThresholds::new(90.0, f64::NAN),
            Err(ScoringError::ThresholdOutOfRange {
                name: "warn"
            })
        );
        assert!(BandThresholds::new(70.0, 70.0).is_ok());
    }
}
