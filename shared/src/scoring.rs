//! Status scores and aggregate health scores
//!
//! All rules here are decision tables over the lab's status flag or a
//! value's position inside its reference range.
//!
//! # Scores
//!
//! | Status    | Score |
//! |-----------|-------|
//! | NORMAL    | 100   |
//! | HIGH, LOW | 70    |
//! | ABNORMAL  | 40    |
//! | other     | 50    |
//!
//! A test without any status is scored as NORMAL.

use crate::category::{categorize_test, Category};
use crate::range::ReferenceRange;
use crate::report::{LabTest, TestStatus};
use crate::tables::ReferenceTables;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// Per-test scores
// ============================================================================

pub const SCORE_NORMAL: f64 = 100.0;
pub const SCORE_OUT_OF_RANGE: f64 = 70.0;
pub const SCORE_ABNORMAL: f64 = 40.0;
pub const SCORE_UNKNOWN: f64 = 50.0;

/// Quality score for a lab status flag
pub fn score_of(status: &TestStatus) -> f64 {
    match status {
        TestStatus::Normal => SCORE_NORMAL,
        TestStatus::High | TestStatus::Low => SCORE_OUT_OF_RANGE,
        TestStatus::Abnormal => SCORE_ABNORMAL,
        TestStatus::Other(_) => SCORE_UNKNOWN,
    }
}

/// Score of a test, treating a missing status as NORMAL
pub fn test_score(test: &LabTest) -> f64 {
    test.status.as_ref().map_or(SCORE_NORMAL, score_of)
}

/// Round to one decimal place, ties to even (71.25 -> 71.2, 71.75 -> 71.8)
pub fn round1(value: f64) -> f64 {
    let scaled = value * 10.0;
    let floor = scaled.floor();
    let rounded = match scaled - floor {
        frac if frac < 0.5 => floor,
        frac if frac > 0.5 => floor + 1.0,
        _ if floor % 2.0 == 0.0 => floor,
        _ => floor + 1.0,
    };
    rounded / 10.0
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

// ============================================================================
// Aggregates
// ============================================================================

/// Average member score for every category; 0 for categories with no tests.
/// Uncategorized tests do not contribute.
pub fn category_scores(tests: &[LabTest], tables: &ReferenceTables) -> BTreeMap<Category, f64> {
    let mut members: BTreeMap<Category, Vec<f64>> =
        Category::ALL.iter().map(|c| (*c, Vec::new())).collect();

    for test in tests {
        if let Some(category) = categorize_test(test, tables) {
            members.entry(category).or_default().push(test_score(test));
        }
    }

    members
        .into_iter()
        .map(|(category, scores)| (category, mean(&scores).map_or(0.0, round1)))
        .collect()
}

/// Average of the category scores above zero, 0 when none qualify
pub fn overall_score(category_scores: &BTreeMap<Category, f64>) -> f64 {
    let active: Vec<f64> = category_scores
        .values()
        .copied()
        .filter(|score| *score > 0.0)
        .collect();
    mean(&active).map_or(0.0, round1)
}

/// Share of statused tests flagged NORMAL, as a percentage.
///
/// Coarser than [`overall_score`] and computed independently of categories.
pub fn health_score(tests: &[LabTest]) -> f64 {
    let statused = tests.iter().filter(|t| t.status.is_some()).count();
    if statused == 0 {
        return 0.0;
    }
    let normal = tests
        .iter()
        .filter(|t| t.status == Some(TestStatus::Normal))
        .count();
    round1(100.0 * normal as f64 / statused as f64)
}

// ============================================================================
// Health condition bands
// ============================================================================

/// Verbal band for an overall score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthCondition {
    Excellent,
    Good,
    Fair,
    NeedsAttention,
}

impl HealthCondition {
    pub fn from_score(score: f64) -> Self {
        if score >= 90.0 {
            HealthCondition::Excellent
        } else if score >= 75.0 {
            HealthCondition::Good
        } else if score >= 60.0 {
            HealthCondition::Fair
        } else {
            HealthCondition::NeedsAttention
        }
    }

    /// Label shown next to the overall score
    pub fn description(&self) -> &'static str {
        match self {
            HealthCondition::Excellent => "Excellent",
            HealthCondition::Good => "Good",
            HealthCondition::Fair => "Fair",
            HealthCondition::NeedsAttention => "Needs Attention",
        }
    }
}

// ============================================================================
// Value position within range
// ============================================================================

/// Where a value sits relative to its resolved range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RangeMarker {
    Low,
    Normal,
    High,
    /// The value could not be parsed
    Unknown,
}

pub fn range_marker(value: Option<f64>, range: &ReferenceRange) -> RangeMarker {
    match value {
        None => RangeMarker::Unknown,
        Some(v) if v < range.min => RangeMarker::Low,
        Some(v) if v > range.max => RangeMarker::High,
        Some(_) => RangeMarker::Normal,
    }
}

/// Maximum fill of a value bar; values above range extend at quarter rate
pub const GAUGE_MAX_FILL: f64 = 1.2;
const GAUGE_OVERFLOW_RATE: f64 = 0.25;

/// Fraction of a value bar to fill, `None` when the value is unparseable or
/// the range has zero width
pub fn gauge_fill_ratio(value: Option<f64>, range: &ReferenceRange) -> Option<f64> {
    let v = value?;
    let width = range.width();
    if width == 0.0 {
        return None;
    }

    let ratio = if v <= range.max {
        (v - range.min) / width
    } else {
        1.0 + (v - range.max) / width * GAUGE_OVERFLOW_RATE
    };
    Some(ratio.clamp(0.0, GAUGE_MAX_FILL))
}
