//! Reference range resolution
//!
//! Resolution order, first success wins:
//! 1. explicit `ranges.normal_min` / `ranges.normal_max` on the test
//! 2. the textual `reference_range` ("13.0 - 17.0")
//! 3. the exact-name lookup in [`ReferenceTables`]
//! 4. the default `0..=100`
//!
//! No step can fail the pipeline; a miss just moves on to the next step.

use crate::report::LabTest;
use crate::tables::ReferenceTables;
use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Two unsigned numeric tokens joined by a dash, optionally followed by
/// another dash. Applied after all whitespace has been removed.
static RANGE_TEXT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d+(?:\.\d*)?|\.\d+)-(\d+(?:\.\d*)?|\.\d+)(?:-|$)")
        .expect("range pattern is valid")
});

/// Inclusive numeric bounds considered healthy for a test
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReferenceRange {
    pub min: f64,
    pub max: f64,
}

impl ReferenceRange {
    /// Substituted when nothing else resolves
    pub const DEFAULT: ReferenceRange = ReferenceRange {
        min: 0.0,
        max: 100.0,
    };

    /// Build a range, swapping bounds given in reverse
    pub fn new(a: f64, b: f64) -> Self {
        if a <= b {
            Self { min: a, max: b }
        } else {
            Self { min: b, max: a }
        }
    }

    /// Inclusive containment check
    pub fn contains(&self, value: f64) -> bool {
        self.min <= value && value <= self.max
    }

    pub fn width(&self) -> f64 {
        self.max - self.min
    }
}

impl From<(f64, f64)> for ReferenceRange {
    fn from((min, max): (f64, f64)) -> Self {
        ReferenceRange::new(min, max)
    }
}

/// Which resolution step produced a range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RangeSource {
    Explicit,
    Text,
    Table,
    Default,
}

/// A range together with where it came from
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResolvedRange {
    #[serde(flatten)]
    pub range: ReferenceRange,
    pub source: RangeSource,
}

impl ResolvedRange {
    fn new(range: ReferenceRange, source: RangeSource) -> Self {
        Self { range, source }
    }
}

/// Parse a textual range such as `"13.0 - 17.0"` or `"4000-11000"`.
///
/// The dash is always the separator, so neither bound may carry a sign:
/// `"-2-3"` and `"13--2"` do not parse and resolution falls through to the
/// next step.
pub fn parse_range_text(text: &str) -> Option<ReferenceRange> {
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    let caps = RANGE_TEXT.captures(&compact)?;

    let min = caps.get(1)?.as_str().parse::<f64>().ok()?;
    let max = caps.get(2)?.as_str().parse::<f64>().ok()?;
    Some(ReferenceRange::new(min, max))
}

/// Resolve using steps 1-3 only; `None` when no real range is known
pub fn resolve_known(test: &LabTest, tables: &ReferenceTables) -> Option<ResolvedRange> {
    if let Some(ranges) = test.ranges.filter(|r| !r.is_empty()) {
        let range = ReferenceRange::new(
            ranges.normal_min.unwrap_or(ReferenceRange::DEFAULT.min),
            ranges.normal_max.unwrap_or(ReferenceRange::DEFAULT.max),
        );
        return Some(ResolvedRange::new(range, RangeSource::Explicit));
    }

    if let Some(text) = test.reference_range.as_deref() {
        match parse_range_text(text) {
            Some(range) => return Some(ResolvedRange::new(range, RangeSource::Text)),
            None => debug!(test = %test.name, range = text, "Unparseable reference range"),
        }
    }

    tables
        .normal_range(&test.name)
        .map(|bounds| ResolvedRange::new(bounds.into(), RangeSource::Table))
}

/// Resolve the applicable range, falling back to `0..=100`
pub fn resolve(test: &LabTest, tables: &ReferenceTables) -> ResolvedRange {
    resolve_known(test, tables)
        .unwrap_or_else(|| ResolvedRange::new(ReferenceRange::DEFAULT, RangeSource::Default))
}
