//! Longitudinal comparison of two reports
//!
//! Tests are aligned by exact name. Every aligned pair whose values both
//! parse gets a [`TrendRecord`]; anything else is skipped silently.
//!
//! # Classification
//!
//! | previous      | current       | tag                                  |
//! |---------------|---------------|--------------------------------------|
//! | in range      | in range      | `unchanged` / `changed_within_normal` |
//! | out of range  | out of range  | `still_abnormal`                     |
//! | out of range  | in range      | `improved`                           |
//! | in range      | out of range  | `worsened`                           |
//! | no known range for either side | | `unchanged` / `increased` / `decreased` |
//!
//! `unchanged` means `|pct_change| < 0.1`. A large change that stays inside
//! the range is still `changed_within_normal`.

use crate::range::{resolve_known, ReferenceRange};
use crate::report::{LabReport, LabTest};
use crate::tables::ReferenceTables;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Absolute percent change below which two values count as unchanged
pub const UNCHANGED_THRESHOLD_PCT: f64 = 0.1;

/// How a test moved between two reports
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum TrendClass {
    Unchanged,
    ChangedWithinNormal,
    StillAbnormal,
    Improved,
    Worsened,
    /// Direction only; no known range to judge against
    Increased,
    /// Direction only; no known range to judge against
    Decreased,
}

/// One test compared across two reports
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendRecord {
    pub name: String,
    pub unit: String,
    /// `[previous, current]`
    pub values: [f64; 2],
    pub pct_change: f64,
    pub classification: TrendClass,
    /// Range the current value was judged against, if any was known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<ReferenceRange>,
    /// `[previous, current]` in-range judgement, absent without a range
    #[serde(skip_serializing_if = "Option::is_none")]
    pub in_range: Option<[bool; 2]>,
}

/// Percent change from `previous` to `current`; 0 when `previous` is 0
pub fn pct_change(previous: f64, current: f64) -> f64 {
    if previous == 0.0 {
        0.0
    } else {
        (current - previous) / previous * 100.0
    }
}

/// Apply the classification table
pub fn classify(pct_change: f64, in_range: Option<[bool; 2]>) -> TrendClass {
    let unchanged = pct_change.abs() < UNCHANGED_THRESHOLD_PCT;

    match in_range {
        Some([true, true]) if unchanged => TrendClass::Unchanged,
        Some([true, true]) => TrendClass::ChangedWithinNormal,
        Some([false, false]) => TrendClass::StillAbnormal,
        Some([false, true]) => TrendClass::Improved,
        Some([true, false]) => TrendClass::Worsened,
        None if unchanged => TrendClass::Unchanged,
        None if pct_change > 0.0 => TrendClass::Increased,
        None => TrendClass::Decreased,
    }
}

/// The lab's own flag decides when it speaks to the range; otherwise the
/// value is checked against the resolved bounds.
fn judged_in_range(test: &LabTest, value: f64, range: &ReferenceRange) -> bool {
    test.status
        .as_ref()
        .and_then(|status| status.lab_says_in_range())
        .unwrap_or_else(|| range.contains(value))
}

/// Compare one aligned pair, `None` when either value is unparseable
pub fn compare_tests(
    previous: &LabTest,
    current: &LabTest,
    tables: &ReferenceTables,
) -> Option<TrendRecord> {
    let (Some(v1), Some(v2)) = (previous.numeric_value(), current.numeric_value()) else {
        debug!(test = %previous.name, "Skipping trend: value not numeric in both reports");
        return None;
    };

    let previous_range = resolve_known(previous, tables).map(|r| r.range);
    let current_range = resolve_known(current, tables).map(|r| r.range);

    let ranges = match (previous_range, current_range) {
        (Some(a), Some(b)) => Some((a, b)),
        (Some(a), None) => Some((a, a)),
        (None, Some(b)) => Some((b, b)),
        (None, None) => None,
    };

    let in_range = ranges.map(|(a, b)| {
        [
            judged_in_range(previous, v1, &a),
            judged_in_range(current, v2, &b),
        ]
    });

    let pct = pct_change(v1, v2);

    Some(TrendRecord {
        name: previous.name.clone(),
        unit: match current.unit() {
            "" => previous.unit().to_string(),
            unit => unit.to_string(),
        },
        values: [v1, v2],
        pct_change: pct,
        classification: classify(pct, in_range),
        range: ranges.map(|(_, b)| b),
        in_range,
    })
}

/// Align two reports by test name and classify every numeric pair.
///
/// `previous` is the earlier report; records follow its test order.
pub fn compare_reports(
    previous: &LabReport,
    current: &LabReport,
    tables: &ReferenceTables,
) -> Vec<TrendRecord> {
    previous
        .tests
        .iter()
        .filter_map(|test| {
            let matched = current.find_test(&test.name)?;
            compare_tests(test, matched, tables)
        })
        .collect()
}

/// Trend records plus labels for the two sides
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendComparison {
    pub previous_label: String,
    pub current_label: String,
    pub records: Vec<TrendRecord>,
    /// Number of records per classification
    pub summary: BTreeMap<TrendClass, usize>,
}

impl TrendComparison {
    pub fn new(previous: &LabReport, current: &LabReport, tables: &ReferenceTables) -> Self {
        let records = compare_reports(previous, current, tables);

        let mut summary = BTreeMap::new();
        for record in &records {
            *summary.entry(record.classification).or_insert(0) += 1;
        }

        Self {
            previous_label: previous.label(),
            current_label: current.label(),
            records,
            summary,
        }
    }

    /// Records that moved out of range or stayed out of range
    pub fn needs_attention(&self) -> impl Iterator<Item = &TrendRecord> {
        self.records.iter().filter(|r| {
            matches!(
                r.classification,
                TrendClass::Worsened | TrendClass::StillAbnormal
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::PatientInfo;
    use rstest::rstest;

    fn tables() -> &'static ReferenceTables {
        ReferenceTables::builtin()
    }

    fn report(tests: Vec<LabTest>) -> LabReport {
        LabReport::new(PatientInfo::default(), tests)
    }

    #[test]
    fn test_hemoglobin_normalized_is_improved() {
        let a = report(vec![LabTest::new("HEMOGLOBIN", "16.2").with_status("HIGH")]);
        let b = report(vec![LabTest::new("HEMOGLOBIN", "15.4").with_status("NORMAL")]);

        let records = compare_reports(&a, &b, tables());
        assert_eq!(records.len(), 1);

        let record = &records[0];
        assert_eq!(record.classification, TrendClass::Improved);
        assert_eq!(record.values, [16.2, 15.4]);
        assert!((record.pct_change - (-4.938)).abs() < 0.01);
        assert_eq!(record.range, Some(ReferenceRange::new(13.0, 17.0)));
        assert_eq!(record.in_range, Some([false, true]));
    }

    #[test]
    fn test_unlisted_marker_small_change_is_unchanged() {
        let a = report(vec![LabTest::new("Unlisted Marker", 10.0)]);
        let b = report(vec![LabTest::new("Unlisted Marker", 10.005)]);

        let records = compare_reports(&a, &b, tables());
        assert_eq!(records.len(), 1);
        assert!((records[0].pct_change - 0.05).abs() < 1e-6);
        assert_eq!(records[0].classification, TrendClass::Unchanged);
        assert_eq!(records[0].range, None);
        assert_eq!(records[0].in_range, None);
    }

    #[rstest]
    #[case(10.0, 12.0, TrendClass::Increased)]
    #[case(10.0, 8.0, TrendClass::Decreased)]
    #[case(10.0, 10.0, TrendClass::Unchanged)]
    #[case(0.0, 50.0, TrendClass::Unchanged)]
    fn test_direction_without_range(
        #[case] v1: f64,
        #[case] v2: f64,
        #[case] expected: TrendClass,
    ) {
        let a = report(vec![LabTest::new("Vitamin D", v1)]);
        let b = report(vec![LabTest::new("Vitamin D", v2)]);
        assert_eq!(compare_reports(&a, &b, tables())[0].classification, expected);
    }

    #[rstest]
    #[case(30.0, 30.0, TrendClass::Unchanged)]
    #[case(21.0, 39.0, TrendClass::ChangedWithinNormal)]
    #[case(45.0, 50.0, TrendClass::StillAbnormal)]
    #[case(15.0, 25.0, TrendClass::Improved)]
    #[case(25.0, 45.0, TrendClass::Worsened)]
    fn test_range_rules_by_value(
        #[case] v1: f64,
        #[case] v2: f64,
        #[case] expected: TrendClass,
    ) {
        // Lymphocytes: 20-40 in the built-in table, no lab flags
        let a = report(vec![LabTest::new("Lymphocytes", v1)]);
        let b = report(vec![LabTest::new("Lymphocytes", v2)]);
        assert_eq!(compare_reports(&a, &b, tables())[0].classification, expected);
    }

    #[test]
    fn test_each_side_uses_its_own_range() {
        let a = report(vec![LabTest::new("Ferritin", 250.0).with_reference_range("30 - 200")]);
        let b = report(vec![LabTest::new("Ferritin", 250.0).with_reference_range("30 - 300")]);
        let record = &compare_reports(&a, &b, tables())[0];
        assert_eq!(record.classification, TrendClass::Improved);
        assert_eq!(record.range, Some(ReferenceRange::new(30.0, 300.0)));
    }

    #[test]
    fn test_one_sided_range_applies_to_both() {
        let a = report(vec![LabTest::new("Ferritin", 250.0).with_reference_range("30 - 200")]);
        let b = report(vec![LabTest::new("Ferritin", 150.0)]);
        let record = &compare_reports(&a, &b, tables())[0];
        assert_eq!(record.classification, TrendClass::Improved);
    }

    #[test]
    fn test_unknown_status_falls_back_to_numeric_check() {
        let a = report(vec![LabTest::new("Lymphocytes", 30.0).with_status("BORDERLINE")]);
        let b = report(vec![LabTest::new("Lymphocytes", 50.0).with_status("SEE NOTE")]);
        let record = &compare_reports(&a, &b, tables())[0];
        assert_eq!(record.classification, TrendClass::Worsened);
    }

    #[test]
    fn test_unparseable_or_unmatched_pairs_are_skipped() {
        let a = report(vec![
            LabTest::new("HBsAg", "NON REACTIVE"),
            LabTest::new("Only In A", 1.0),
            LabTest::new("Glucose", "95"),
        ]);
        let b = report(vec![
            LabTest::new("HBsAg", "NON REACTIVE"),
            LabTest::new("glucose", "95"),
            LabTest::new("Glucose", "110"),
        ]);

        let records = compare_reports(&a, &b, tables());
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "Glucose");
        assert_eq!(records[0].values, [95.0, 110.0]);
    }

    #[test]
    fn test_first_match_in_current_report_is_used() {
        let a = report(vec![LabTest::new("Unlisted", 10.0)]);
        let b = report(vec![LabTest::new("Unlisted", 20.0), LabTest::new("Unlisted", 5.0)]);
        assert_eq!(compare_reports(&a, &b, tables())[0].values, [10.0, 20.0]);
    }

    #[test]
    fn test_large_in_range_change_is_not_escalated() {
        assert_eq!(
            classify(95.0, Some([true, true])),
            TrendClass::ChangedWithinNormal
        );
    }

    #[test]
    fn test_comparison_summary() {
        let a = report(vec![
            LabTest::new("HEMOGLOBIN", "16.2").with_status("HIGH"),
            LabTest::new("Lymphocytes", 45.0),
            LabTest::new("Unlisted", 1.0),
        ]);
        let b = report(vec![
            LabTest::new("HEMOGLOBIN", "15.4").with_status("NORMAL"),
            LabTest::new("Lymphocytes", 48.0),
            LabTest::new("Unlisted", 2.0),
        ]);

        let comparison = TrendComparison::new(&a, &b, tables());
        assert_eq!(comparison.records.len(), 3);
        assert_eq!(comparison.summary[&TrendClass::Improved], 1);
        assert_eq!(comparison.summary[&TrendClass::StillAbnormal], 1);
        assert_eq!(comparison.summary[&TrendClass::Increased], 1);
        assert_eq!(comparison.needs_attention().count(), 1);
        assert_eq!(comparison.previous_label, "Unknown patient");
    }

    #[test]
    fn test_record_serialization_shape() {
        let a = report(vec![LabTest::new("Unlisted", 10.0)]);
        let b = report(vec![LabTest::new("Unlisted", 12.0)]);
        let json = serde_json::to_value(&compare_reports(&a, &b, tables())[0]).unwrap();

        assert_eq!(json["classification"], "increased");
        assert_eq!(json["values"], serde_json::json!([10.0, 12.0]));
        assert!(json.get("range").is_none());
    }
}
