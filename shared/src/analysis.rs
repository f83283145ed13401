//! Single-report pipeline
//!
//! Runs every test through value parsing, range resolution and
//! categorization, then aggregates the scores the rendering layer needs.

use crate::category::{categorize_test, Category};
use crate::range::{resolve, ResolvedRange};
use crate::report::{LabReport, LabTest, PatientInfo, TestStatus};
use crate::scoring::{
    category_scores, gauge_fill_ratio, health_score, overall_score, range_marker, test_score,
    HealthCondition, RangeMarker,
};
use crate::tables::ReferenceTables;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

/// Everything derived for one test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestAssessment {
    pub name: String,
    pub unit: String,
    /// Parsed value, absent when the raw value is not numeric
    pub value: Option<f64>,
    pub status: Option<TestStatus>,
    pub category: Option<Category>,
    pub score: f64,
    pub range: ResolvedRange,
    pub marker: RangeMarker,
    pub gauge: Option<f64>,
}

/// Derive the per-test view
pub fn assess_test(test: &LabTest, tables: &ReferenceTables) -> TestAssessment {
    let value = test.numeric_value();
    let range = resolve(test, tables);

    TestAssessment {
        name: test.name.clone(),
        unit: test.unit().to_string(),
        value,
        status: test.status.clone(),
        category: categorize_test(test, tables),
        score: test_score(test),
        range,
        marker: range_marker(value, &range.range),
        gauge: gauge_fill_ratio(value, &range.range),
    }
}

/// Scores and listings for one report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelAnalysis {
    pub patient: PatientInfo,
    pub total_tests: usize,
    pub normal_tests: usize,
    pub health_score: f64,
    pub overall_score: f64,
    pub condition: HealthCondition,
    /// Display form of `condition`, e.g. "Needs Attention"
    pub condition_label: String,
    pub category_scores: BTreeMap<Category, f64>,
    /// Tests the lab flagged HIGH, LOW or ABNORMAL, in report order
    pub abnormal_tests: Vec<LabTest>,
    /// Names of tests no category rule matched
    pub uncategorized: Vec<String>,
    pub assessments: Vec<TestAssessment>,
}

impl PanelAnalysis {
    /// Categories that have at least one scored member, in matching order
    pub fn active_categories(&self) -> impl Iterator<Item = (Category, f64)> + '_ {
        self.category_scores
            .iter()
            .filter(|(_, score)| **score > 0.0)
            .map(|(category, score)| (*category, *score))
    }

    /// Assessments belonging to one category
    pub fn members(&self, category: Category) -> impl Iterator<Item = &TestAssessment> {
        self.assessments
            .iter()
            .filter(move |a| a.category == Some(category))
    }

    pub fn has_abnormal(&self) -> bool {
        !self.abnormal_tests.is_empty()
    }
}

/// Run the full single-report pipeline
pub fn analyze(report: &LabReport, tables: &ReferenceTables) -> PanelAnalysis {
    let tests = &report.tests;

    let assessments: Vec<TestAssessment> =
        tests.iter().map(|t| assess_test(t, tables)).collect();

    let scores = category_scores(tests, tables);
    let overall = overall_score(&scores);
    let condition = HealthCondition::from_score(overall);

    let analysis = PanelAnalysis {
        patient: report.patient.clone(),
        total_tests: tests.len(),
        normal_tests: tests
            .iter()
            .filter(|t| t.status == Some(TestStatus::Normal))
            .count(),
        health_score: health_score(tests),
        overall_score: overall,
        condition,
        condition_label: condition.description().to_string(),
        category_scores: scores,
        abnormal_tests: tests.iter().filter(|t| t.is_abnormal()).cloned().collect(),
        uncategorized: assessments
            .iter()
            .filter(|a| a.category.is_none())
            .map(|a| a.name.clone())
            .collect(),
        assessments,
    };

    info!(
        tests = analysis.total_tests,
        abnormal = analysis.abnormal_tests.len(),
        overall_score = analysis.overall_score,
        health_score = analysis.health_score,
        "Analyzed lab panel"
    );

    analysis
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::range::RangeSource;
    use crate::report::parse_report;

    fn tables() -> &'static ReferenceTables {
        ReferenceTables::builtin()
    }

    #[test]
    fn test_end_to_end_example() {
        let report = parse_report(
            r#"{"patient_info": {"name": "A"}, "tests": [
                {"name": "HEMOGLOBIN", "value": "16.2", "status": "HIGH"},
                {"name": "Glucose", "value": "95", "status": "NORMAL"}
            ]}"#,
        )
        .unwrap();

        let analysis = analyze(&report, tables());

        assert_eq!(analysis.health_score, 50.0);
        assert_eq!(analysis.category_scores[&Category::BloodHealth], 70.0);
        assert_eq!(analysis.category_scores[&Category::MetabolicHealth], 100.0);
        assert_eq!(analysis.overall_score, 85.0);
        assert_eq!(analysis.condition, HealthCondition::Good);
        assert_eq!(analysis.condition_label, "Good");
        assert_eq!(analysis.total_tests, 2);
        assert_eq!(analysis.normal_tests, 1);
        assert_eq!(analysis.abnormal_tests.len(), 1);
        assert_eq!(analysis.abnormal_tests[0].name, "HEMOGLOBIN");
        assert!(analysis.uncategorized.is_empty());

        let active: Vec<_> = analysis.active_categories().collect();
        assert_eq!(
            active,
            vec![(Category::BloodHealth, 70.0), (Category::MetabolicHealth, 100.0)]
        );
    }

    #[test]
    fn test_uncategorized_abnormal_is_still_listed() {
        let report = LabReport::new(
            PatientInfo::default(),
            vec![
                LabTest::new("Specific Gravity", "1.030").with_status("HIGH"),
                LabTest::new("Glucose", "95").with_status("NORMAL"),
            ],
        );

        let analysis = analyze(&report, tables());
        assert_eq!(analysis.uncategorized, vec!["Specific Gravity".to_string()]);
        assert_eq!(analysis.abnormal_tests.len(), 1);
        assert_eq!(analysis.total_tests, 2);
        assert_eq!(analysis.overall_score, 100.0);
        assert_eq!(analysis.health_score, 50.0);
    }

    #[test]
    fn test_assessment_details() {
        let test = LabTest::new("HEMOGLOBIN", "16.2 gm%").with_status("HIGH");
        let assessment = assess_test(&test, tables());

        assert_eq!(assessment.value, Some(16.2));
        assert_eq!(assessment.category, Some(Category::BloodHealth));
        assert_eq!(assessment.score, 70.0);
        assert_eq!(assessment.range.source, RangeSource::Table);
        assert_eq!(assessment.marker, RangeMarker::Normal);
        assert!((assessment.gauge.unwrap() - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_unparseable_value_is_unknown_marker() {
        let test = LabTest::new("HBsAg", "NON REACTIVE").with_status("NORMAL");
        let assessment = assess_test(&test, tables());

        assert_eq!(assessment.value, None);
        assert_eq!(assessment.marker, RangeMarker::Unknown);
        assert_eq!(assessment.gauge, None);
        assert_eq!(assessment.category, Some(Category::ImmuneFunction));
    }

    #[test]
    fn test_empty_report() {
        let analysis = analyze(&LabReport::default(), tables());
        assert_eq!(analysis.overall_score, 0.0);
        assert_eq!(analysis.health_score, 0.0);
        assert_eq!(analysis.condition, HealthCondition::NeedsAttention);
        assert_eq!(analysis.condition_label, "Needs Attention");
        assert!(!analysis.has_abnormal());
        assert_eq!(analysis.members(Category::BloodHealth).count(), 0);
    }

    #[test]
    fn test_rerun_is_identical() {
        let report = LabReport::new(
            PatientInfo::default(),
            vec![
                LabTest::new("HEMOGLOBIN", "16.2").with_status("HIGH"),
                LabTest::new("Lymphocytes", "++").with_status("LOW"),
                LabTest::new("Mystery", "n/a"),
            ],
        );

        let first = serde_json::to_string(&analyze(&report, tables())).unwrap();
        let second = serde_json::to_string(&analyze(&report, tables())).unwrap();
        assert_eq!(first, second);
    }
}
