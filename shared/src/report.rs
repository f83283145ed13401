//! Input document model
//!
//! Mirrors the JSON report shape produced by the upstream extraction step.
//! Every field except `name` and `value` on a test is optional and defaulted
//! on load; only a missing file or malformed JSON is an error.

use crate::errors::LoadError;
use crate::value;
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use tracing::{debug, info};

// ============================================================================
// Patient
// ============================================================================

/// Free-form identity attributes of the report subject
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatientInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Numeric age; text such as `"38 Y"` is read through the value parser
    #[serde(
        default,
        deserialize_with = "lenient_age",
        skip_serializing_if = "Option::is_none"
    )]
    pub age: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sex: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lab_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registration_number: Option<String>,
    /// Collection or report date, used to label trend comparisons.
    /// ISO or day-first dates are accepted; anything else is dropped.
    #[serde(
        default,
        deserialize_with = "lenient_date",
        skip_serializing_if = "Option::is_none"
    )]
    pub report_date: Option<NaiveDate>,
    /// Any other attributes the lab included, passed through untouched
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Date layouts seen on lab reports, tried in order
const DATE_FORMATS: [&str; 5] = ["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%d-%b-%Y", "%d %b %Y"];

// Patient attributes are labels only, so an unreadable one becomes `None`
// instead of rejecting the document.
fn lenient_age<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Value::deserialize(deserializer)?;
    let age = match &raw {
        Value::Null => return Ok(None),
        Value::Number(n) => n.as_f64(),
        Value::String(s) => value::parse_text(s),
        _ => None,
    };
    if age.is_none() {
        debug!(age = %raw, "Ignoring unreadable patient age");
    }
    Ok(age)
}

fn lenient_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Value::deserialize(deserializer)?;
    let date = match &raw {
        Value::Null => return Ok(None),
        Value::String(s) => DATE_FORMATS
            .iter()
            .find_map(|format| NaiveDate::parse_from_str(s.trim(), format).ok()),
        _ => None,
    };
    if date.is_none() {
        debug!(report_date = %raw, "Ignoring unreadable report date");
    }
    Ok(date)
}

// ============================================================================
// Test values and statuses
// ============================================================================

/// A test value as written in the report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Number(f64),
    Text(String),
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Number(n) => write!(f, "{}", n),
            RawValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<f64> for RawValue {
    fn from(value: f64) -> Self {
        RawValue::Number(value)
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::Text(value.to_string())
    }
}

/// Qualitative flag the lab attached to a result.
///
/// Flags are matched after trimming and ignoring case, so `"normal"` and
/// `" HIGH "` score like their canonical spellings. Labs and extraction
/// steps disagree on casing, and a lower-case flag carries the same
/// meaning. Anything else is kept verbatim as [`TestStatus::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TestStatus {
    Normal,
    High,
    Low,
    Abnormal,
    /// Anything the lab wrote that is not one of the four known flags
    Other(String),
}

impl TestStatus {
    /// HIGH, LOW and ABNORMAL results are listed as abnormal
    pub fn is_abnormal(&self) -> bool {
        matches!(self, TestStatus::High | TestStatus::Low | TestStatus::Abnormal)
    }

    /// Whether the lab itself placed the value inside its reference range.
    /// `None` when the flag says nothing about the range.
    pub fn lab_says_in_range(&self) -> Option<bool> {
        match self {
            TestStatus::Normal => Some(true),
            TestStatus::High | TestStatus::Low | TestStatus::Abnormal => Some(false),
            TestStatus::Other(_) => None,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            TestStatus::Normal => "NORMAL",
            TestStatus::High => "HIGH",
            TestStatus::Low => "LOW",
            TestStatus::Abnormal => "ABNORMAL",
            TestStatus::Other(s) => s,
        }
    }
}

impl From<String> for TestStatus {
    fn from(raw: String) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "NORMAL" => TestStatus::Normal,
            "HIGH" => TestStatus::High,
            "LOW" => TestStatus::Low,
            "ABNORMAL" => TestStatus::Abnormal,
            _ => TestStatus::Other(raw),
        }
    }
}

impl From<&str> for TestStatus {
    fn from(raw: &str) -> Self {
        TestStatus::from(raw.to_string())
    }
}

impl From<TestStatus> for String {
    fn from(status: TestStatus) -> Self {
        match status {
            TestStatus::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured bounds some labs provide alongside the textual range
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ExplicitRanges {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normal_min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normal_max: Option<f64>,
}

impl ExplicitRanges {
    pub fn is_empty(&self) -> bool {
        self.normal_min.is_none() && self.normal_max.is_none()
    }
}

// ============================================================================
// Tests and reports
// ============================================================================

/// One line of a lab report
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LabTest {
    /// Join key across reports and the input to categorization
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub value: Option<RawValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TestStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_range: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ranges: Option<ExplicitRanges>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meaning: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tips: Option<String>,
}

impl LabTest {
    /// Create a test with just a name and value; everything else defaulted
    pub fn new(name: impl Into<String>, value: impl Into<RawValue>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
            ..Self::default()
        }
    }

    pub fn with_status(mut self, status: impl Into<TestStatus>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn with_reference_range(mut self, range: impl Into<String>) -> Self {
        self.reference_range = Some(range.into());
        self
    }

    pub fn with_ranges(mut self, normal_min: f64, normal_max: f64) -> Self {
        self.ranges = Some(ExplicitRanges {
            normal_min: Some(normal_min),
            normal_max: Some(normal_max),
        });
        self
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    /// Unit string, empty when the lab gave none
    pub fn unit(&self) -> &str {
        self.unit.as_deref().map(str::trim).unwrap_or("")
    }

    /// Parsed numeric value, `None` when missing or unparseable
    pub fn numeric_value(&self) -> Option<f64> {
        self.value.as_ref().and_then(value::parse)
    }

    /// Whether the lab flagged this result HIGH, LOW or ABNORMAL
    pub fn is_abnormal(&self) -> bool {
        self.status.as_ref().is_some_and(TestStatus::is_abnormal)
    }
}

/// A parsed lab report document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LabReport {
    #[serde(rename = "patient_info", default)]
    pub patient: PatientInfo,
    #[serde(default)]
    pub tests: Vec<LabTest>,
}

impl LabReport {
    pub fn new(patient: PatientInfo, tests: Vec<LabTest>) -> Self {
        Self { patient, tests }
    }

    /// First test with exactly this name
    pub fn find_test(&self, name: &str) -> Option<&LabTest> {
        self.tests.iter().find(|t| t.name == name)
    }

    /// Short human label: patient name plus report date when known
    pub fn label(&self) -> String {
        let name = self.patient.name.as_deref().unwrap_or("Unknown patient");
        match self.patient.report_date {
            Some(date) => format!("{} ({})", name, date.format("%b %Y")),
            None => name.to_string(),
        }
    }
}

/// Parse a report document from a JSON string
pub fn parse_report(json: &str) -> Result<LabReport, LoadError> {
    let report: LabReport = serde_json::from_str(json)?;
    Ok(report)
}

/// Read and parse a report document from disk
pub fn load_report(path: impl AsRef<Path>) -> Result<LabReport, LoadError> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let report = parse_report(&json)?;

    info!(
        path = %path.display(),
        tests = report.tests.len(),
        "Loaded lab report"
    );

    Ok(report)
}
