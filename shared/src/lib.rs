//! Lab Panel Shared Library
//!
//! The normalization, categorization, scoring and comparison pipeline for
//! structured lab reports. Rendering lives elsewhere and only consumes the
//! types exported here.

pub mod analysis;
pub mod category;
pub mod errors;
pub mod range;
pub mod report;
pub mod scoring;
pub mod tables;
pub mod trend;
pub mod value;

// Re-export commonly used items
pub use analysis::{analyze, assess_test, PanelAnalysis, TestAssessment};
pub use category::{categorize, Category, CategoryRule};
pub use errors::*;
pub use range::{resolve, resolve_known, RangeSource, ReferenceRange, ResolvedRange};
pub use report::{load_report, parse_report, LabReport, LabTest, PatientInfo, RawValue, TestStatus};
pub use scoring::{HealthCondition, RangeMarker};
pub use tables::ReferenceTables;
pub use trend::{compare_reports, TrendClass, TrendComparison, TrendRecord};
