//! Reference tables: category keywords and known normal ranges
//!
//! The tables are plain immutable data. The pipeline receives them by
//! reference, so tests can substitute their own and deployments can load an
//! override file instead of the built-in set.

use crate::category::{Category, CategoryRule};
use crate::errors::TableError;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

static BUILTIN: Lazy<ReferenceTables> = Lazy::new(ReferenceTables::default);

/// Normal ranges for common hematology, urine and metabolic markers,
/// keyed by the exact test name labs print
const BUILTIN_NORMAL_RANGES: &[(&str, f64, f64)] = &[
    ("HEMOGLOBIN", 13.0, 17.0),
    ("Total RBC Count", 4.5, 5.5),
    ("H.CT", 40.0, 50.0),
    ("M.C.V", 83.0, 101.0),
    ("M.C.H.", 27.0, 32.0),
    ("M.C.H.C.", 31.5, 34.5),
    ("R.D.W", 11.6, 14.0),
    ("Total WBC Count (TLC)", 4000.0, 11000.0),
    ("Platelet Count", 150000.0, 410000.0),
    ("1 Hour ESR", 0.0, 15.0),
    ("Polymorphs", 40.0, 75.0),
    ("Lymphocytes", 20.0, 40.0),
    ("Eosinophils", 1.0, 6.0),
    ("Monocytes", 2.0, 10.0),
    ("Mean Blood Glucose", 70.0, 100.0),
    ("Specific Gravity", 1.010, 1.025),
    ("Urine Volume", 800.0, 2000.0),
    ("Urine Glucose", 0.0, 0.0),
];

fn builtin_rules() -> Vec<CategoryRule> {
    vec![
        CategoryRule::new(
            Category::BloodHealth,
            &["hemoglobin", "rbc", "hct", "mcv", "mch", "platelet", "rdw"],
        ),
        CategoryRule::new(
            Category::MetabolicHealth,
            &["glucose", "hba1c", "sugar", "mean blood glucose"],
        ),
        CategoryRule::new(
            Category::ImmuneFunction,
            &[
                "wbc",
                "lymphocyte",
                "polymorphs",
                "eosinophil",
                "monocyte",
                "basophil",
                "hiv",
                "hbsag",
            ],
        ),
        CategoryRule::new(
            Category::KidneyFunction,
            &["urine", "protein", "creatinine", "urea", "kidney"],
        ),
        CategoryRule::new(
            Category::LiverHealth,
            &["bile", "bilirubin", "alt", "ast", "liver", "sgpt", "sgot"],
        ),
        CategoryRule::new(Category::Inflammation, &["esr", "crp", "inflammation"]),
    ]
}

fn builtin_ranges() -> BTreeMap<String, (f64, f64)> {
    BUILTIN_NORMAL_RANGES
        .iter()
        .map(|(name, min, max)| (name.to_string(), (*min, *max)))
        .collect()
}

/// Category keyword rules plus the exact-name normal range table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceTables {
    #[serde(default = "builtin_rules")]
    categories: Vec<CategoryRule>,
    #[serde(default = "builtin_ranges")]
    normal_ranges: BTreeMap<String, (f64, f64)>,
}

impl Default for ReferenceTables {
    fn default() -> Self {
        Self {
            categories: builtin_rules(),
            normal_ranges: builtin_ranges(),
        }
    }
}

impl ReferenceTables {
    /// Build tables from explicit rules and ranges.
    ///
    /// Rules are put back into category enumeration order (stable for
    /// repeated categories) and keywords are lower-cased, so the first-match
    /// contract holds no matter how the caller listed them.
    pub fn new(
        mut categories: Vec<CategoryRule>,
        normal_ranges: BTreeMap<String, (f64, f64)>,
    ) -> Self {
        for rule in &mut categories {
            rule.keywords = rule
                .keywords
                .iter()
                .map(|k| k.trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect();
        }
        categories.sort_by_key(|rule| rule.category);

        Self {
            categories,
            normal_ranges,
        }
    }

    /// Shared built-in tables, built once on first use
    pub fn builtin() -> &'static ReferenceTables {
        &BUILTIN
    }

    /// Parse tables from JSON. Sections left out fall back to the built-in set.
    pub fn from_json(json: &str) -> Result<Self, TableError> {
        let raw: ReferenceTables = serde_json::from_str(json)?;

        for (name, &(min, max)) in &raw.normal_ranges {
            if min > max {
                return Err(TableError::InvertedRange {
                    name: name.clone(),
                    min,
                    max,
                });
            }
        }

        Ok(Self::new(raw.categories, raw.normal_ranges))
    }

    /// Load an override file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TableError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| TableError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let tables = Self::from_json(&json)?;

        info!(
            path = %path.display(),
            rules = tables.categories.len(),
            ranges = tables.normal_ranges.len(),
            "Loaded reference tables"
        );

        Ok(tables)
    }

    /// Keyword rules in matching order
    pub fn category_rules(&self) -> &[CategoryRule] {
        &self.categories
    }

    /// Known normal range for an exact (case-sensitive) test name
    pub fn normal_range(&self, name: &str) -> Option<(f64, f64)> {
        self.normal_ranges.get(name).copied()
    }
}
