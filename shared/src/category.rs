//! Health domain categorization
//!
//! Each test belongs to at most one of six fixed domains. Rules are tried in
//! enumeration order and the first keyword hit wins, so a name that mentions
//! keywords from two domains lands in the earlier one.

use crate::report::LabTest;
use crate::tables::ReferenceTables;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Physiological domain used to group tests for scoring
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    BloodHealth,
    MetabolicHealth,
    ImmuneFunction,
    KidneyFunction,
    LiverHealth,
    Inflammation,
}

impl Category {
    /// All categories in matching order
    pub const ALL: [Category; 6] = [
        Category::BloodHealth,
        Category::MetabolicHealth,
        Category::ImmuneFunction,
        Category::KidneyFunction,
        Category::LiverHealth,
        Category::Inflammation,
    ];

    /// Get a human-readable name
    pub fn display_name(&self) -> &'static str {
        match self {
            Category::BloodHealth => "Blood Health",
            Category::MetabolicHealth => "Metabolic Health",
            Category::ImmuneFunction => "Immune Function",
            Category::KidneyFunction => "Kidney Function",
            Category::LiverHealth => "Liver Health",
            Category::Inflammation => "Inflammation",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// One `(category, keywords)` pair of the ordered rule list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRule {
    pub category: Category,
    pub keywords: Vec<String>,
}

impl CategoryRule {
    pub fn new(category: Category, keywords: &[&str]) -> Self {
        Self {
            category,
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
        }
    }

    /// `lowered` must already be lower-case
    pub fn matches(&self, lowered: &str) -> bool {
        self.keywords.iter().any(|kw| lowered.contains(kw.as_str()))
    }
}

/// Assign a test name to its domain, `None` when no keyword matches
pub fn categorize(name: &str, tables: &ReferenceTables) -> Option<Category> {
    let lowered = name.to_lowercase();
    if lowered.trim().is_empty() {
        return None;
    }

    tables
        .category_rules()
        .iter()
        .find(|rule| rule.matches(&lowered))
        .map(|rule| rule.category)
}

/// Convenience wrapper over [`categorize`] for a whole test
pub fn categorize_test(test: &LabTest, tables: &ReferenceTables) -> Option<Category> {
    categorize(&test.name, tables)
}
