//! Batch runner
//!
//! Loads the configured documents, runs the pipeline and produces the JSON
//! the rendering layer consumes.

use crate::config::AppConfig;
use anyhow::{Context, Result};
use labpanel_shared::{analyze, load_report, PanelAnalysis, ReferenceTables, TrendComparison};
use serde::Serialize;
use std::borrow::Cow;
use tracing::{info, warn};

/// What one invocation produces
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum RunOutput {
    Single(PanelAnalysis),
    Compared {
        current: PanelAnalysis,
        trends: TrendComparison,
    },
}

impl RunOutput {
    pub fn current(&self) -> &PanelAnalysis {
        match self {
            RunOutput::Single(analysis) => analysis,
            RunOutput::Compared { current, .. } => current,
        }
    }

    pub fn trends(&self) -> Option<&TrendComparison> {
        match self {
            RunOutput::Single(_) => None,
            RunOutput::Compared { trends, .. } => Some(trends),
        }
    }
}

/// Built-in tables unless an override file is configured
pub fn load_tables(config: &AppConfig) -> Result<Cow<'static, ReferenceTables>> {
    match &config.reference.tables_path {
        Some(path) => {
            let tables = ReferenceTables::load(path)
                .with_context(|| format!("Failed to load reference tables from {}", path.display()))?;
            Ok(Cow::Owned(tables))
        }
        None => Ok(Cow::Borrowed(ReferenceTables::builtin())),
    }
}

/// Run the pipeline for the configured report (and previous report, if any)
pub fn run(config: &AppConfig) -> Result<RunOutput> {
    let report_path = config.input.report.as_ref().context(
        "No report given; pass a path or set LABPANEL__INPUT__REPORT",
    )?;

    let tables = load_tables(config)?;

    let report = load_report(report_path)
        .with_context(|| format!("Failed to load report {}", report_path.display()))?;
    let analysis = analyze(&report, &tables);

    log_abnormal(&analysis);

    let Some(previous_path) = config.input.previous.as_ref() else {
        return Ok(RunOutput::Single(analysis));
    };

    let previous = load_report(previous_path)
        .with_context(|| format!("Failed to load previous report {}", previous_path.display()))?;
    let trends = TrendComparison::new(&previous, &report, &tables);

    info!(
        compared = trends.records.len(),
        attention = trends.needs_attention().count(),
        "Compared against previous report"
    );

    Ok(RunOutput::Compared {
        current: analysis,
        trends,
    })
}

fn log_abnormal(analysis: &PanelAnalysis) {
    if !analysis.has_abnormal() {
        info!("All results within normal range");
        return;
    }

    warn!(
        count = analysis.abnormal_tests.len(),
        "Abnormal results found; consult a physician for interpretation"
    );
    for test in &analysis.abnormal_tests {
        warn!(
            test = %test.name,
            value = %test.value.as_ref().map(ToString::to_string).unwrap_or_default(),
            unit = test.unit(),
            status = %test.status.as_ref().map(ToString::to_string).unwrap_or_default(),
            "Abnormal result"
        );
    }
}

/// Serialize the output as JSON
pub fn render(output: &RunOutput, pretty: bool) -> Result<String> {
    let json = if pretty {
        serde_json::to_string_pretty(output)?
    } else {
        serde_json::to_string(output)?
    };
    Ok(json)
}
