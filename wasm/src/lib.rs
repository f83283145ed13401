//! Lab Panel WASM Module
//!
//! This crate provides WebAssembly bindings so a browser-side renderer can
//! run the pipeline directly on report JSON. Inputs and outputs are JSON
//! strings; errors come back as JS strings.

use labpanel_shared::{analyze, parse_report, ReferenceTables, TrendComparison};
use wasm_bindgen::prelude::*;

fn analyze_json(report_json: &str) -> Result<String, String> {
    let report = parse_report(report_json).map_err(|e| e.to_string())?;
    let analysis = analyze(&report, ReferenceTables::builtin());
    serde_json::to_string(&analysis).map_err(|e| e.to_string())
}

fn compare_json(previous_json: &str, current_json: &str) -> Result<String, String> {
    let previous = parse_report(previous_json).map_err(|e| e.to_string())?;
    let current = parse_report(current_json).map_err(|e| e.to_string())?;
    let comparison = TrendComparison::new(&previous, &current, ReferenceTables::builtin());
    serde_json::to_string(&comparison).map_err(|e| e.to_string())
}

/// Analyze one report document and return the analysis as JSON
#[wasm_bindgen]
pub fn analyze_report(report_json: &str) -> Result<String, JsValue> {
    analyze_json(report_json).map_err(|e| JsValue::from_str(&e))
}

/// Compare an earlier report against a later one and return the trends as JSON
#[wasm_bindgen]
pub fn compare_reports(previous_json: &str, current_json: &str) -> Result<String, JsValue> {
    compare_json(previous_json, current_json).map_err(|e| JsValue::from_str(&e))
}

/// Parse a single raw value the way the pipeline does; NaN when unparseable
#[wasm_bindgen]
pub fn parse_value(raw: &str) -> f64 {
    labpanel_shared::value::parse_text(raw).unwrap_or(f64::NAN)
}
