//! Common test utilities for integration tests
//!
//! Fixture lookup and config builders shared by the runner tests.

use labpanel_cli::config::AppConfig;
use std::path::PathBuf;

/// Absolute path of a file under `tests/fixtures`
pub fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

/// Config for a single report
pub fn single_config(report: &str) -> AppConfig {
    let mut config = AppConfig::default();
    config.input.report = Some(fixture(report));
    config
}

/// Config comparing `current` against `previous`
pub fn compare_config(current: &str, previous: &str) -> AppConfig {
    let mut config = single_config(current);
    config.input.previous = Some(fixture(previous));
    config
}
