//! Configuration management for the lab panel CLI
//!
//! Configuration is loaded hierarchically:
//! 1. Default values (in code)
//! 2. TOML config files (config/development.toml or config/production.toml)
//! 3. Environment variables (prefix: LABPANEL__)
//!
//! Positional command-line paths override whatever was configured.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub reference: ReferenceConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Report documents to process
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InputConfig {
    /// The report to analyze
    pub report: Option<PathBuf>,
    /// An earlier report for the same subject; enables trend comparison
    pub previous: Option<PathBuf>,
}

/// Reference table source
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReferenceConfig {
    /// JSON override for category keywords and normal ranges.
    /// The built-in tables are used when unset.
    pub tables_path: Option<PathBuf>,
}

/// Output formatting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub pretty: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { pretty: true }
    }
}

impl AppConfig {
    /// Load configuration from files and environment
    ///
    /// Loading order (later sources override earlier):
    /// 1. Default values
    /// 2. Config file based on RUST_ENV (development.toml or production.toml)
    /// 3. Environment variables with LABPANEL__ prefix
    pub fn load() -> Result<Self> {
        let env = env::var("RUST_ENV").unwrap_or_else(|_| "development".to_string());
        let config_file = format!("config/{}.toml", env);

        let config = config::Config::builder()
            // Start with defaults
            .add_source(config::Config::try_from(&AppConfig::default())?)
            // Load from environment-specific config file
            .add_source(config::File::with_name(&config_file).required(false))
            // Override with environment variables (LABPANEL__ prefix)
            // e.g., LABPANEL__OUTPUT__PRETTY=false sets output.pretty
            .add_source(config::Environment::with_prefix("LABPANEL").separator("__"))
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// Apply positional arguments: `<report> [<previous>]`
    pub fn with_args<I>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let mut args = args.into_iter();
        if let Some(report) = args.next() {
            self.input.report = Some(PathBuf::from(report));
        }
        if let Some(previous) = args.next() {
            self.input.previous = Some(PathBuf::from(previous));
        }
        self
    }

    /// Check if running in production mode
    pub fn is_production() -> bool {
        env::var("RUST_ENV")
            .map(|v| v == "production")
            .unwrap_or(false)
    }
}
