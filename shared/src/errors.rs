//! Error types for the lab panel pipeline
//!
//! Only loading is fatal. Value and range parse misses are absorbed by the
//! components that hit them and never surface here.

use std::path::PathBuf;
use thiserror::Error;

/// Failure to load an input report document
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Cannot read report '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid report document: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Failure to load a reference table override file
#[derive(Error, Debug)]
pub enum TableError {
    #[error("Cannot read reference tables '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid reference tables: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid reference range for '{name}': min {min} > max {max}")]
    InvertedRange { name: String, min: f64, max: f64 },
}
