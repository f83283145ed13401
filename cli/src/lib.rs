//! Lab Panel CLI Library
//!
//! Exposes configuration and the batch runner for use in tests.

pub mod config;
pub mod runner;

pub use runner::{render, run, RunOutput};
