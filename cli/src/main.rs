//! Lab Panel CLI
//!
//! Usage: `labpanel <report.json> [<previous.json>]`
//!
//! Prints the analysis (and trend comparison when a previous report is
//! given) as JSON on stdout. Logs go to stderr.

use anyhow::Result;
use labpanel_cli::{config::AppConfig, render, run};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    init_tracing();

    // Load configuration, then let positional paths override it
    let config = AppConfig::load()?.with_args(std::env::args().skip(1));

    info!(
        version = env!("CARGO_PKG_VERSION"),
        env = if AppConfig::is_production() { "production" } else { "development" },
        "Starting lab panel analysis"
    );

    let output = run(&config)?;
    println!("{}", render(&output, config.output.pretty)?);

    Ok(())
}

/// Initialize tracing/logging on stderr so stdout stays pure JSON
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if AppConfig::is_production() {
            "labpanel_cli=info,labpanel_shared=warn".into()
        } else {
            "labpanel_cli=debug,labpanel_shared=debug".into()
        }
    });

    let subscriber = tracing_subscriber::registry().with(env_filter);

    if AppConfig::is_production() {
        // JSON logging for production (better for log aggregation)
        subscriber
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        // Pretty logging for development
        subscriber
            .with(tracing_subscriber::fmt::layer().pretty().with_writer(std::io::stderr))
            .init();
    }
}
