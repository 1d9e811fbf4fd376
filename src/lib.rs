//! Election Analytics Engine
//!
//! Turns raw position-level vote tallies read from an external ledger into
//! regional estimates, comparative statistics, exportable reports and
//! immutable point-in-time snapshots.

pub mod analytics;
pub mod config;
pub mod errors;
pub mod ledger;
pub mod reports;
pub mod snapshot;
pub mod types;

// Re-export commonly used types
pub use analytics::{AnalyticsEngine, AnalyticsResult, AnalyticsView, RegionalDistributor};
pub use errors::{Error, Result};
pub use reports::{ReportGenerator, ReportKind, ReportOutcome};
pub use snapshot::SnapshotStore;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the analytics engine with proper logging
pub fn init() -> Result<()> {
    init_with_config(&config::LoggingConfig::default())
}

/// Install the global tracing subscriber described by `logging`
///
/// `RUST_LOG` still overrides the configured level. Fails if a subscriber is
/// already installed.
pub fn init_with_config(logging: &config::LoggingConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| logging.filter_directive().into());
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let installed = match logging.format.as_str() {
        "json" => builder.json().try_init(),
        "pretty" => builder.pretty().try_init(),
        _ => builder.try_init(),
    };
    installed.map_err(|e| Error::internal(format!("Failed to install tracing subscriber: {e}")))?;

    tracing::info!(
        "📊 Election analytics v{} initialized ({} logs at {})",
        VERSION,
        logging.format,
        logging.level
    );
    Ok(())
}
