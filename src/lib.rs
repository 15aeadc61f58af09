// Forbidden Finder - concurrent forbidden-word scanner and redactor
//
// Library crate with the scan engine, its services and the observable state.
// The binary crate (main.rs) provides the command-line front-end.

pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod services;
pub mod state;

// Re-export commonly used types for convenience
pub use config::ConfigManager;
pub use engine::{ScanController, ScanRequest, ScanSummary};
pub use error::{ScanError, ScanResult};
pub use models::{ReportEntry, RunState, ScanSettings, ScanState};
pub use services::{ForbiddenWords, WordMatcher, WordStatistics};
pub use state::{StateChange, StateManager};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
