//! Data models for the scan engine.
//!
//! - [`ScanState`] / [`RunState`]: the controller's observable state and lifecycle
//! - [`ReportEntry`]: one file with at least one forbidden word
//! - [`ScanSettings`]: tunables loaded from `Forbidden Finder.yaml`
//!
//! [`ScanState`] is wrapped in `Arc<RwLock<>>` by [`StateManager`](crate::state::StateManager);
//! everything else is plain data passed by value.

pub mod config;
pub mod report;
pub mod run_state;

pub use config::ScanSettings;
pub use report::{ReportEntry, format_file_size};
pub use run_state::{RunState, ScanState};
