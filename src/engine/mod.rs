//! Engine module - scheduling and lifecycle of a scan run.
//!
//! - [`ScanController`]: enumerates the root, feeds files through the pool,
//!   collects results in completion order and writes the report
//! - [`WorkerPool`] / [`AdmissionGate`]: at most `L` file scans at once, with
//!   blocking submission when saturated
//! - [`RunSignals`]: pause and cancel flags polled by workers
//!
//! # Ordering
//!
//! Report entries are appended in the order workers finish. That order is not
//! stable between runs over the same tree; only the entry *set*, the per-file
//! counts and the word statistics are.

pub mod controller;
pub mod gate;
pub mod pool;

pub use controller::{ScanController, ScanRequest, ScanSummary};
pub use gate::RunSignals;
pub use pool::{Admission, AdmissionGate, WorkerPool};
