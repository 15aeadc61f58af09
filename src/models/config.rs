use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::time::Duration;

/// Scan engine settings from `Forbidden Finder.yaml`
///
/// Every field has a default so a partial (or missing) file is valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanSettings {
    /// Directory that receives copies, redacted files and the report
    pub output_dir: String,

    /// Concurrency limit as a multiple of available parallelism
    pub concurrency_multiplier: usize,

    /// Explicit concurrency limit, overrides `concurrency_multiplier` when set
    pub max_concurrent_files: Option<usize>,

    /// Number of words listed in the report's popularity section
    pub top_words: usize,

    /// How long to wait for in-flight workers after a cancel
    pub drain_timeout_ms: u64,

    pub log_dir: String,

    pub debug_mode: bool,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            concurrency_multiplier: 2,
            max_concurrent_files: None,
            top_words: 10,
            drain_timeout_ms: 5_000,
            log_dir: "logs".to_string(),
            debug_mode: false,
        }
    }
}

fn default_output_dir() -> String {
    "forbidden_output".to_string()
}

impl ScanSettings {
    /// Resolve the admission limit L (always at least 1)
    pub fn concurrency_limit(&self) -> usize {
        if let Some(limit) = self.max_concurrent_files {
            return limit.max(1);
        }

        let cores = std::thread::available_parallelism()
            .map(NonZeroUsize::get)
            .unwrap_or(1);
        cores.saturating_mul(self.concurrency_multiplier).max(1)
    }

    pub fn drain_timeout(&self) -> Duration {
        Duration::from_millis(self.drain_timeout_ms)
    }
}
