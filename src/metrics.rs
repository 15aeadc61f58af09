// Run metrics
//
// Lock-free counters recorded by workers and summarised once per run

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Counters for one scan run
///
/// Workers record into a shared `Arc<ScanMetrics>`; the controller logs the
/// summary after the pool has quiesced.
#[derive(Debug)]
pub struct ScanMetrics {
    /// Files read to the end (with or without matches)
    pub files_scanned: AtomicUsize,

    /// Files that produced a report entry
    pub files_matched: AtomicUsize,

    /// Files skipped because of an I/O error
    pub files_failed: AtomicUsize,

    /// Files given up on because the run was cancelled
    pub files_abandoned: AtomicUsize,

    /// Forbidden words redacted across all matched files
    pub matches_found: AtomicU64,

    /// Source bytes of every fully scanned file
    pub bytes_scanned: AtomicU64,

    /// Wall time spent inside the file scanner, summed over workers
    pub total_scan_time_ms: AtomicU64,

    start_time: Instant,
}

impl ScanMetrics {
    pub fn new() -> Self {
        Self {
            files_scanned: AtomicUsize::new(0),
            files_matched: AtomicUsize::new(0),
            files_failed: AtomicUsize::new(0),
            files_abandoned: AtomicUsize::new(0),
            matches_found: AtomicU64::new(0),
            bytes_scanned: AtomicU64::new(0),
            total_scan_time_ms: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Record a file that was read to the end
    pub fn record_file_scanned(&self, bytes: u64, duration: Duration) {
        self.files_scanned.fetch_add(1, Ordering::Relaxed);
        self.bytes_scanned.fetch_add(bytes, Ordering::Relaxed);
        self.total_scan_time_ms
            .fetch_add(duration.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn record_file_matched(&self, matches: u64) {
        self.files_matched.fetch_add(1, Ordering::Relaxed);
        self.matches_found.fetch_add(matches, Ordering::Relaxed);
    }

    pub fn record_file_failed(&self) {
        self.files_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_file_abandoned(&self) {
        self.files_abandoned.fetch_add(1, Ordering::Relaxed);
    }

    /// Time since the run started
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Average time per scanned file in milliseconds
    pub fn avg_scan_time_ms(&self) -> f64 {
        let total = self.total_scan_time_ms.load(Ordering::Relaxed);
        let count = self.files_scanned.load(Ordering::Relaxed);
        if count > 0 {
            total as f64 / count as f64
        } else {
            0.0
        }
    }

    pub fn log_summary(&self) {
        tracing::info!("=== Scan Metrics Summary ===");
        tracing::info!("Elapsed: {:.2}s", self.elapsed().as_secs_f64());
        tracing::info!(
            "Files: {} scanned, {} matched, {} failed, {} abandoned",
            self.files_scanned.load(Ordering::Relaxed),
            self.files_matched.load(Ordering::Relaxed),
            self.files_failed.load(Ordering::Relaxed),
            self.files_abandoned.load(Ordering::Relaxed)
        );
        tracing::info!(
            "Matches redacted: {}, bytes scanned: {}",
            self.matches_found.load(Ordering::Relaxed),
            self.bytes_scanned.load(Ordering::Relaxed)
        );
        tracing::info!(
            "Total scan time: {:.2}s (avg: {:.2}ms per file)",
            self.total_scan_time_ms.load(Ordering::Relaxed) as f64 / 1000.0,
            self.avg_scan_time_ms()
        );
    }
}

impl Default for ScanMetrics {
    fn default() -> Self {
        Self::new()
    }
}
