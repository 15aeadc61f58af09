use crate::error::{ScanError, ScanResult};
use crate::models::ReportEntry;
use crate::services::statistics::WordStatistics;
use camino::Utf8PathBuf;
use std::fmt::Write as _;
use std::time::{SystemTime, UNIX_EPOCH};

pub const REPORT_PREFIX: &str = "ForbiddenFinder_Report_";
pub const REPORT_EXTENSION: &str = "txt";

/// `ForbiddenFinder_Report_<timestamp_ms>.txt`
pub fn report_file_name(timestamp_ms: u128) -> String {
    format!("{}{}.{}", REPORT_PREFIX, timestamp_ms, REPORT_EXTENSION)
}

/// Milliseconds since the Unix epoch, used to stamp a run
pub fn run_timestamp_ms() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
}

/// Render the report body.
///
/// `top_words` is expected in descending count order, already truncated to
/// `top_k` by the caller or longer (extra pairs are ignored).
pub fn render_report(entries: &[ReportEntry], top_words: &[(String, u64)], top_k: usize) -> String {
    let mut out = String::new();

    out.push_str("--- Forbidden Finder Report ---\n\n");
    out.push_str("Found Files Containing Forbidden Words:\n");

    if entries.is_empty() {
        out.push_str("None found.\n");
    } else {
        for entry in entries {
            out.push_str(&entry.report_line());
            out.push('\n');
        }
    }

    let _ = writeln!(out, "\n--- {} Most Popular Forbidden Words ---", top_k);
    for (word, count) in top_words.iter().take(top_k) {
        let _ = writeln!(out, "{}: {} replacements", word, count);
    }

    out
}

/// Persists the end-of-run report into the output directory
#[derive(Debug, Clone)]
pub struct ReportWriter {
    output_dir: Utf8PathBuf,
    top_k: usize,
}

impl ReportWriter {
    pub fn new(output_dir: impl Into<Utf8PathBuf>, top_k: usize) -> Self {
        Self {
            output_dir: output_dir.into(),
            top_k,
        }
    }

    /// Write the report for a completed run
    ///
    /// Takes the statistics snapshot here, so call it only after every worker
    /// has finished.
    ///
    /// # Returns
    /// Path of the written report file
    pub async fn write(
        &self,
        timestamp_ms: u128,
        entries: &[ReportEntry],
        stats: &WordStatistics,
    ) -> ScanResult<Utf8PathBuf> {
        let top_words = stats.top(self.top_k);
        let body = render_report(entries, &top_words, self.top_k);
        let path = self.output_dir.join(report_file_name(timestamp_ms));

        tokio::fs::write(&path, body)
            .await
            .map_err(|source| ScanError::Report {
                path: path.clone(),
                source,
            })?;

        tracing::info!("Report written to {}", path);
        Ok(path)
    }
}
