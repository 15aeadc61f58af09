use crate::engine::gate::RunSignals;
use crate::error::{ScanError, ScanResult};
use crate::metrics::ScanMetrics;
use crate::models::ReportEntry;
use crate::services::matcher::WordMatcher;
use crate::services::statistics::StatsSink;
use camino::{Utf8Path, Utf8PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::fs;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Suffix appended to the original file name for the redacted copy
pub const REDACTED_SUFFIX: &str = ".replaced";

/// Scans one file end-to-end: read, redact, decide inclusion, write outputs.
///
/// The source file is never modified. For a file with at least one match two
/// artifacts are written to the output directory:
/// - `<name>`: a verbatim copy of the source (overwrites earlier copies)
/// - `<name>.replaced`: the redacted content, one `\n` after every line
///
/// Outputs are flat, so equal file names from different subdirectories
/// overwrite each other.
///
/// Word counts are buffered per file and forwarded to the [`StatsSink`] only
/// once the artifacts are written. A file abandoned by cancellation or a read
/// error therefore contributes nothing to the run statistics.
pub struct FileScanner {
    matcher: WordMatcher,
    output_dir: Utf8PathBuf,
    search_root: Utf8PathBuf,
    stats: Arc<dyn StatsSink>,
    signals: RunSignals,
    metrics: Arc<ScanMetrics>,
}

enum FileOutcome {
    Matched(ReportEntry),
    Clean,
    Abandoned,
}

impl FileScanner {
    pub fn new(
        matcher: WordMatcher,
        output_dir: Utf8PathBuf,
        search_root: Utf8PathBuf,
        stats: Arc<dyn StatsSink>,
        signals: RunSignals,
    ) -> Self {
        Self {
            matcher,
            output_dir,
            search_root,
            stats,
            signals,
            metrics: Arc::new(ScanMetrics::new()),
        }
    }

    /// Record per-file outcomes into `metrics` instead of a private instance
    pub fn with_metrics(mut self, metrics: Arc<ScanMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn metrics(&self) -> &Arc<ScanMetrics> {
        &self.metrics
    }

    /// Process a single file
    ///
    /// Blocks first while the run is paused. Checks for cancellation before
    /// every line and once more before writing anything.
    ///
    /// # Returns
    /// - `Ok(Some(entry))` if the file contained at least one forbidden word
    /// - `Ok(None)` if it contained none, or the run was cancelled first
    ///
    /// # Errors
    /// [`ScanError::Io`] if the file cannot be read (including non UTF-8
    /// content) or an output cannot be written.
    pub async fn process(&self, path: &Utf8Path) -> ScanResult<Option<ReportEntry>> {
        if !self.signals.wait_if_paused().await {
            self.metrics.record_file_abandoned();
            return Ok(None);
        }

        if self.matcher.is_empty() {
            return Ok(None);
        }

        match self.scan_file(path).await {
            Ok(FileOutcome::Matched(entry)) => {
                self.metrics.record_file_matched(entry.match_count);
                Ok(Some(entry))
            }
            Ok(FileOutcome::Clean) => Ok(None),
            Ok(FileOutcome::Abandoned) => {
                self.metrics.record_file_abandoned();
                Ok(None)
            }
            Err(e) => {
                self.metrics.record_file_failed();
                Err(e)
            }
        }
    }

    async fn scan_file(&self, path: &Utf8Path) -> ScanResult<FileOutcome> {
        let started = Instant::now();

        let file_name = path
            .file_name()
            .ok_or_else(|| ScanError::InvalidInput {
                path: path.to_path_buf(),
                reason: "path has no file name".to_string(),
            })?
            .to_string();

        // Size is taken up front; the source is never rewritten
        let file_size = fs::metadata(path)
            .await
            .map_err(|e| ScanError::io(path, e))?
            .len();

        let file = fs::File::open(path)
            .await
            .map_err(|e| ScanError::io(path, e))?;
        let mut lines = BufReader::new(file).lines();

        let mut redacted = String::new();
        let mut total: u64 = 0;
        let mut increments: Vec<(&str, u64)> = Vec::new();

        while let Some(line) = lines
            .next_line()
            .await
            .map_err(|e| ScanError::io(path, e))?
        {
            if self.signals.is_cancelled() {
                tracing::debug!("Abandoning {} after cancellation", path);
                return Ok(FileOutcome::Abandoned);
            }

            let line_match = self.matcher.scan(&line);
            for (word, count) in &line_match.word_counts {
                let count = *count as u64;
                increments.push((*word, count));
                total += count;
            }

            redacted.push_str(&line_match.redacted);
            redacted.push('\n');
        }

        self.metrics
            .record_file_scanned(file_size, started.elapsed());

        if total == 0 {
            tracing::debug!("No forbidden words in {}", path);
            return Ok(FileOutcome::Clean);
        }

        if self.signals.is_cancelled() {
            tracing::debug!("Abandoning {} before writing outputs", path);
            return Ok(FileOutcome::Abandoned);
        }

        let copy_path = self.output_dir.join(&file_name);
        let redacted_path = self
            .output_dir
            .join(format!("{}{}", file_name, REDACTED_SUFFIX));

        // Both artifacts are written by one blocking task, which runs to the
        // end even if this worker is aborted while awaiting it
        let source = path.to_path_buf();
        tokio::task::spawn_blocking(move || {
            write_artifacts(&source, &copy_path, &redacted_path, &redacted)
        })
        .await
        .map_err(|e| ScanError::io(path, std::io::Error::other(e)))??;

        for (word, count) in increments {
            self.stats.increment(word, count);
        }

        let file_directory = path
            .parent()
            .map(Utf8Path::to_path_buf)
            .unwrap_or_else(|| self.search_root.clone());

        tracing::debug!("{}: {} forbidden words redacted", path, total);

        Ok(FileOutcome::Matched(ReportEntry {
            file_name,
            match_count: total,
            file_directory,
            search_directory: self.search_root.clone(),
            file_size,
        }))
    }
}

/// Write the verbatim copy and the redacted copy of `source`
///
/// The copy is skipped when `copy_path` already is the source file, since
/// copying a file onto itself truncates it.
fn write_artifacts(
    source: &Utf8Path,
    copy_path: &Utf8Path,
    redacted_path: &Utf8Path,
    redacted: &str,
) -> ScanResult<()> {
    if is_same_file(source, copy_path) {
        tracing::warn!("Not copying {} onto itself", source);
    } else {
        std::fs::copy(source, copy_path).map_err(|e| ScanError::io(copy_path, e))?;
    }

    std::fs::write(redacted_path, redacted).map_err(|e| ScanError::io(redacted_path, e))
}

fn is_same_file(a: &Utf8Path, b: &Utf8Path) -> bool {
    match (a.canonicalize_utf8(), b.canonicalize_utf8()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::matcher::ForbiddenWords;
    use crate::services::statistics::{MockStatsSink, WordStatistics};
    use mockall::predicate::eq;
    use std::fs as std_fs;
    use std::sync::atomic::Ordering;
    use tempfile::TempDir;

    struct Fixture {
        _temp_dir: TempDir,
        root: Utf8PathBuf,
        output: Utf8PathBuf,
    }

    fn fixture() -> Fixture {
        let temp_dir = TempDir::new().unwrap();
        let base = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
        let root = base.join("root");
        let output = base.join("out");
        std_fs::create_dir_all(&root).unwrap();
        std_fs::create_dir_all(&output).unwrap();
        Fixture {
            _temp_dir: temp_dir,
            root,
            output,
        }
    }

    fn scanner(
        fx: &Fixture,
        words: &[&str],
        stats: Arc<dyn StatsSink>,
        signals: RunSignals,
    ) -> FileScanner {
        let matcher = WordMatcher::new(&ForbiddenWords::new(words)).unwrap();
        FileScanner::new(matcher, fx.output.clone(), fx.root.clone(), stats, signals)
    }

    #[tokio::test]
    async fn test_file_with_matches_produces_entry_and_artifacts() {
        let fx = fixture();
        let source = fx.root.join("a.txt");
        std_fs::write(&source, "The bad word is BAD.").unwrap();

        let stats = Arc::new(WordStatistics::new());
        let scanner = scanner(&fx, &["bad"], stats.clone(), RunSignals::new());

        let entry = scanner.process(&source).await.unwrap().unwrap();

        assert_eq!(entry.file_name, "a.txt");
        assert_eq!(entry.match_count, 2);
        assert_eq!(entry.file_directory, fx.root);
        assert_eq!(entry.search_directory, fx.root);
        assert_eq!(entry.file_size, 20);

        let copy = std_fs::read_to_string(fx.output.join("a.txt")).unwrap();
        assert_eq!(copy, "The bad word is BAD.");
        let redacted = std_fs::read_to_string(fx.output.join("a.txt.replaced")).unwrap();
        assert_eq!(redacted, "The ******* word is *******.\n");

        // The source is untouched
        assert_eq!(
            std_fs::read_to_string(&source).unwrap(),
            "The bad word is BAD."
        );
        assert_eq!(stats.snapshot(), vec![("bad".to_string(), 2)]);
    }

    #[tokio::test]
    async fn test_file_without_matches_writes_nothing() {
        let fx = fixture();
        let source = fx.root.join("clean.txt");
        std_fs::write(&source, "nothing to see\nhere\n").unwrap();

        let stats = Arc::new(WordStatistics::new());
        let scanner = scanner(&fx, &["bad"], stats.clone(), RunSignals::new());

        assert!(scanner.process(&source).await.unwrap().is_none());
        assert_eq!(std_fs::read_dir(&fx.output).unwrap().count(), 0);
        assert!(stats.snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_empty_word_set_skips_file() {
        let fx = fixture();
        let source = fx.root.join("a.txt");
        std_fs::write(&source, "bad bad bad").unwrap();

        let scanner = scanner(&fx, &[], Arc::new(WordStatistics::new()), RunSignals::new());

        assert!(scanner.process(&source).await.unwrap().is_none());
        assert_eq!(std_fs::read_dir(&fx.output).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_increments_are_per_line_and_per_word() {
        let fx = fixture();
        let source = fx.root.join("multi.txt");
        std_fs::write(&source, "bad and ugly\nugly ugly\nbad bad\n").unwrap();

        let mut sink = MockStatsSink::new();
        sink.expect_increment()
            .with(eq("bad"), eq(1))
            .times(1)
            .return_const(());
        sink.expect_increment()
            .with(eq("ugly"), eq(1))
            .times(1)
            .return_const(());
        sink.expect_increment()
            .with(eq("ugly"), eq(2))
            .times(1)
            .return_const(());
        sink.expect_increment()
            .with(eq("bad"), eq(2))
            .times(1)
            .return_const(());

        let scanner = scanner(&fx, &["bad", "ugly"], Arc::new(sink), RunSignals::new());
        let entry = scanner.process(&source).await.unwrap().unwrap();

        assert_eq!(entry.match_count, 6);
    }

    #[tokio::test]
    async fn test_cancelled_run_abandons_file_without_outputs() {
        let fx = fixture();
        let source = fx.root.join("a.txt");
        std_fs::write(&source, "bad\nbad\n").unwrap();

        let mut sink = MockStatsSink::new();
        sink.expect_increment().never();

        let signals = RunSignals::new();
        signals.cancel();
        let scanner = scanner(&fx, &["bad"], Arc::new(sink), signals);

        assert!(scanner.process(&source).await.unwrap().is_none());
        assert_eq!(std_fs::read_dir(&fx.output).unwrap().count(), 0);
        assert_eq!(scanner.metrics().files_abandoned.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let fx = fixture();
        let scanner = scanner(&fx, &["bad"], Arc::new(WordStatistics::new()), RunSignals::new());

        let result = scanner.process(&fx.root.join("gone.txt")).await;
        assert!(matches!(result, Err(ScanError::Io { .. })));
        assert_eq!(scanner.metrics().files_failed.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_outcomes_are_recorded_in_shared_metrics() {
        let fx = fixture();
        std_fs::write(fx.root.join("hit.txt"), "bad").unwrap();
        std_fs::write(fx.root.join("miss.txt"), "fine").unwrap();

        let metrics = Arc::new(ScanMetrics::new());
        let scanner = scanner(&fx, &["bad"], Arc::new(WordStatistics::new()), RunSignals::new())
            .with_metrics(metrics.clone());

        scanner.process(&fx.root.join("hit.txt")).await.unwrap();
        scanner.process(&fx.root.join("miss.txt")).await.unwrap();

        assert_eq!(metrics.files_scanned.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.files_matched.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.matches_found.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.bytes_scanned.load(Ordering::Relaxed), 7);
    }

    #[tokio::test]
    async fn test_non_utf8_file_is_io_error() {
        let fx = fixture();
        let source = fx.root.join("binary.bin");
        std_fs::write(&source, [0x62, 0x61, 0x64, 0x20, 0xff, 0xfe, 0x0a]).unwrap();

        let stats = Arc::new(WordStatistics::new());
        let scanner = scanner(&fx, &["bad"], stats.clone(), RunSignals::new());

        let result = scanner.process(&source).await;
        assert!(matches!(result, Err(ScanError::Io { .. })));
        assert!(stats.snapshot().is_empty());
        assert_eq!(std_fs::read_dir(&fx.output).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_output_dir_equal_to_source_dir_keeps_source_intact() {
        let fx = fixture();
        let source = fx.root.join("a.txt");
        std_fs::write(&source, "The bad word is BAD.").unwrap();

        let matcher = WordMatcher::new(&ForbiddenWords::new(["bad"])).unwrap();
        let scanner = FileScanner::new(
            matcher,
            fx.root.clone(),
            fx.root.clone(),
            Arc::new(WordStatistics::new()),
            RunSignals::new(),
        );

        let entry = scanner.process(&source).await.unwrap().unwrap();

        assert_eq!(entry.match_count, 2);
        assert_eq!(
            std_fs::read_to_string(&source).unwrap(),
            "The bad word is BAD."
        );
        assert_eq!(
            std_fs::read_to_string(fx.root.join("a.txt.replaced")).unwrap(),
            "The ******* word is *******.\n"
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_aborted_worker_leaves_both_artifacts_or_none() {
        let fx = fixture();
        let source = fx.root.join("big.txt");
        std_fs::write(&source, "bad line\n".repeat(20_000)).unwrap();

        let scanner = Arc::new(scanner(
            &fx,
            &["bad"],
            Arc::new(WordStatistics::new()),
            RunSignals::new(),
        ));

        for delay_ms in [0u64, 1, 5, 20] {
            for name in ["big.txt", "big.txt.replaced"] {
                let _ = std_fs::remove_file(fx.output.join(name));
            }

            let worker = Arc::clone(&scanner);
            let path = source.clone();
            let handle = tokio::spawn(async move { worker.process(&path).await });
            tokio::time::sleep(std::time::Duration::from_millis(delay_ms)).await;
            handle.abort();
            let _ = handle.await;

            // A blocking write already started still runs to the end
            tokio::time::sleep(std::time::Duration::from_millis(200)).await;
            assert_eq!(
                fx.output.join("big.txt").exists(),
                fx.output.join("big.txt.replaced").exists()
            );
        }
    }
}
