// Scan controller
//
// Owns the lifecycle of a run: validation, enumeration, bounded dispatch,
// completion-order collection, pause/resume/cancel and the final report.

use crate::engine::gate::RunSignals;
use crate::engine::pool::WorkerPool;
use crate::error::{ScanError, ScanResult};
use crate::metrics::ScanMetrics;
use crate::models::{ReportEntry, RunState, ScanSettings};
use crate::services::{
    FileScanner, ForbiddenWords, ReportWriter, WordMatcher, WordStatistics, collect_files,
    run_timestamp_ms,
};
use crate::state::{StateChange, StateManager};
use camino::{Utf8Path, Utf8PathBuf};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::{JoinError, JoinHandle};

pub const STATUS_PAUSED: &str = "Paused...";
pub const STATUS_SEARCHING: &str = "Searching...";
pub const STATUS_EMPTY: &str = "Directory is empty or contains no files to process.";
pub const STATUS_CANCELLED: &str = "Search was cancelled.";
pub const STATUS_INVALID_ROOT: &str = "Error: Directory not found or is not a valid directory.";

/// Inputs of one run
#[derive(Debug, Clone)]
pub struct ScanRequest {
    pub root: Utf8PathBuf,
    pub words: ForbiddenWords,
    pub output_dir: Utf8PathBuf,
}

impl ScanRequest {
    pub fn new(
        root: impl Into<Utf8PathBuf>,
        words: ForbiddenWords,
        output_dir: impl Into<Utf8PathBuf>,
    ) -> Self {
        Self {
            root: root.into(),
            words,
            output_dir: output_dir.into(),
        }
    }
}

/// Final result of a run that was not aborted by a setup error
///
/// `entries` are in completion order, which differs between runs.
#[derive(Debug, Clone)]
pub struct ScanSummary {
    /// `Completed` or `Cancelled`
    pub run_state: RunState,
    pub entries: Vec<ReportEntry>,
    /// Statistics snapshot, highest count first
    pub word_counts: Vec<(String, u64)>,
    /// Only set for completed runs
    pub report_path: Option<Utf8PathBuf>,
    pub total_files: usize,
    pub processed: usize,
}

impl ScanSummary {
    pub fn total_matches(&self) -> u64 {
        self.entries.iter().map(|e| e.match_count).sum()
    }

    pub fn is_cancelled(&self) -> bool {
        self.run_state == RunState::Cancelled
    }
}

/// Everything validated synchronously before the run goes async
struct PreparedRun {
    root: Utf8PathBuf,
    output_dir: Utf8PathBuf,
    matcher: WordMatcher,
}

/// Results collected by the controller while workers run
#[derive(Default)]
struct Collection {
    entries: Vec<ReportEntry>,
    processed: usize,
}

/// Drives scan runs and exposes the control surface to a front-end
///
/// One run at a time. [`start`](Self::start) spawns the run and returns
/// immediately; [`pause`](Self::pause), [`resume`](Self::resume) and
/// [`cancel`](Self::cancel) may be called from any thread while it executes.
/// Progress and status arrive on [`subscribe`](Self::subscribe).
pub struct ScanController {
    state: Arc<StateManager>,
    settings: ScanSettings,
    signals: RunSignals,
}

impl ScanController {
    pub fn new(settings: ScanSettings) -> Self {
        Self::with_state_manager(Arc::new(StateManager::new()), settings)
    }

    /// Use an existing state manager, e.g. one a front-end already observes
    pub fn with_state_manager(state: Arc<StateManager>, settings: ScanSettings) -> Self {
        Self {
            state,
            settings,
            signals: RunSignals::new(),
        }
    }

    pub fn state(&self) -> &Arc<StateManager> {
        &self.state
    }

    pub fn settings(&self) -> &ScanSettings {
        &self.settings
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.state.subscribe()
    }

    pub fn run_state(&self) -> RunState {
        self.state.run_state()
    }

    /// Validate the request and spawn the run on the tokio runtime
    ///
    /// # Errors
    /// Returned synchronously, before anything is written:
    /// - [`ScanError::AlreadyRunning`] if a run is active
    /// - [`ScanError::InvalidInput`] if the root is missing or not a directory
    /// - [`ScanError::InvalidWord`] if a forbidden word cannot be compiled
    ///
    /// Setup failures after this point (output directory, enumeration) and
    /// report failures come back through the join handle.
    pub fn start(
        self: &Arc<Self>,
        request: ScanRequest,
    ) -> ScanResult<JoinHandle<ScanResult<ScanSummary>>> {
        let prepared = self.prepare(request)?;
        let controller = Arc::clone(self);
        Ok(tokio::spawn(async move { controller.execute(prepared).await }))
    }

    /// Run to completion on the current task
    pub async fn run(&self, request: ScanRequest) -> ScanResult<ScanSummary> {
        let prepared = self.prepare(request)?;
        self.execute(prepared).await
    }

    /// Stop starting new files. Returns false unless a run was `Running`.
    pub fn pause(&self) -> bool {
        if !self
            .state
            .transition_from(&[RunState::Running], RunState::Paused)
        {
            return false;
        }
        self.signals.pause();
        self.state.set_status(STATUS_PAUSED);
        tracing::info!("Scan paused");
        true
    }

    /// Wake paused workers. Returns false unless the run was `Paused`.
    pub fn resume(&self) -> bool {
        if !self
            .state
            .transition_from(&[RunState::Paused], RunState::Running)
        {
            return false;
        }
        self.signals.resume();
        self.state.set_status(STATUS_SEARCHING);
        tracing::info!("Scan resumed");
        true
    }

    /// Request cancellation. Returns false if no run was `Running` or `Paused`.
    pub fn cancel(&self) -> bool {
        if !self.state.transition_from(
            &[RunState::Running, RunState::Paused],
            RunState::Cancelling,
        ) {
            return false;
        }
        self.signals.cancel();
        tracing::warn!("Scan cancellation requested");
        true
    }

    fn prepare(&self, request: ScanRequest) -> ScanResult<PreparedRun> {
        if self.state.run_state().is_active() {
            return Err(ScanError::AlreadyRunning);
        }

        let root = match validate_root(&request.root) {
            Ok(root) => root,
            Err(e) => {
                tracing::error!("{}", e);
                self.state.fail(&e.to_string(), STATUS_INVALID_ROOT);
                return Err(e);
            }
        };

        let matcher = match WordMatcher::new(&request.words) {
            Ok(matcher) => matcher,
            Err(e) => {
                tracing::error!("{}", e);
                self.state.fail(&e.to_string(), &format!("Error: {}", e));
                return Err(e);
            }
        };

        self.signals.reset();
        self.state
            .begin_run(root.clone(), request.output_dir.clone())
            .map_err(|_| ScanError::AlreadyRunning)?;

        Ok(PreparedRun {
            root,
            output_dir: request.output_dir,
            matcher,
        })
    }

    async fn execute(&self, run: PreparedRun) -> ScanResult<ScanSummary> {
        let timestamp = run_timestamp_ms();
        let root_name = run.root.file_name().unwrap_or(run.root.as_str());

        tracing::info!("Starting scan of {} into {}", run.root, run.output_dir);
        self.state
            .set_status(format!("Starting multi-threaded search in: {}", root_name));

        let (output_dir, files) = match self.setup(&run).await {
            Ok(setup) => setup,
            Err(e) => {
                tracing::error!("Scan setup failed: {}", e);
                self.state.fail(&e.to_string(), &format!("Error: {}", e));
                return Err(e);
            }
        };

        let total = files.len();
        self.state.set_total(total);

        let stats = Arc::new(WordStatistics::new());

        if total == 0 {
            if self
                .state
                .transition_from(&[RunState::Running, RunState::Paused], RunState::Completed)
            {
                tracing::info!("No files to scan under {}", run.root);
                self.state.set_status(STATUS_EMPTY);
                return Ok(self.summary(RunState::Completed, Collection::default(), &stats, None, 0));
            }
            return Ok(self.finish_cancelled(Collection::default(), &stats, 0));
        }

        let metrics = Arc::new(ScanMetrics::new());
        let scanner = Arc::new(
            FileScanner::new(
                run.matcher,
                output_dir.clone(),
                run.root.clone(),
                stats.clone(),
                self.signals.clone(),
            )
            .with_metrics(metrics.clone()),
        );

        let mut pool = WorkerPool::new(self.settings.concurrency_limit());
        tracing::info!(
            "Scanning {} files with up to {} concurrent workers",
            total,
            pool.limit()
        );

        let mut collection = Collection::default();
        let cancelled = self
            .dispatch(files, &scanner, &mut pool, &mut collection, total)
            .await;

        let finished = !cancelled
            && self
                .state
                .transition_from(&[RunState::Running, RunState::Paused], RunState::Completed);

        if !finished {
            for result in pool.drain(self.settings.drain_timeout()).await {
                self.collect(Ok(result), &mut collection, total);
            }
            metrics.log_summary();
            return Ok(self.finish_cancelled(collection, &stats, total));
        }

        pool.shutdown();
        metrics.log_summary();

        let writer = ReportWriter::new(output_dir, self.settings.top_words);
        let report_path = match writer.write(timestamp, &collection.entries, &stats).await {
            Ok(path) => path,
            Err(e) => {
                tracing::error!("{}", e);
                self.state.fail(&e.to_string(), &format!("Error: {}", e));
                return Err(e);
            }
        };

        self.state.set_report_path(report_path.clone());
        self.state.set_status(format!(
            "Search complete. {} files found with forbidden words. Report saved.",
            collection.entries.len()
        ));
        tracing::info!(
            "Scan complete: {} of {} files contained forbidden words",
            collection.entries.len(),
            total
        );

        Ok(self.summary(
            RunState::Completed,
            collection,
            &stats,
            Some(report_path),
            total,
        ))
    }

    /// Create the output directory and enumerate the root
    async fn setup(&self, run: &PreparedRun) -> ScanResult<(Utf8PathBuf, Vec<Utf8PathBuf>)> {
        tokio::fs::create_dir_all(&run.output_dir)
            .await
            .map_err(|source| ScanError::Setup {
                path: run.output_dir.clone(),
                source,
            })?;

        let output_dir = run
            .output_dir
            .canonicalize_utf8()
            .map_err(|source| ScanError::Setup {
                path: run.output_dir.clone(),
                source,
            })?;

        // Flat artifacts in the root would overwrite the sources being scanned
        if output_dir == run.root {
            return Err(ScanError::InvalidInput {
                path: output_dir,
                reason: "output directory must not be the search root".to_string(),
            });
        }

        let root = run.root.clone();
        let skip = output_dir.clone();
        let files = tokio::task::spawn_blocking(move || collect_files(&root, Some(skip.as_path())))
            .await
            .map_err(|e| ScanError::Setup {
                path: run.root.clone(),
                source: std::io::Error::other(e),
            })??;

        Ok((output_dir, files))
    }

    /// Submit every file and collect results until done or cancelled
    ///
    /// While paused nothing is submitted and no completion is consumed.
    ///
    /// # Returns
    /// `true` if the loop stopped because of cancellation
    async fn dispatch(
        &self,
        files: Vec<Utf8PathBuf>,
        scanner: &Arc<FileScanner>,
        pool: &mut WorkerPool<ScanResult<Option<ReportEntry>>>,
        collection: &mut Collection,
        total: usize,
    ) -> bool {
        let gate = pool.gate();
        let mut pending = files.into_iter();
        let mut next_file = pending.next();

        loop {
            if next_file.is_none() && pool.in_flight() == 0 {
                return false;
            }

            if !self.signals.wait_if_paused().await {
                return true;
            }

            tokio::select! {
                biased;

                _ = self.signals.cancelled() => return true,

                _ = self.signals.paused() => continue,

                Some(joined) = pool.next_completed(), if pool.in_flight() > 0 => {
                    self.collect(joined, collection, total);
                }

                Some(admission) = gate.admit(), if next_file.is_some() => {
                    if let Some(path) = next_file.take() {
                        let scanner = Arc::clone(scanner);
                        pool.spawn(admission, async move { scanner.process(&path).await });
                    }
                    next_file = pending.next();
                }
            }
        }
    }

    /// Fold one finished job into the collection and publish progress
    fn collect(
        &self,
        joined: Result<ScanResult<Option<ReportEntry>>, JoinError>,
        collection: &mut Collection,
        total: usize,
    ) {
        collection.processed += 1;

        let name = match joined {
            Ok(Ok(Some(entry))) => {
                self.state.record_entry(&entry);
                let name = entry.file_name.clone();
                collection.entries.push(entry);
                Some(name)
            }
            Ok(Ok(None)) => None,
            Ok(Err(e)) if !e.is_fatal() => {
                tracing::warn!("Skipping file: {}", e);
                None
            }
            Ok(Err(e)) => {
                tracing::error!("Unexpected error from scan worker: {}", e);
                None
            }
            Err(e) => {
                tracing::error!("Scan worker failed: {}", e);
                None
            }
        };

        self.state.update_progress(
            collection.processed,
            format!(
                "Processed: {} (File {} of {})",
                name.as_deref().unwrap_or("N/A"),
                collection.processed,
                total
            ),
        );
    }

    fn finish_cancelled(
        &self,
        collection: Collection,
        stats: &WordStatistics,
        total: usize,
    ) -> ScanSummary {
        self.state
            .transition_from(&[RunState::Cancelling], RunState::Cancelled);
        self.state.set_status(STATUS_CANCELLED);
        tracing::warn!(
            "Scan cancelled after {} of {} files, no report written",
            collection.processed,
            total
        );
        self.summary(RunState::Cancelled, collection, stats, None, total)
    }

    fn summary(
        &self,
        run_state: RunState,
        collection: Collection,
        stats: &WordStatistics,
        report_path: Option<Utf8PathBuf>,
        total_files: usize,
    ) -> ScanSummary {
        ScanSummary {
            run_state,
            entries: collection.entries,
            word_counts: stats.snapshot(),
            report_path,
            total_files,
            processed: collection.processed,
        }
    }
}

/// Resolve `root` to an absolute directory path
fn validate_root(root: &Utf8Path) -> ScanResult<Utf8PathBuf> {
    let invalid = |reason: &str| ScanError::InvalidInput {
        path: root.to_path_buf(),
        reason: reason.to_string(),
    };

    let canonical = root
        .canonicalize_utf8()
        .map_err(|_| invalid("directory not found"))?;

    if !canonical.is_dir() {
        return Err(invalid("not a directory"));
    }

    Ok(canonical)
}
