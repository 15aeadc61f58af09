//! Forbidden Finder - command-line front-end
//!
//! Scans a directory tree for forbidden words, writes a verbatim copy and a
//! redacted `.replaced` copy of every affected file into the output directory,
//! and saves a `ForbiddenFinder_Report_<timestamp>.txt` summary.
//!
//! # Execution Flow
//!
//! 1. Parse arguments and load `Forbidden Finder.yaml` (+ `FORBIDDEN_FINDER_*` env)
//! 2. Initialize logging → `<log_dir>/forbidden-finder.<date>`
//! 3. Build the tokio runtime and start the [`ScanController`]
//! 4. Print status events until the run finishes; Ctrl-C cancels the run
//! 5. Print the collected entries and the most popular words

use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use clap::Parser;
use forbidden_finder::logging::{LOG_PREFIX, setup_logging_with_console};
use forbidden_finder::{
    APP_NAME, ConfigManager, ForbiddenWords, RunState, ScanController, ScanRequest, ScanSettings,
    ScanSummary, StateChange, VERSION,
};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;

/// Find and redact forbidden words in a directory tree
#[derive(Parser, Debug)]
#[command(
    name = "forbidden-finder",
    version,
    about = "Find and redact forbidden words in a directory tree",
    after_help = "EXAMPLES:\n    \
        forbidden-finder ./docs --words words.txt\n    \
        forbidden-finder ./docs --words words.txt --output redacted --jobs 4"
)]
struct Cli {
    /// Directory to scan recursively
    #[arg(value_name = "ROOT")]
    root: Utf8PathBuf,

    /// Forbidden word list, one word per line
    #[arg(short, long, value_name = "FILE")]
    words: Option<Utf8PathBuf>,

    /// Output directory (overrides `output_dir` from the settings file)
    #[arg(short, long, value_name = "DIR")]
    output: Option<Utf8PathBuf>,

    /// Directory holding `Forbidden Finder.yaml`
    #[arg(short, long, value_name = "DIR", default_value = "Forbidden Finder Data")]
    config: Utf8PathBuf,

    /// Maximum number of files scanned at once
    #[arg(short, long, value_name = "NUM")]
    jobs: Option<usize>,

    /// Debug logging, mirrored to the console
    #[arg(long)]
    debug: bool,
}

impl Cli {
    fn apply_overrides(&self, settings: &mut ScanSettings) {
        if let Some(ref output) = self.output {
            settings.output_dir = output.to_string();
        }
        if self.jobs.is_some() {
            settings.max_concurrent_files = self.jobs;
        }
        if self.debug {
            settings.debug_mode = true;
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_manager = ConfigManager::new(&cli.config)?;
    let mut settings = config_manager.load_settings()?;
    cli.apply_overrides(&mut settings);

    let _guard = setup_logging_with_console(
        Utf8PathBuf::from(&settings.log_dir).as_path(),
        LOG_PREFIX,
        settings.debug_mode,
        settings.debug_mode,
    )?;

    tracing::info!("Starting {} v{}", APP_NAME, VERSION);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("forbidden-finder-worker")
        .build()
        .context("Failed to build tokio runtime")?;

    let result = runtime.block_on(run_scan(cli, settings));

    if let Err(ref e) = result {
        tracing::error!("Scan failed: {:#}", e);
    }
    tracing::info!("Shutdown complete");
    result
}

fn load_words(path: Option<&Utf8PathBuf>) -> Result<ForbiddenWords> {
    match path {
        Some(path) if path.exists() => ForbiddenWords::from_file(path)
            .with_context(|| format!("Failed to load forbidden words from {}", path)),
        Some(path) => {
            tracing::warn!("Word file {} not found, scanning with an empty word set", path);
            Ok(ForbiddenWords::default())
        }
        None => {
            tracing::warn!("No word file given, scanning with an empty word set");
            Ok(ForbiddenWords::default())
        }
    }
}

async fn run_scan(cli: Cli, settings: ScanSettings) -> Result<()> {
    let words = load_words(cli.words.as_ref())?;
    let output_dir = Utf8PathBuf::from(&settings.output_dir);

    let controller = Arc::new(ScanController::new(settings));
    let mut events = controller.subscribe();

    let mut handle = controller.start(ScanRequest::new(cli.root, words, output_dir))?;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut cancel_requested = false;

    let joined = loop {
        tokio::select! {
            joined = &mut handle => break joined,

            _ = &mut ctrl_c, if !cancel_requested => {
                cancel_requested = true;
                eprintln!("Cancelling...");
                controller.cancel();
            }

            event = events.recv() => match event {
                Ok(change) => print_event(&change),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!("Console fell behind, {} events skipped", skipped);
                }
                Err(RecvError::Closed) => {}
            },
        }
    };

    while let Ok(change) = events.try_recv() {
        print_event(&change);
    }

    let summary = joined.context("Scan task panicked")??;
    print_summary(&summary, controller.settings().top_words);
    Ok(())
}

fn print_event(change: &StateChange) {
    if let StateChange::StatusChanged { message } = change {
        println!("{}", message);
    }
}

fn print_summary(summary: &ScanSummary, top_k: usize) {
    println!();
    match summary.run_state {
        RunState::Cancelled => println!(
            "Cancelled after {} of {} files ({} with forbidden words collected)",
            summary.processed,
            summary.total_files,
            summary.entries.len()
        ),
        _ => println!(
            "Scanned {} files, {} contained forbidden words ({} replacements)",
            summary.total_files,
            summary.entries.len(),
            summary.total_matches()
        ),
    }

    for entry in &summary.entries {
        println!("  {}", entry.report_line());
    }

    if !summary.word_counts.is_empty() {
        println!();
        println!("Most popular forbidden words:");
        for (word, count) in summary.word_counts.iter().take(top_k) {
            println!("  {}: {} replacements", word, count);
        }
    }

    if let Some(ref path) = summary.report_path {
        println!();
        println!("Report: {}", path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_all_options() {
        let cli = Cli::try_parse_from([
            "forbidden-finder",
            "./docs",
            "--words",
            "words.txt",
            "--output",
            "redacted",
            "--jobs",
            "3",
            "--debug",
        ])
        .unwrap();

        assert_eq!(cli.root, Utf8PathBuf::from("./docs"));
        assert_eq!(cli.words, Some(Utf8PathBuf::from("words.txt")));

        let mut settings = ScanSettings::default();
        cli.apply_overrides(&mut settings);
        assert_eq!(settings.output_dir, "redacted");
        assert_eq!(settings.max_concurrent_files, Some(3));
        assert!(settings.debug_mode);
    }

    #[test]
    fn test_cli_requires_root() {
        assert!(Cli::try_parse_from(["forbidden-finder"]).is_err());
    }

    #[test]
    fn test_missing_word_file_is_empty_set() {
        let words = load_words(Some(&Utf8PathBuf::from("/no/such/words.txt"))).unwrap();
        assert!(words.is_empty());
    }
}
