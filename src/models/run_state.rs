use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of a single scan run.
///
/// ```text
/// Idle → Running → {Paused ⇄ Running} → {Completed | Cancelling → Cancelled | Failed}
/// ```
///
/// A run paused after its last file finished may complete directly from
/// `Paused`. Terminal states may start a new run or be reset back to `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum RunState {
    #[default]
    Idle,
    Running,
    Paused,
    Cancelling,
    Cancelled,
    Completed,
    Failed,
}

impl RunState {
    /// A run is in flight and owns the worker pool
    pub fn is_active(self) -> bool {
        matches!(self, Self::Running | Self::Paused | Self::Cancelling)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Cancelled | Self::Completed | Self::Failed)
    }

    /// Check whether moving from `self` to `next` is a legal transition
    pub fn can_transition_to(self, next: RunState) -> bool {
        use RunState::*;

        match (self, next) {
            (Idle, Running | Failed) => true,
            (Running, Paused | Cancelling | Completed | Failed) => true,
            (Paused, Running | Cancelling | Completed | Failed) => true,
            (Cancelling, Cancelled) => true,
            (Cancelled | Completed | Failed, Running | Failed | Idle) => true,
            _ => false,
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Cancelling => "cancelling",
            Self::Cancelled => "cancelled",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Observable state of the scan controller.
///
/// Owned by [`crate::state::StateManager`]; read it through `snapshot()` or
/// `read()` and mutate it only through the manager so change events fire.
#[derive(Clone, Debug, Default)]
pub struct ScanState {
    pub run_state: RunState,

    // Run inputs
    pub root: Option<Utf8PathBuf>,
    pub output_dir: Option<Utf8PathBuf>,

    // Progress
    pub processed: usize,
    pub total: usize,
    pub status_message: String,

    // Results
    pub entries_found: usize,
    pub total_matches: u64,
    pub report_path: Option<Utf8PathBuf>,
    pub last_error: Option<String>,
}

impl ScanState {
    /// Fraction of enumerated files that have completed, in `0.0..=1.0`
    pub fn progress_fraction(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.processed as f64 / self.total as f64
        }
    }

    /// Clear all run-related fields and return to `Idle`.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Prepare for a new run over `root`.
    pub fn begin_run(&mut self, root: Utf8PathBuf, output_dir: Utf8PathBuf) {
        self.run_state = RunState::Running;
        self.root = Some(root);
        self.output_dir = Some(output_dir);
        self.processed = 0;
        self.total = 0;
        self.entries_found = 0;
        self.total_matches = 0;
        self.report_path = None;
        self.last_error = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state() {
        let state = ScanState::default();
        assert_eq!(state.run_state, RunState::Idle);
        assert_eq!(state.progress_fraction(), 0.0);
        assert!(state.root.is_none());
    }

    #[test]
    fn test_legal_transitions() {
        use RunState::*;

        assert!(Idle.can_transition_to(Running));
        assert!(Running.can_transition_to(Paused));
        assert!(Paused.can_transition_to(Running));
        assert!(Paused.can_transition_to(Cancelling));
        assert!(Cancelling.can_transition_to(Cancelled));
        assert!(Running.can_transition_to(Completed));
        assert!(Paused.can_transition_to(Completed));
        assert!(Completed.can_transition_to(Running));
        assert!(Failed.can_transition_to(Idle));
    }

    #[test]
    fn test_illegal_transitions() {
        use RunState::*;

        assert!(!Idle.can_transition_to(Paused));
        assert!(!Idle.can_transition_to(Completed));
        assert!(!Cancelling.can_transition_to(Running));
        assert!(!Cancelling.can_transition_to(Completed));
        assert!(!Completed.can_transition_to(Paused));
        assert!(!Running.can_transition_to(Idle));
    }

    #[test]
    fn test_active_and_terminal() {
        assert!(RunState::Paused.is_active());
        assert!(RunState::Cancelling.is_active());
        assert!(!RunState::Idle.is_active());
        assert!(RunState::Cancelled.is_terminal());
        assert!(!RunState::Running.is_terminal());
    }

    #[test]
    fn test_progress_fraction() {
        let state = ScanState {
            processed: 3,
            total: 4,
            ..Default::default()
        };
        assert_eq!(state.progress_fraction(), 0.75);
    }

    #[test]
    fn test_begin_run_clears_previous_results() {
        let mut state = ScanState {
            run_state: RunState::Completed,
            processed: 9,
            total: 9,
            entries_found: 2,
            last_error: Some("boom".to_string()),
            ..Default::default()
        };

        state.begin_run("/data".into(), "/out".into());

        assert_eq!(state.run_state, RunState::Running);
        assert_eq!(state.processed, 0);
        assert_eq!(state.entries_found, 0);
        assert!(state.last_error.is_none());
        assert_eq!(state.root.as_deref(), Some(camino::Utf8Path::new("/data")));
    }

    #[test]
    fn test_display() {
        assert_eq!(RunState::Cancelling.to_string(), "cancelling");
    }
}
