// State management module
//
// StateManager wraps ScanState behind Arc<RwLock<T>> and broadcasts change
// events that make up the progress and status stream of a run.

use crate::models::{ReportEntry, RunState, ScanState};
use camino::Utf8PathBuf;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::broadcast;

/// Capacity of the change channel. Slow subscribers lose the oldest events.
pub const EVENT_CAPACITY: usize = 256;

/// Change events emitted when the scan state is modified
#[derive(Clone, Debug, PartialEq)]
pub enum StateChange {
    /// The run moved between lifecycle states
    RunStateChanged { from: RunState, to: RunState },

    /// Processed or total file count changed
    ProgressUpdated { processed: usize, total: usize },

    /// Human-readable status line changed
    StatusChanged { message: String },

    /// A file with forbidden words was collected
    EntryRecorded { file_name: String, match_count: u64 },

    /// State has been reset to idle
    StateReset,
}

/// Thread-safe state manager with event emission
///
/// - [`read()`](Self::read) / [`snapshot()`](Self::snapshot) for reading
/// - [`update()`](Self::update) for mutations with automatic event emission
/// - [`subscribe()`](Self::subscribe) for listening to changes
///
/// Sending never blocks: events go out on a `broadcast` channel and are
/// dropped when nobody is listening.
pub struct StateManager {
    state: Arc<RwLock<ScanState>>,
    state_tx: broadcast::Sender<StateChange>,
}

impl StateManager {
    pub fn new() -> Self {
        let (state_tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            state: Arc::new(RwLock::new(ScanState::default())),
            state_tx,
        }
    }

    /// Clone of the current state
    pub fn snapshot(&self) -> ScanState {
        self.read_guard().clone()
    }

    /// Execute a function with read access to the state
    ///
    /// # Example
    /// ```ignore
    /// let running = state_manager.read(|state| state.run_state.is_active());
    /// ```
    pub fn read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&ScanState) -> R,
    {
        f(&self.read_guard())
    }

    pub fn run_state(&self) -> RunState {
        self.read(|state| state.run_state)
    }

    /// Update the state and emit change events
    ///
    /// # Returns
    /// The events that were emitted
    pub fn update<F>(&self, update_fn: F) -> Vec<StateChange>
    where
        F: FnOnce(&mut ScanState),
    {
        self.try_update(|state| {
            update_fn(state);
            true
        })
        .unwrap_or_default()
    }

    /// Conditionally update the state under a single write lock
    ///
    /// `update_fn` returns false to reject the update; it must leave the state
    /// untouched in that case. Returns `None` when rejected.
    pub fn try_update<F>(&self, update_fn: F) -> Option<Vec<StateChange>>
    where
        F: FnOnce(&mut ScanState) -> bool,
    {
        let mut state = self.write_guard();
        let old_state = state.clone();

        if !update_fn(&mut state) {
            return None;
        }

        let changes = Self::detect_changes(&old_state, &state);
        for change in &changes {
            let _ = self.state_tx.send(change.clone());
        }

        Some(changes)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.state_tx.subscribe()
    }

    fn detect_changes(old: &ScanState, new: &ScanState) -> Vec<StateChange> {
        let mut changes = Vec::new();

        if old.run_state != new.run_state {
            changes.push(StateChange::RunStateChanged {
                from: old.run_state,
                to: new.run_state,
            });
        }

        if old.processed != new.processed || old.total != new.total {
            changes.push(StateChange::ProgressUpdated {
                processed: new.processed,
                total: new.total,
            });
        }

        if old.status_message != new.status_message {
            changes.push(StateChange::StatusChanged {
                message: new.status_message.clone(),
            });
        }

        changes
    }

    fn read_guard(&self) -> RwLockReadGuard<'_, ScanState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_guard(&self) -> RwLockWriteGuard<'_, ScanState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    // Lifecycle

    /// Claim the manager for a new run
    ///
    /// # Returns
    /// `Err(current)` if a run is already active
    pub fn begin_run(
        &self,
        root: Utf8PathBuf,
        output_dir: Utf8PathBuf,
    ) -> Result<Vec<StateChange>, RunState> {
        let mut current = RunState::Idle;
        self.try_update(|state| {
            current = state.run_state;
            if !state.run_state.can_transition_to(RunState::Running) {
                return false;
            }
            state.begin_run(root, output_dir);
            true
        })
        .ok_or(current)
    }

    /// Move to `to` only if the current state is one of `from`
    ///
    /// Returns false and leaves the state alone otherwise.
    pub fn transition_from(&self, from: &[RunState], to: RunState) -> bool {
        self.try_update(|state| {
            if !from.contains(&state.run_state) || !state.run_state.can_transition_to(to) {
                return false;
            }
            state.run_state = to;
            true
        })
        .is_some()
    }

    /// Record a failure, moving to `Failed` where the lifecycle allows it
    pub fn fail(&self, error: &str, status: &str) -> Vec<StateChange> {
        self.update(|state| {
            if state.run_state.can_transition_to(RunState::Failed) {
                state.run_state = RunState::Failed;
            }
            state.last_error = Some(error.to_string());
            state.status_message = status.to_string();
        })
    }

    /// Return to `Idle`, clearing all run data
    ///
    /// # Returns
    /// `Err(current)` while a run is active
    pub fn reset(&self) -> Result<Vec<StateChange>, RunState> {
        let mut current = RunState::Idle;
        let mut changes = self
            .try_update(|state| {
                current = state.run_state;
                if state.run_state.is_active() {
                    return false;
                }
                state.reset();
                true
            })
            .ok_or(current)?;

        let _ = self.state_tx.send(StateChange::StateReset);
        changes.push(StateChange::StateReset);
        Ok(changes)
    }

    // Progress

    pub fn set_total(&self, total: usize) -> Vec<StateChange> {
        self.update(|state| state.total = total)
    }

    pub fn set_status(&self, message: impl Into<String>) -> Vec<StateChange> {
        let message = message.into();
        self.update(|state| state.status_message = message)
    }

    /// Advance the processed count and status after one completion
    pub fn update_progress(&self, processed: usize, status: impl Into<String>) -> Vec<StateChange> {
        let status = status.into();
        self.update(|state| {
            state.processed = processed;
            state.status_message = status;
        })
    }

    /// Note a collected entry and emit [`StateChange::EntryRecorded`]
    pub fn record_entry(&self, entry: &ReportEntry) -> Vec<StateChange> {
        let mut changes = self.update(|state| {
            state.entries_found += 1;
            state.total_matches += entry.match_count;
        });

        let event = StateChange::EntryRecorded {
            file_name: entry.file_name.clone(),
            match_count: entry.match_count,
        };
        let _ = self.state_tx.send(event.clone());
        changes.push(event);

        changes
    }

    pub fn set_report_path(&self, path: Utf8PathBuf) -> Vec<StateChange> {
        self.update(|state| state.report_path = Some(path))
    }
}

impl Default for StateManager {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for StateManager {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            state_tx: self.state_tx.clone(),
        }
    }
}
