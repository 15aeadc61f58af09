use indexmap::IndexMap;
use std::sync::{Mutex, PoisonError};

/// Destination for per-word match counts produced by the file scanner
#[cfg_attr(test, mockall::automock)]
pub trait StatsSink: Send + Sync {
    /// Add `amount` occurrences of `word`
    fn increment(&self, word: &str, amount: u64);
}

/// Run-wide word → occurrence count mapping shared by all workers
///
/// Increments are serialized by a single mutex, so no update is lost no matter
/// how many workers report at once. The map remembers the order in which words
/// were first counted; [`snapshot`](Self::snapshot) uses it to break ties.
///
/// Read the aggregate only after every worker has finished. A snapshot taken
/// while workers are still running is valid but incomplete.
#[derive(Debug, Default)]
pub struct WordStatistics {
    counts: Mutex<IndexMap<String, u64>>,
}

impl WordStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    /// All `(word, count)` pairs, highest count first
    ///
    /// Equal counts keep first-seen order.
    pub fn snapshot(&self) -> Vec<(String, u64)> {
        let counts = self.counts.lock().unwrap_or_else(PoisonError::into_inner);
        let mut entries: Vec<(String, u64)> = counts
            .iter()
            .map(|(word, count)| (word.clone(), *count))
            .collect();
        drop(counts);

        entries.sort_by(|a, b| b.1.cmp(&a.1));
        entries
    }

    /// The first `k` entries of [`snapshot`](Self::snapshot)
    pub fn top(&self, k: usize) -> Vec<(String, u64)> {
        let mut entries = self.snapshot();
        entries.truncate(k);
        entries
    }

    /// Sum of all counts
    pub fn total(&self) -> u64 {
        self.counts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .sum()
    }

    pub fn clear(&self) {
        self.counts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl StatsSink for WordStatistics {
    fn increment(&self, word: &str, amount: u64) {
        if amount == 0 {
            return;
        }

        let mut counts = self.counts.lock().unwrap_or_else(PoisonError::into_inner);
        match counts.get_mut(word) {
            Some(count) => *count += amount,
            None => {
                counts.insert(word.to_string(), amount);
            }
        }
    }
}
