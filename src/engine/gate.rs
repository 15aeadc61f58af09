// Pause / cancel signalling shared by the controller and its workers
//
// Both flags live in `tokio::sync::watch` channels. Waiters subscribe on demand
// and `wait_for` checks the current value before sleeping, so a resume or cancel
// that lands between the check and the wait is never missed.

use std::sync::Arc;
use tokio::sync::watch;

/// Cooperative pause and cancellation flags for one controller
///
/// Cloning is cheap; all clones observe the same flags.
#[derive(Debug, Clone)]
pub struct RunSignals {
    pause_tx: Arc<watch::Sender<bool>>,
    cancel_tx: Arc<watch::Sender<bool>>,
}

impl RunSignals {
    pub fn new() -> Self {
        let (pause_tx, _) = watch::channel(false);
        let (cancel_tx, _) = watch::channel(false);
        Self {
            pause_tx: Arc::new(pause_tx),
            cancel_tx: Arc::new(cancel_tx),
        }
    }

    /// Set the pause flag. Returns false if it was already set.
    pub fn pause(&self) -> bool {
        !self.pause_tx.send_replace(true)
    }

    /// Clear the pause flag and wake every blocked waiter.
    /// Returns false if the flag was not set.
    pub fn resume(&self) -> bool {
        self.pause_tx.send_replace(false)
    }

    /// Request cancellation. Paused waiters wake up and give up.
    pub fn cancel(&self) {
        self.cancel_tx.send_replace(true);
    }

    pub fn is_paused(&self) -> bool {
        *self.pause_tx.borrow()
    }

    pub fn is_cancelled(&self) -> bool {
        *self.cancel_tx.borrow()
    }

    /// Clear both flags before a new run
    pub fn reset(&self) {
        self.pause_tx.send_replace(false);
        self.cancel_tx.send_replace(false);
    }

    /// Block while paused.
    ///
    /// Returns `true` when the caller may proceed and `false` if the run was
    /// cancelled, either before or during the wait.
    pub async fn wait_if_paused(&self) -> bool {
        if self.is_cancelled() {
            return false;
        }
        if !self.is_paused() {
            return true;
        }

        let mut pause_rx = self.pause_tx.subscribe();
        let mut cancel_rx = self.cancel_tx.subscribe();

        tokio::select! {
            resumed = pause_rx.wait_for(|paused| !*paused) => {
                resumed.is_ok() && !self.is_cancelled()
            }
            _ = cancel_rx.wait_for(|cancelled| *cancelled) => false,
        }
    }

    /// Resolves once cancellation has been requested
    pub async fn cancelled(&self) {
        let mut cancel_rx = self.cancel_tx.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait
        let _ = cancel_rx.wait_for(|cancelled| *cancelled).await;
    }

    /// Resolves once the pause flag is set
    pub async fn paused(&self) {
        let mut pause_rx = self.pause_tx.subscribe();
        let _ = pause_rx.wait_for(|paused| *paused).await;
    }
}

impl Default for RunSignals {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{Duration, timeout};

    #[test]
    fn test_flags_start_clear() {
        let signals = RunSignals::new();
        assert!(!signals.is_paused());
        assert!(!signals.is_cancelled());
        assert!(tokio_test::block_on(signals.wait_if_paused()));
    }

    #[test]
    fn test_pause_and_resume_are_idempotent() {
        let signals = RunSignals::new();
        assert!(signals.pause());
        assert!(!signals.pause());
        assert!(signals.is_paused());

        assert!(signals.resume());
        assert!(!signals.resume());
        assert!(!signals.is_paused());
    }

    #[tokio::test]
    async fn test_resume_wakes_waiters() {
        let signals = RunSignals::new();
        signals.pause();

        let waiters: Vec<_> = (0..4)
            .map(|_| {
                let signals = signals.clone();
                tokio::spawn(async move { signals.wait_if_paused().await })
            })
            .collect();

        tokio::time::sleep(Duration::from_millis(20)).await;
        for waiter in &waiters {
            assert!(!waiter.is_finished(), "waiter should block while paused");
        }

        signals.resume();
        for waiter in waiters {
            let proceed = timeout(Duration::from_secs(1), waiter)
                .await
                .expect("waiter not woken")
                .unwrap();
            assert!(proceed);
        }
    }

    #[tokio::test]
    async fn test_cancel_releases_paused_waiters() {
        let signals = RunSignals::new();
        signals.pause();

        let waiter = {
            let signals = signals.clone();
            tokio::spawn(async move { signals.wait_if_paused().await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        signals.cancel();

        let proceed = timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter not woken")
            .unwrap();
        assert!(!proceed);
    }

    #[tokio::test]
    async fn test_cancelled_future_resolves() {
        let signals = RunSignals::new();
        let clone = signals.clone();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            clone.cancel();
        });

        timeout(Duration::from_secs(1), signals.cancelled())
            .await
            .expect("cancelled() never resolved");
        assert!(!signals.wait_if_paused().await);
    }

    #[test]
    fn test_reset_clears_both_flags() {
        let signals = RunSignals::new();
        signals.pause();
        signals.cancel();
        signals.reset();

        assert!(!signals.is_paused());
        assert!(!signals.is_cancelled());
    }
}
