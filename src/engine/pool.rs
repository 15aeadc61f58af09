// Bounded worker pool for file scans
//
// A job may only be spawned while holding an admission permit; the permit
// moves into the task and is released when the task finishes. Results come
// back through a `JoinSet`, which yields them in completion order.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::{JoinError, JoinSet};

/// Counting gate that limits how many jobs run at once
#[derive(Debug, Clone)]
pub struct AdmissionGate {
    semaphore: Arc<Semaphore>,
    limit: usize,
}

/// Proof of admission; the slot frees up when this is dropped
#[derive(Debug)]
pub struct Admission {
    _permit: OwnedSemaphorePermit,
}

impl AdmissionGate {
    pub fn new(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(limit)),
            limit,
        }
    }

    /// Wait for a free slot.
    ///
    /// Returns `None` once the gate has been closed.
    pub async fn admit(&self) -> Option<Admission> {
        self.semaphore
            .clone()
            .acquire_owned()
            .await
            .ok()
            .map(|permit| Admission { _permit: permit })
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Number of admissions currently held
    pub fn active(&self) -> usize {
        self.limit - self.semaphore.available_permits()
    }

    /// Refuse all further admissions. Pending `admit` calls return `None`.
    pub fn close(&self) {
        self.semaphore.close();
    }
}

/// Runs admitted jobs and hands back their results as they finish
pub struct WorkerPool<R> {
    gate: AdmissionGate,
    tasks: JoinSet<R>,
}

impl<R: Send + 'static> WorkerPool<R> {
    /// Create a pool that runs at most `limit` jobs concurrently
    pub fn new(limit: usize) -> Self {
        Self {
            gate: AdmissionGate::new(limit),
            tasks: JoinSet::new(),
        }
    }

    /// A handle to this pool's gate, for waiting on a slot without borrowing the pool
    pub fn gate(&self) -> AdmissionGate {
        self.gate.clone()
    }

    pub fn limit(&self) -> usize {
        self.gate.limit()
    }

    /// Jobs spawned and not yet collected
    pub fn in_flight(&self) -> usize {
        self.tasks.len()
    }

    /// Spawn a job under an admission obtained from [`gate`](Self::gate)
    pub fn spawn<F>(&mut self, admission: Admission, job: F)
    where
        F: Future<Output = R> + Send + 'static,
    {
        self.tasks.spawn(async move {
            let _admission = admission;
            job.await
        });
    }

    /// Wait for a free slot, then spawn the job.
    ///
    /// Returns false (and drops the job) if the pool has been shut down.
    pub async fn submit<F>(&mut self, job: F) -> bool
    where
        F: Future<Output = R> + Send + 'static,
    {
        match self.gate.admit().await {
            Some(admission) => {
                self.spawn(admission, job);
                true
            }
            None => false,
        }
    }

    /// Next finished job in completion order, or `None` when nothing is in flight
    pub async fn next_completed(&mut self) -> Option<Result<R, JoinError>> {
        self.tasks.join_next().await
    }

    /// Collect whatever finishes within `timeout`, then abort the rest
    pub async fn drain(&mut self, timeout: Duration) -> Vec<R> {
        let mut results = Vec::new();
        let deadline = tokio::time::Instant::now() + timeout;

        while !self.tasks.is_empty() {
            match tokio::time::timeout_at(deadline, self.tasks.join_next()).await {
                Ok(Some(Ok(result))) => results.push(result),
                Ok(Some(Err(e))) => tracing::error!("Worker task failed while draining: {}", e),
                Ok(None) => break,
                Err(_) => {
                    tracing::warn!(
                        "Drain timed out after {:?}, aborting {} workers",
                        timeout,
                        self.tasks.len()
                    );
                    break;
                }
            }
        }

        self.shutdown();
        results
    }

    /// Close the gate and abort every job still in flight
    pub fn shutdown(&mut self) {
        self.gate.close();
        self.tasks.abort_all();
    }
}
