//! In-memory registry of active export jobs.
//!
//! Volatile by design: the registry only routes cancellation signals to
//! running background tasks. The job store remains the durable source of
//! truth, and any job whose handle is lost to a restart is picked up by
//! crash recovery instead.

use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::mpsc;
use tracing::debug;

/// Handle to a live export job's background task.
#[derive(Debug)]
pub struct ActiveJobHandle {
    pub job_id: String,
    cancel_tx: mpsc::Sender<()>,
    pub is_active: bool,
}

/// Process-wide map of active jobs, keyed by job ID.
#[derive(Debug, Default)]
pub struct JobRegistry {
    jobs: Mutex<HashMap<String, ActiveJobHandle>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a job and return the receiving end of its cancellation
    /// channel. The channel holds a single slot; senders never block.
    pub fn register(&self, job_id: &str) -> mpsc::Receiver<()> {
        let (cancel_tx, cancel_rx) = mpsc::channel(1);

        let handle = ActiveJobHandle {
            job_id: job_id.to_string(),
            cancel_tx,
            is_active: true,
        };

        self.jobs
            .lock()
            .expect("job registry lock poisoned")
            .insert(job_id.to_string(), handle);

        debug!("Registered active job {}", job_id);
        cancel_rx
    }

    /// Remove a job's handle once it reaches a terminal stage.
    pub fn deregister(&self, job_id: &str) {
        self.jobs
            .lock()
            .expect("job registry lock poisoned")
            .remove(job_id);
        debug!("Deregistered job {}", job_id);
    }

    /// Signal cancellation to a running job.
    ///
    /// Returns false when no handle exists (unknown ID, or the job already
    /// finished or belongs to a previous process). A full channel means a
    /// signal is already pending, which counts as success.
    pub fn request_cancel(&self, job_id: &str) -> bool {
        let jobs = self.jobs.lock().expect("job registry lock poisoned");

        match jobs.get(job_id) {
            Some(handle) => !matches!(
                handle.cancel_tx.try_send(()),
                Err(mpsc::error::TrySendError::Closed(_))
            ),
            None => false,
        }
    }

    /// Whether a job currently has a live handle.
    pub fn is_active(&self, job_id: &str) -> bool {
        self.jobs
            .lock()
            .expect("job registry lock poisoned")
            .contains_key(job_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_register_and_cancel() {
        let registry = JobRegistry::new();
        let mut rx = registry.register("job1");

        assert!(registry.is_active("job1"));
        assert!(registry.request_cancel("job1"));

        // The signal is observable on the channel.
        assert!(rx.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_cancel_unknown_job() {
        let registry = JobRegistry::new();
        assert!(!registry.request_cancel("missing"));
    }

    #[tokio::test]
    async fn test_double_cancel_is_idempotent() {
        let registry = JobRegistry::new();
        let _rx = registry.register("job1");

        assert!(registry.request_cancel("job1"));
        // Second signal finds the slot full; still a success.
        assert!(registry.request_cancel("job1"));
    }

    #[tokio::test]
    async fn test_deregister_removes_handle() {
        let registry = JobRegistry::new();
        let _rx = registry.register("job1");

        registry.deregister("job1");

        assert!(!registry.is_active("job1"));
        assert!(!registry.request_cancel("job1"));
    }
}
