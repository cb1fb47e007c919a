/*!
 * Translation job registry.
 *
 * Each job gets a handle with a shared cancel flag and a status. The
 * pipeline checks the flag between waves; an in-flight request is not
 * aborted but its result is discarded once the job is cancelled.
 */

use log::{info, warn};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use uuid::Uuid;

/// Lifecycle of a job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Degraded(String),
    Cancelled,
    Failed(String),
}

impl JobStatus {
    pub fn is_finished(&self) -> bool {
        !matches!(self, Self::Pending | Self::Running)
    }
}

#[derive(Debug)]
struct JobState {
    cancelled: AtomicBool,
    status: RwLock<JobStatus>,
}

/// Shared handle to one job
#[derive(Debug, Clone)]
pub struct JobHandle {
    id: String,
    state: Arc<JobState>,
}

impl JobHandle {
    /// Standalone handle, not tracked by any registry
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            state: Arc::new(JobState {
                cancelled: AtomicBool::new(false),
                status: RwLock::new(JobStatus::Pending),
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Ask the job to stop at its next checkpoint
    pub fn cancel(&self) {
        if !self.state.cancelled.swap(true, Ordering::SeqCst) {
            info!("Cancellation requested for job {}", self.id);
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.cancelled.load(Ordering::SeqCst)
    }

    pub fn status(&self) -> JobStatus {
        self.state.status.read().clone()
    }

    pub fn set_status(&self, status: JobStatus) {
        *self.state.status.write() = status;
    }
}

impl Default for JobHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Registry of jobs by id, shared by cloning
#[derive(Debug, Clone, Default)]
pub struct JobRegistry {
    jobs: Arc<RwLock<HashMap<String, JobHandle>>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new pending job
    pub fn create(&self) -> JobHandle {
        let handle = JobHandle::new();
        self.jobs.write().insert(handle.id().to_string(), handle.clone());
        handle
    }

    pub fn get(&self, id: &str) -> Option<JobHandle> {
        self.jobs.read().get(id).cloned()
    }

    /// Cancel a job by id; false when the id is unknown
    pub fn cancel(&self, id: &str) -> bool {
        match self.get(id) {
            Some(handle) => {
                handle.cancel();
                true
            }
            None => {
                warn!("Cannot cancel unknown job {}", id);
                false
            }
        }
    }

    /// Cancel every unfinished job
    pub fn cancel_all(&self) {
        for handle in self.jobs.read().values() {
            if !handle.status().is_finished() {
                handle.cancel();
            }
        }
    }

    /// Drop finished jobs, returning how many were removed
    pub fn prune_finished(&self) -> usize {
        let mut jobs = self.jobs.write();
        let before = jobs.len();
        jobs.retain(|_, handle| !handle.status().is_finished());
        before - jobs.len()
    }

    pub fn len(&self) -> usize {
        self.jobs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.read().is_empty()
    }
}
