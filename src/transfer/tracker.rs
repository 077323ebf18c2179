// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Progress tracker for in-flight transfers

use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::oneshot;
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::http::{Response, ResponseMeta};
use crate::transport::TransportError;

/// Progress callback, receives a fraction in `0.0..=1.0`
pub type ProgressCallback = Arc<dyn Fn(f64) + Send + Sync>;

/// Terminal result of a transfer
pub type TransferResult = std::result::Result<TransferOutcome, TransportError>;

/// Unique identifier for a transfer task
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

impl TaskId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for TaskId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a finished transfer produced
#[derive(Debug, Clone)]
pub enum TransferOutcome {
    /// Upload finished; the server's response
    Uploaded(Response),
    /// Download finished; where the body was written
    Downloaded {
        location: PathBuf,
        response: ResponseMeta,
    },
}

struct TaskEntry {
    on_progress: Option<ProgressCallback>,
    waiter: oneshot::Sender<TransferResult>,
}

/// Correlates transfer tasks with their progress callbacks and waiting callers
///
/// Each task id holds at most one waiter. Completing a task resumes that
/// waiter and drops all state for the id; later completions are ignored.
#[derive(Clone, Default)]
pub struct ProgressTracker {
    tasks: Arc<DashMap<TaskId, TaskEntry>>,
    next_id: Arc<AtomicU64>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh task id
    pub fn next_task_id(&self) -> TaskId {
        TaskId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1)
    }

    /// Register a task; the receiver resolves when the task completes
    pub fn register(
        &self,
        task_id: TaskId,
        on_progress: Option<ProgressCallback>,
    ) -> Result<oneshot::Receiver<TransferResult>> {
        match self.tasks.entry(task_id) {
            Entry::Occupied(_) => Err(Error::invalid_request(format!(
                "transfer task {} is already registered",
                task_id
            ))),
            Entry::Vacant(slot) => {
                let (waiter, receiver) = oneshot::channel();
                slot.insert(TaskEntry {
                    on_progress,
                    waiter,
                });
                debug!(task_id = %task_id, "transfer registered");
                Ok(receiver)
            }
        }
    }

    /// Report progress for a task. Unknown ids are ignored.
    pub fn update_progress(&self, task_id: TaskId, fraction: f64) {
        let callback = self
            .tasks
            .get(&task_id)
            .and_then(|entry| entry.on_progress.clone());

        if let Some(callback) = callback {
            let fraction = if fraction.is_nan() { 0.0 } else { fraction.clamp(0.0, 1.0) };
            trace!(task_id = %task_id, fraction, "transfer progress");
            callback(fraction);
        }
    }

    /// Complete a task. Returns false if the task was already completed or never registered.
    pub fn complete(&self, task_id: TaskId, result: TransferResult) -> bool {
        let Some((_, entry)) = self.tasks.remove(&task_id) else {
            trace!(task_id = %task_id, "duplicate completion ignored");
            return false;
        };
        debug!(task_id = %task_id, ok = result.is_ok(), "transfer completed");
        // The waiter may have gone away; the entry is removed either way.
        let _ = entry.waiter.send(result);
        true
    }

    pub fn is_tracking(&self, task_id: TaskId) -> bool {
        self.tasks.contains_key(&task_id)
    }

    /// Number of in-flight tasks
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}
