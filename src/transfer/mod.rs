// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Upload/download progress tracking
//!
//! The client registers every progress-tracked transfer with the
//! [`ProgressTracker`] and hands the transport a [`ProgressReporter`].
//! The transport reports fractions while bytes move and finishes the
//! reporter exactly once; that completion resumes the waiting caller.

mod tracker;

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::transport::TransportError;

pub use tracker::{
    ProgressCallback, ProgressTracker, TaskId, TransferOutcome, TransferResult,
};

/// Cloneable progress-only view of a task, for use inside body streams
#[derive(Clone)]
pub struct ProgressHandle {
    task_id: TaskId,
    tracker: ProgressTracker,
}

impl ProgressHandle {
    pub fn report(&self, fraction: f64) {
        self.tracker.update_progress(self.task_id, fraction);
    }
}

/// Handed to the transport for one transfer
///
/// Dropping a reporter without calling [`finish`](Self::finish) completes
/// the task with an error so the waiting caller is never left hanging.
pub struct ProgressReporter {
    task_id: TaskId,
    tracker: ProgressTracker,
    finished: bool,
}

impl ProgressReporter {
    pub fn new(task_id: TaskId, tracker: ProgressTracker) -> Self {
        Self {
            task_id,
            tracker,
            finished: false,
        }
    }

    pub fn task_id(&self) -> TaskId {
        self.task_id
    }

    /// Report progress
    pub fn progress(&self, fraction: f64) {
        self.tracker.update_progress(self.task_id, fraction);
    }

    /// Progress-only handle that can be moved into streams
    pub fn handle(&self) -> ProgressHandle {
        ProgressHandle {
            task_id: self.task_id,
            tracker: self.tracker.clone(),
        }
    }

    /// Report the terminal outcome
    pub fn finish(mut self, result: TransferResult) {
        self.finished = true;
        self.tracker.complete(self.task_id, result);
    }
}

impl Drop for ProgressReporter {
    fn drop(&mut self) {
        if !self.finished {
            warn!(task_id = %self.task_id, "transfer ended without an outcome");
            self.tracker.complete(
                self.task_id,
                Err(TransportError::Cancelled(
                    "transfer ended without reporting an outcome".to_string(),
                )),
            );
        }
    }
}

/// A downloaded file that is deleted on drop unless kept
///
/// Covers every way a download can end early: a failed write, a failing
/// response hook, or a caller that stops waiting.
#[derive(Debug)]
pub struct PartialFile {
    path: PathBuf,
    keep: bool,
}

impl PartialFile {
    pub fn new(path: PathBuf) -> Self {
        Self { path, keep: false }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Disarm the guard and hand back the location
    pub fn keep(mut self) -> PathBuf {
        self.keep = true;
        std::mem::take(&mut self.path)
    }
}

impl Drop for PartialFile {
    fn drop(&mut self) {
        if self.keep {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(location = %self.path.display(), "partial download removed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                location = %self.path.display(),
                error = %e,
                "cannot remove partial download"
            ),
        }
    }
}
