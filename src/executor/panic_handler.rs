//! Panic capture and the error types delivered to crash observers.

use super::task::{BoxError, TaskId};
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Run `f`, turning a panic into a [`PanicInfo`].
pub(crate) fn catch_panic<F, R>(f: F) -> Result<R, PanicInfo>
where
    F: FnOnce() -> R,
{
    catch_unwind(AssertUnwindSafe(f)).map_err(|payload| PanicInfo::from_payload(payload.as_ref()))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanicInfo {
    pub message: String,
}

impl PanicInfo {
    pub(crate) fn from_payload(payload: &(dyn Any + Send)) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };

        Self { message }
    }
}

impl std::fmt::Display for PanicInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

/// Why a task body did not complete normally.
#[derive(Debug, thiserror::Error)]
pub enum TaskFailure {
    #[error("task panicked: {0}")]
    Panicked(PanicInfo),

    #[error("task returned an error: {0}")]
    Failed(#[source] BoxError),
}

/// A task failure, as seen by task-crash observers. The worker keeps running.
#[derive(Debug, thiserror::Error)]
#[error("{task} failed on worker {worker}")]
pub struct TaskExecutionError {
    pub task: TaskId,
    pub worker: String,
    #[source]
    pub failure: TaskFailure,
}

impl TaskExecutionError {
    /// Message of the underlying panic or error, without any wrapping.
    pub fn message(&self) -> String {
        match &self.failure {
            TaskFailure::Panicked(info) => info.message.clone(),
            TaskFailure::Failed(e) => e.to_string(),
        }
    }

    pub fn is_panic(&self) -> bool {
        matches!(self.failure, TaskFailure::Panicked(_))
    }
}

/// A fault in the worker's own run loop, outside any task body.
#[derive(Debug, Clone, thiserror::Error)]
#[error("worker {worker} crashed: {panic}")]
pub struct ThreadCrashError {
    pub worker: String,
    pub panic: PanicInfo,
}

/// Decision a thread-crash observer can make about a loop fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CrashAction {
    /// Let the panic terminate the worker thread.
    #[default]
    Propagate,
    /// End the worker thread quietly.
    Suppress,
}
