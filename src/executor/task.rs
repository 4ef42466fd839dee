//! Task representation and execution.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Error type a fallible task may return.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Outcome of running a task body.
pub type TaskResult = Result<(), BoxError>;

/// Global task ID counter
static TASK_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

impl TaskId {
    fn next() -> Self {
        TaskId(TASK_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "task-{}", self.0)
    }
}

/// A unit of deferred work, queued on exactly one worker.
pub struct Task {
    pub(crate) id: TaskId,
    pub(crate) func: Box<dyn FnOnce() -> TaskResult + Send + 'static>,
    pub(crate) submit_time: Instant,
}

impl Task {
    /// Create a task from an infallible closure
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self::fallible(move || {
            f();
            Ok::<(), BoxError>(())
        })
    }

    /// Create a task whose `Err` return is reported like a panic
    pub fn fallible<F, E>(f: F) -> Self
    where
        F: FnOnce() -> Result<(), E> + Send + 'static,
        E: Into<BoxError>,
    {
        Task {
            id: TaskId::next(),
            func: Box::new(move || f().map_err(Into::into)),
            submit_time: Instant::now(),
        }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Execute the task
    pub(crate) fn execute(self) -> TaskResult {
        (self.func)()
    }
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("submit_time", &self.submit_time)
            .finish()
    }
}
