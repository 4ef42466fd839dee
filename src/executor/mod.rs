//! Task execution infrastructure.
//!
//! This module provides the execution primitives: single-thread workers with
//! their own FIFO queues, the resizable worker pool that dispatches across
//! them, and the observer lists used to report crashes and exits.

pub mod events;
pub mod panic_handler;
pub mod pool;
pub mod task;
pub mod worker;

pub use events::{on_worker_created, remove_worker_created_observer, ObserverId, Observers};
pub use panic_handler::{CrashAction, PanicInfo, TaskExecutionError, TaskFailure, ThreadCrashError};
pub use pool::WorkerPool;
pub use task::{BoxError, Task, TaskId, TaskResult};
pub use worker::{Worker, WorkerHandle, WorkerId, WorkerStats};
