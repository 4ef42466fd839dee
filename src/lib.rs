//! taskq - dedicated-thread task queues
//!
//! A [`Worker`] owns one OS thread and one FIFO queue of closures, runs them
//! one at a time, reports failures to observers instead of dying, and drains
//! its queue before it stops. A [`WorkerPool`] spreads submissions over many
//! workers and can grow or be rebuilt at runtime.
//!
//! # Quick Start
//!
//! ```no_run
//! use taskq::prelude::*;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//!
//! let pool = WorkerPool::new(4, "jobs", true);
//! pool.start().unwrap();
//!
//! let done = Arc::new(AtomicUsize::new(0));
//! for _ in 0..100 {
//!     let done = done.clone();
//!     pool.add_task(move || {
//!         done.fetch_add(1, Ordering::Relaxed);
//!     })
//!     .unwrap();
//! }
//!
//! pool.stop_sync().unwrap();
//! assert_eq!(done.load(Ordering::Relaxed), 100);
//! ```
//!
//! # Failure handling
//!
//! - A panicking task, or a fallible task returning `Err`, is wrapped in a
//!   [`TaskExecutionError`] and handed to the worker's task-crash observers.
//!   The worker moves on to the next task.
//! - A fault in the worker loop itself is reported as a [`ThreadCrashError`];
//!   it ends the thread unless an observer answers [`CrashAction::Suppress`].
//! - Observers that panic are logged and skipped.
//!
//! The crate logs through [`tracing`] and never installs a subscriber.

// Lint configuration
#![warn(missing_debug_implementations)]

pub mod config;
pub mod error;
pub mod executor;
pub mod prelude;

// Re-export key types at crate root
pub use config::{PoolConfig, PoolConfigBuilder};
pub use error::{Error, Result};
pub use executor::{
    on_worker_created, remove_worker_created_observer, CrashAction, ObserverId, Task,
    TaskExecutionError, TaskFailure, ThreadCrashError, Worker, WorkerHandle, WorkerPool,
    WorkerStats,
};
