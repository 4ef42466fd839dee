pub use crate::config::{PoolConfig, PoolConfigBuilder};
pub use crate::error::{Error, Result};
pub use crate::executor::{
    on_worker_created, remove_worker_created_observer, CrashAction, ObserverId,
    TaskExecutionError, ThreadCrashError, Worker, WorkerHandle, WorkerPool,
};
