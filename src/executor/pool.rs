use super::events::{ObserverId, Observers, TaskCrashObserver, ThreadCrashObserver};
use super::panic_handler::{CrashAction, TaskExecutionError, ThreadCrashError};
use super::task::{BoxError, Task};
use super::worker::{Worker, WorkerHandle};
use crate::config::PoolConfig;
use crate::error::{Error, Result};
use parking_lot::{Condvar, Mutex, RwLock};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Load snapshot of one worker, read without locking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Load {
    working: bool,
    depth: usize,
}

impl Load {
    fn of(worker: &Worker) -> Self {
        Self {
            working: worker.is_working(),
            depth: worker.queue_depth(),
        }
    }

    fn is_idle(&self) -> bool {
        !self.working && self.depth == 0
    }
}

// First idle worker other than the last one used; otherwise the shallowest
// queue, where equal depth prefers anything but `last_used` and then the
// earliest index.
fn pick_worker(loads: &[Load], last_used: usize) -> Option<usize> {
    let idle = loads
        .iter()
        .enumerate()
        .find(|(i, load)| *i != last_used && load.is_idle())
        .map(|(i, _)| i);
    if idle.is_some() {
        return idle;
    }

    let mut best: Option<(usize, usize)> = None;
    for (i, load) in loads.iter().enumerate() {
        best = match best {
            None => Some((i, load.depth)),
            Some((b, depth)) if load.depth < depth || (load.depth == depth && b == last_used) => {
                Some((i, load.depth))
            }
            keep => keep,
        };
    }
    best.map(|(i, _)| i)
}

/// A resizable group of [`Worker`]s with load-balanced dispatch.
///
/// Every operation runs on the caller's thread. `add_task` is meant to be
/// called from many threads at once; the lifecycle operations (`start`,
/// `stop_*`, `expand`, `resize`, `rebuild*`) are safe to call concurrently but
/// are not designed for it.
///
/// A task must not submit to its own pool while that pool is rebuilding: the
/// submission waits for the rebuild, and the rebuild waits for the task.
pub struct WorkerPool {
    name: String,
    background: bool,
    stack_size: Option<usize>,
    workers: RwLock<Vec<Worker>>,
    started: AtomicBool,
    rebuilding: Mutex<bool>,
    rebuilt: Condvar,
    last_used: AtomicUsize,
    task_crash: Observers<TaskCrashObserver>,
    thread_crash: Observers<ThreadCrashObserver>,
}

impl WorkerPool {
    /// Allocate `initial_size` unstarted workers named `"{name} #{index}"`.
    pub fn new<S: Into<String>>(initial_size: usize, name: S, background: bool) -> Self {
        Self::build(initial_size, name.into(), background, None)
    }

    pub fn with_config(config: PoolConfig) -> Result<Self> {
        config.validate()?;
        let size = config.worker_count();
        Ok(Self::build(
            size,
            config.name,
            config.background,
            config.stack_size,
        ))
    }

    fn build(size: usize, name: String, background: bool, stack_size: Option<usize>) -> Self {
        let mut pool = Self {
            name,
            background,
            stack_size,
            workers: RwLock::new(Vec::new()),
            started: AtomicBool::new(false),
            rebuilding: Mutex::new(false),
            rebuilt: Condvar::new(),
            last_used: AtomicUsize::new(0),
            task_crash: Observers::new(),
            thread_crash: Observers::new(),
        };
        let workers: Vec<Worker> = (0..size).map(|i| pool.create_worker(i)).collect();
        *pool.workers.get_mut() = workers;
        pool
    }

    fn create_worker(&self, index: usize) -> Worker {
        let mut worker = Worker::new(format!("{} #{}", self.name, index), self.background);
        if let Some(stack_size) = self.stack_size {
            worker = worker.with_stack_size(stack_size);
        }

        let handle = worker.handle();
        for observer in self.task_crash.snapshot() {
            handle.attach_task_crash(observer);
        }
        for observer in self.thread_crash.snapshot() {
            handle.attach_thread_crash(observer);
        }
        worker
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_background(&self) -> bool {
        self.background
    }

    pub fn len(&self) -> usize {
        self.workers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.read().is_empty()
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    pub fn is_rebuilding(&self) -> bool {
        *self.rebuilding.lock()
    }

    /// Handles to the current workers, in dispatch order.
    pub fn workers(&self) -> Vec<WorkerHandle> {
        self.workers.read().iter().map(Worker::handle).collect()
    }

    /// Tasks waiting in all queues, not counting ones already running.
    pub fn queued_tasks(&self) -> usize {
        self.workers.read().iter().map(Worker::queue_depth).sum()
    }

    fn ensure_started(&self) -> Result<()> {
        if !self.is_started() {
            return Err(Error::NotStarted);
        }
        Ok(())
    }

    pub fn start(&self) -> Result<()> {
        if self.is_started() {
            return Err(Error::AlreadyStarted);
        }
        for worker in self.workers.read().iter() {
            worker.start()?;
        }
        self.started.store(true, Ordering::Release);
        tracing::debug!(pool = %self.name, workers = self.len(), "pool started");
        Ok(())
    }

    /// Ask every worker to stop after draining its queue. Does not wait.
    pub fn stop_async(&self) -> Result<()> {
        self.ensure_started()?;
        for worker in self.workers.read().iter() {
            worker.request_stop();
        }
        Ok(())
    }

    /// Stop every worker and wait for each, in order, to drain and exit.
    /// All workers are joined even if one fails; the first failure is returned.
    pub fn stop_sync(&self) -> Result<()> {
        self.ensure_started()?;
        let mut first_err = None;
        for worker in self.workers.read().iter() {
            if let Err(e) = worker.stop_and_wait() {
                tracing::warn!(pool = %self.name, worker = %worker.name(), error = %e, "worker stopped with error");
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    /// Queue `f` on the least busy worker. Blocks while a rebuild is running.
    /// Returns `Ok(false)` only when the pool has no workers.
    pub fn add_task<F>(&self, f: F) -> Result<bool>
    where
        F: FnOnce() + Send + 'static,
    {
        self.submit(Task::new(f))
    }

    pub fn add_fallible_task<F, E>(&self, f: F) -> Result<bool>
    where
        F: FnOnce() -> std::result::Result<(), E> + Send + 'static,
        E: Into<BoxError>,
    {
        self.submit(Task::fallible(f))
    }

    pub fn submit(&self, task: Task) -> Result<bool> {
        self.ensure_started()?;
        self.wait_for_rebuild();

        let workers = self.workers.read();
        let loads: Vec<Load> = workers.iter().map(Load::of).collect();
        let Some(index) = pick_worker(&loads, self.last_used.load(Ordering::Relaxed)) else {
            return Ok(false);
        };

        workers[index].add(task);
        self.last_used.store(index, Ordering::Relaxed);
        Ok(true)
    }

    fn wait_for_rebuild(&self) {
        let mut rebuilding = self.rebuilding.lock();
        while *rebuilding {
            self.rebuilt.wait(&mut rebuilding);
        }
    }

    /// Append `by` new workers and start them. Never shrinks.
    pub fn expand(&self, by: usize) -> Result<()> {
        self.ensure_started()?;
        if by == 0 {
            return Err(Error::invalid_size(format!(
                "cannot expand pool {} by 0, use rebuild to shrink",
                self.name
            )));
        }

        let mut workers = self.workers.write();
        let old_len = workers.len();
        for index in old_len..old_len + by {
            let worker = self.create_worker(index);
            worker.start()?;
            workers.push(worker);
        }
        tracing::debug!(pool = %self.name, from = old_len, to = workers.len(), "pool expanded");
        Ok(())
    }

    /// Grow with [`expand`](Self::expand), shrink with
    /// [`rebuild_with`](Self::rebuild_with).
    pub fn resize(&self, new_size: usize) -> Result<()> {
        let current = self.len();
        if new_size == current {
            Ok(())
        } else if new_size > current {
            self.expand(new_size - current)
        } else {
            self.rebuild_with(new_size)
        }
    }

    /// Replace every worker with a fresh one, keeping the size.
    pub fn rebuild(&self) -> Result<()> {
        self.rebuild_with(self.len())
    }

    /// Drain and stop all workers, then replace them with `new_size` fresh,
    /// started ones. Submissions block until this returns.
    pub fn rebuild_with(&self, new_size: usize) -> Result<()> {
        self.ensure_started()?;

        *self.rebuilding.lock() = true;
        let result = self.replace_workers(new_size);
        *self.rebuilding.lock() = false;
        self.rebuilt.notify_all();

        result
    }

    fn replace_workers(&self, new_size: usize) -> Result<()> {
        let mut workers = self.workers.write();

        for worker in workers.iter() {
            // A crashed worker is being replaced anyway.
            if let Err(e) = worker.stop_and_wait() {
                tracing::warn!(pool = %self.name, worker = %worker.name(), error = %e, "worker stopped with error during rebuild");
            }
        }

        let mut fresh = Vec::with_capacity(new_size);
        for index in 0..new_size {
            let worker = self.create_worker(index);
            worker.start()?;
            fresh.push(worker);
        }

        let old = std::mem::replace(&mut *workers, fresh);
        drop(workers);
        drop(old);

        tracing::debug!(pool = %self.name, workers = new_size, "pool rebuilt");
        Ok(())
    }

    /// Observe task failures on every current and future worker of the pool.
    pub fn on_task_crash<F>(&self, observer: F) -> ObserverId
    where
        F: Fn(&TaskExecutionError) + Send + Sync + 'static,
    {
        let observer: Arc<TaskCrashObserver> = Arc::new(observer);
        let id = self.task_crash.subscribe(observer.clone());
        for worker in self.workers.read().iter() {
            worker.handle().attach_task_crash(observer.clone());
        }
        id
    }

    /// Observe loop crashes on every current and future worker of the pool.
    pub fn on_thread_crash<F>(&self, observer: F) -> ObserverId
    where
        F: Fn(&ThreadCrashError, &str, &mut CrashAction) + Send + Sync + 'static,
    {
        let observer: Arc<ThreadCrashObserver> = Arc::new(observer);
        let id = self.thread_crash.subscribe(observer.clone());
        for worker in self.workers.read().iter() {
            worker.handle().attach_thread_crash(observer.clone());
        }
        id
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("name", &self.name)
            .field("background", &self.background)
            .field("started", &self.is_started())
            .field("workers", &self.len())
            .finish()
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        // Let every worker start draining before the per-worker drops join
        // the foreground ones.
        for worker in self.workers.get_mut().iter() {
            worker.request_stop();
        }
    }
}
