// worker thread stuff
use super::events::{
    notify_worker_created, ExitObserver, ObserverId, Observers, TaskCrashObserver,
    ThreadCrashObserver,
};
use super::panic_handler::{
    catch_panic, CrashAction, PanicInfo, TaskExecutionError, TaskFailure, ThreadCrashError,
};
use super::task::{Task, TaskId};
use crate::error::{Error, Result};
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::panic::{catch_unwind, resume_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread::{self, JoinHandle, ThreadId};

pub type WorkerId = usize;

static NEXT_WORKER_ID: AtomicUsize = AtomicUsize::new(0);

// stats for each worker
struct WorkerState {
    tasks_executed: AtomicU64,
    tasks_failed: AtomicU64,
}

impl WorkerState {
    fn new() -> Self {
        Self {
            tasks_executed: AtomicU64::new(0),
            tasks_failed: AtomicU64::new(0),
        }
    }
}

/// Point-in-time copy of a worker's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub tasks_executed: u64,
    pub tasks_failed: u64,
}

struct Shared {
    id: WorkerId,
    name: String,
    thread_name: Option<String>,
    thread_id: OnceLock<ThreadId>,
    background: bool,
    queue: Mutex<VecDeque<Task>>,
    wakeup: Condvar,
    running: AtomicBool,
    working: AtomicBool,
    // Mirror of queue.len() so dispatch can read it without locking.
    queued: AtomicUsize,
    state: WorkerState,
    task_crash: Observers<TaskCrashObserver>,
    thread_crash: Observers<ThreadCrashObserver>,
    exit: Observers<ExitObserver>,
    #[cfg(test)]
    inject_fault: AtomicBool,
}

impl Shared {
    fn push(&self, task: Task) -> TaskId {
        let id = task.id;
        {
            let mut queue = self.queue.lock();
            queue.push_back(task);
            self.queued.store(queue.len(), Ordering::Release);
        }
        self.wakeup.notify_one();
        id
    }

    fn request_stop(&self) {
        {
            // Flip the flag under the lock so the loop cannot miss it
            // between its emptiness check and the wait.
            let _queue = self.queue.lock();
            self.running.store(false, Ordering::Release);
        }
        self.wakeup.notify_all();
        tracing::debug!(worker = %self.name, "stop requested");
    }

    // thread entry point
    fn run(&self) {
        let _ = self.thread_id.set(thread::current().id());

        match catch_unwind(AssertUnwindSafe(|| self.run_loop())) {
            Ok(()) => {
                self.working.store(false, Ordering::Release);
                tracing::debug!(worker = %self.name, "worker exited");
                self.exit.notify("successful_exit", |observer| observer());
            }
            Err(payload) => {
                self.running.store(false, Ordering::Release);
                self.working.store(false, Ordering::Release);

                let crash = ThreadCrashError {
                    worker: self.name.clone(),
                    panic: PanicInfo::from_payload(payload.as_ref()),
                };
                tracing::error!(worker = %self.name, error = %crash.panic, "worker loop crashed");

                let mut action = CrashAction::Propagate;
                self.thread_crash.notify("thread_crash", |observer| {
                    observer(&crash, &self.name, &mut action)
                });

                if action == CrashAction::Propagate {
                    resume_unwind(payload);
                }
                tracing::debug!(worker = %self.name, "worker crash suppressed by observer");
            }
        }
    }

    // main loop: runs until a stop was requested and the queue is drained
    fn run_loop(&self) {
        loop {
            self.working.store(true, Ordering::Release);

            #[cfg(test)]
            if self.inject_fault.swap(false, Ordering::AcqRel) {
                panic!("injected loop fault");
            }

            let task = {
                let mut queue = self.queue.lock();
                match queue.pop_front() {
                    Some(task) => {
                        self.queued.store(queue.len(), Ordering::Release);
                        Some(task)
                    }
                    None => {
                        if !self.running.load(Ordering::Acquire) {
                            break;
                        }
                        self.working.store(false, Ordering::Release);
                        self.wakeup.wait(&mut queue);
                        None
                    }
                }
            };

            if let Some(task) = task {
                self.execute_task(task);
            }
        }
    }

    fn execute_task(&self, task: Task) {
        let id = task.id;

        let failure = match catch_panic(|| task.execute()) {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(TaskFailure::Failed(e)),
            Err(panic) => Some(TaskFailure::Panicked(panic)),
        };

        self.state.tasks_executed.fetch_add(1, Ordering::Relaxed);

        if let Some(failure) = failure {
            self.state.tasks_failed.fetch_add(1, Ordering::Relaxed);
            let err = TaskExecutionError {
                task: id,
                worker: self.name.clone(),
                failure,
            };
            tracing::warn!(worker = %self.name, task = %id, error = %err.failure, "task failed");
            self.task_crash.notify("task_crash", |observer| observer(&err));
        }
    }
}

/// Cloneable view of a worker: submit tasks, request a stop, read state and
/// register observers. Safe to move into the worker's own tasks.
#[derive(Clone)]
pub struct WorkerHandle {
    shared: Arc<Shared>,
}

impl WorkerHandle {
    pub fn id(&self) -> WorkerId {
        self.shared.id
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Name given to the OS thread, `None` when it could not be applied.
    pub fn thread_name(&self) -> Option<&str> {
        self.shared.thread_name.as_deref()
    }

    pub fn is_background(&self) -> bool {
        self.shared.background
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    /// False only while the thread sleeps on an empty queue (or before it
    /// started / after it exited).
    pub fn is_working(&self) -> bool {
        self.shared.working.load(Ordering::Acquire)
    }

    pub fn queue_depth(&self) -> usize {
        self.shared.queued.load(Ordering::Acquire)
    }

    pub fn stats(&self) -> WorkerStats {
        WorkerStats {
            tasks_executed: self.shared.state.tasks_executed.load(Ordering::Relaxed),
            tasks_failed: self.shared.state.tasks_failed.load(Ordering::Relaxed),
        }
    }

    pub fn add_task<F>(&self, f: F) -> TaskId
    where
        F: FnOnce() + Send + 'static,
    {
        self.shared.push(Task::new(f))
    }

    pub fn add_fallible_task<F, E>(&self, f: F) -> TaskId
    where
        F: FnOnce() -> std::result::Result<(), E> + Send + 'static,
        E: Into<super::task::BoxError>,
    {
        self.shared.push(Task::fallible(f))
    }

    pub fn add(&self, task: Task) -> TaskId {
        self.shared.push(task)
    }

    /// Ask the worker to exit once its queue is drained. Does not wait.
    pub fn request_stop(&self) {
        self.shared.request_stop();
    }

    pub fn on_task_crash<F>(&self, observer: F) -> ObserverId
    where
        F: Fn(&TaskExecutionError) + Send + Sync + 'static,
    {
        self.shared.task_crash.subscribe(Arc::new(observer))
    }

    pub fn on_thread_crash<F>(&self, observer: F) -> ObserverId
    where
        F: Fn(&ThreadCrashError, &str, &mut CrashAction) + Send + Sync + 'static,
    {
        self.shared.thread_crash.subscribe(Arc::new(observer))
    }

    pub fn on_successful_exit<F>(&self, observer: F) -> ObserverId
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.shared.exit.subscribe(Arc::new(observer))
    }

    /// Remove an observer from whichever of this worker's lists holds it.
    pub fn unsubscribe(&self, id: ObserverId) -> bool {
        self.shared.task_crash.unsubscribe(id)
            || self.shared.thread_crash.unsubscribe(id)
            || self.shared.exit.unsubscribe(id)
    }

    pub(crate) fn attach_task_crash(&self, observer: Arc<TaskCrashObserver>) {
        self.shared.task_crash.subscribe(observer);
    }

    pub(crate) fn attach_thread_crash(&self, observer: Arc<ThreadCrashObserver>) {
        self.shared.thread_crash.subscribe(observer);
    }

    /// True when both handles refer to the same worker.
    pub fn same_worker(&self, other: &WorkerHandle) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }
}

impl std::fmt::Debug for WorkerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerHandle")
            .field("id", &self.shared.id)
            .field("name", &self.shared.name)
            .field("running", &self.is_running())
            .field("working", &self.is_working())
            .field("queued", &self.queue_depth())
            .finish()
    }
}

/// A dedicated thread draining its own FIFO task queue.
///
/// A worker is single-use: once its thread has exited it cannot be started
/// again, build a new one instead. Dropping a worker requests a stop; a
/// foreground worker additionally waits for its thread to finish.
pub struct Worker {
    handle: WorkerHandle,
    stack_size: Option<usize>,
    started: AtomicBool,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl Worker {
    pub fn new<S: Into<String>>(name: S, background: bool) -> Self {
        let name = name.into();

        // Best effort: std refuses thread names with interior NULs.
        let thread_name = if name.contains('\0') {
            tracing::warn!(worker = ?name, "thread name rejected, leaving thread unnamed");
            None
        } else {
            Some(name.clone())
        };

        let shared = Arc::new(Shared {
            id: NEXT_WORKER_ID.fetch_add(1, Ordering::Relaxed),
            name,
            thread_name,
            thread_id: OnceLock::new(),
            background,
            queue: Mutex::new(VecDeque::new()),
            wakeup: Condvar::new(),
            running: AtomicBool::new(false),
            working: AtomicBool::new(false),
            queued: AtomicUsize::new(0),
            state: WorkerState::new(),
            task_crash: Observers::new(),
            thread_crash: Observers::new(),
            exit: Observers::new(),
            #[cfg(test)]
            inject_fault: AtomicBool::new(false),
        });

        let worker = Self {
            handle: WorkerHandle { shared },
            stack_size: None,
            started: AtomicBool::new(false),
            thread: Mutex::new(None),
        };

        notify_worker_created(&worker.handle);
        worker
    }

    pub fn with_stack_size(mut self, size: usize) -> Self {
        self.stack_size = Some(size);
        self
    }

    pub fn handle(&self) -> WorkerHandle {
        self.handle.clone()
    }

    pub fn id(&self) -> WorkerId {
        self.handle.id()
    }

    pub fn name(&self) -> &str {
        self.handle.name()
    }

    pub fn thread_name(&self) -> Option<&str> {
        self.handle.thread_name()
    }

    pub fn is_background(&self) -> bool {
        self.handle.is_background()
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_running()
    }

    pub fn is_working(&self) -> bool {
        self.handle.is_working()
    }

    pub fn queue_depth(&self) -> usize {
        self.handle.queue_depth()
    }

    pub fn stats(&self) -> WorkerStats {
        self.handle.stats()
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    /// Spawn the worker thread. Fails if it was spawned before.
    pub fn start(&self) -> Result<()> {
        if self.started.swap(true, Ordering::AcqRel) {
            return Err(Error::WorkerAlreadyStarted(self.name().to_string()));
        }

        let shared = self.handle.shared.clone();
        shared.running.store(true, Ordering::Release);

        let mut builder = thread::Builder::new();
        if let Some(name) = &shared.thread_name {
            builder = builder.name(name.clone());
        }
        if let Some(stack_size) = self.stack_size {
            builder = builder.stack_size(stack_size);
        }

        let thread = builder.spawn(move || shared.run()).map_err(|e| {
            self.handle.shared.running.store(false, Ordering::Release);
            Error::Io(e)
        })?;

        *self.thread.lock() = Some(thread);

        tracing::debug!(worker = %self.name(), "worker started");
        Ok(())
    }

    pub fn add_task<F>(&self, f: F) -> TaskId
    where
        F: FnOnce() + Send + 'static,
    {
        self.handle.add_task(f)
    }

    pub fn add_fallible_task<F, E>(&self, f: F) -> TaskId
    where
        F: FnOnce() -> std::result::Result<(), E> + Send + 'static,
        E: Into<super::task::BoxError>,
    {
        self.handle.add_fallible_task(f)
    }

    pub fn add(&self, task: Task) -> TaskId {
        self.handle.add(task)
    }

    pub fn request_stop(&self) {
        self.handle.request_stop();
    }

    /// Request a stop and block until the thread has drained its queue and
    /// exited. A no-op join for a worker that was never started.
    pub fn stop_and_wait(&self) -> Result<()> {
        self.request_stop();
        self.join()
    }

    /// Block until the worker thread has exited.
    pub fn join(&self) -> Result<()> {
        if self.handle.shared.thread_id.get() == Some(&thread::current().id()) {
            return Err(Error::JoinSelf(self.name().to_string()));
        }

        // Held across the join so concurrent callers also wait for the exit.
        let mut thread = self.thread.lock();
        match thread.take() {
            None => Ok(()),
            Some(handle) => handle.join().map_err(|payload| {
                Error::WorkerPanic(PanicInfo::from_payload(payload.as_ref()).message)
            }),
        }
    }

    pub fn on_task_crash<F>(&self, observer: F) -> ObserverId
    where
        F: Fn(&TaskExecutionError) + Send + Sync + 'static,
    {
        self.handle.on_task_crash(observer)
    }

    pub fn on_thread_crash<F>(&self, observer: F) -> ObserverId
    where
        F: Fn(&ThreadCrashError, &str, &mut CrashAction) + Send + Sync + 'static,
    {
        self.handle.on_thread_crash(observer)
    }

    pub fn on_successful_exit<F>(&self, observer: F) -> ObserverId
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.handle.on_successful_exit(observer)
    }

    pub fn unsubscribe(&self, id: ObserverId) -> bool {
        self.handle.unsubscribe(id)
    }

    #[cfg(test)]
    fn inject_loop_fault(&self) {
        let shared = &self.handle.shared;
        {
            let _queue = shared.queue.lock();
            shared.inject_fault.store(true, Ordering::Release);
        }
        shared.wakeup.notify_all();
    }
}

impl std::fmt::Debug for Worker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worker")
            .field("handle", &self.handle)
            .field("started", &self.is_started())
            .finish()
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.request_stop();
        if self.handle.is_background() {
            return;
        }
        if let Err(e) = self.join() {
            tracing::debug!(worker = %self.name(), error = %e, "worker did not exit cleanly");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::events::{on_worker_created, remove_worker_created_observer};
    use std::sync::mpsc;
    use std::time::Duration;

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn worker() -> Worker {
        Worker::new("Test thread", false)
    }

    // exit signal, like a test would wait on the successful-exit event
    fn exit_signal(worker: &Worker) -> mpsc::Receiver<()> {
        let (tx, rx) = mpsc::channel();
        let tx = Mutex::new(tx);
        worker.on_successful_exit(move || {
            let _ = tx.lock().send(());
        });
        rx
    }

    #[test]
    fn test_naming() {
        let w = worker();
        let handle = w.handle();
        let (tx, rx) = mpsc::channel();

        w.add_task(move || {
            let _ = tx.send(thread::current().name().map(str::to_string));
            handle.request_stop();
        });
        let exited = exit_signal(&w);
        w.start().unwrap();

        exited.recv_timeout(TIMEOUT).unwrap();
        assert_eq!(rx.recv().unwrap().as_deref(), Some("Test thread"));
        assert_eq!(w.thread_name(), Some("Test thread"));
        assert!(!w.is_running());
    }

    #[test]
    fn test_unusable_thread_name_is_not_fatal() {
        let w = Worker::new("bad\0name", false);
        assert_eq!(w.name(), "bad\0name");
        assert_eq!(w.thread_name(), None);

        let (tx, rx) = mpsc::channel();
        w.add_task(move || {
            let _ = tx.send(());
        });
        w.start().unwrap();
        rx.recv_timeout(TIMEOUT).unwrap();
        w.stop_and_wait().unwrap();
    }

    #[test]
    fn test_ordering() {
        let w = worker();
        let handle = w.handle();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for label in ["A", "B", "C"] {
            let seen = seen.clone();
            w.add_task(move || seen.lock().push(label));
        }
        w.add_task(move || handle.request_stop());
        let exited = exit_signal(&w);
        w.start().unwrap();

        exited.recv_timeout(TIMEOUT).unwrap();
        assert_eq!(*seen.lock(), vec!["A", "B", "C"]);
    }

    #[test]
    fn test_task_panic_is_reported() {
        let w = worker();
        let handle = w.handle();
        let messages = Arc::new(Mutex::new(Vec::new()));

        w.add_task(|| panic!("Test"));
        w.add_task(move || handle.request_stop());
        let sink = messages.clone();
        w.on_task_crash(move |e| sink.lock().push((e.message(), e.is_panic())));
        let exited = exit_signal(&w);
        w.start().unwrap();

        exited.recv_timeout(TIMEOUT).unwrap();
        assert_eq!(*messages.lock(), vec![("Test".to_string(), true)]);
        assert_eq!(
            w.stats(),
            WorkerStats {
                tasks_executed: 2,
                tasks_failed: 1
            }
        );
    }

    #[test]
    fn test_fallible_task_error_is_reported() {
        let w = worker();
        let failures = Arc::new(Mutex::new(Vec::new()));
        let sink = failures.clone();
        w.on_task_crash(move |e| sink.lock().push(e.message()));

        w.add_fallible_task(|| Err::<(), _>("disk full"));
        w.add_fallible_task(|| Ok::<(), std::io::Error>(()));
        w.start().unwrap();
        w.stop_and_wait().unwrap();

        assert_eq!(*failures.lock(), vec!["disk full".to_string()]);
        assert_eq!(w.stats().tasks_failed, 1);
    }

    #[test]
    fn test_failure_does_not_block_later_tasks() {
        let w = worker();
        let ran = Arc::new(AtomicUsize::new(0));

        for i in 0..10 {
            let ran = ran.clone();
            w.add_task(move || {
                if i % 3 == 0 {
                    panic!("task {} failed", i);
                }
                ran.fetch_add(1, Ordering::SeqCst);
            });
        }
        w.start().unwrap();
        w.stop_and_wait().unwrap();

        assert_eq!(ran.load(Ordering::SeqCst), 6);
        assert_eq!(w.stats().tasks_failed, 4);
    }

    #[test]
    fn test_crashing_task_crash_observer() {
        let w = worker();
        let handle = w.handle();
        let messages = Arc::new(Mutex::new(Vec::new()));

        w.add_task(|| panic!("Test"));
        w.add_task(move || handle.request_stop());
        let sink = messages.clone();
        w.on_task_crash(move |e| {
            sink.lock().push(e.message());
            panic!("Task Crash Test");
        });
        let exited = exit_signal(&w);
        w.start().unwrap();

        exited.recv_timeout(TIMEOUT).unwrap();
        assert_eq!(*messages.lock(), vec!["Test".to_string()]);
        w.stop_and_wait().unwrap();
    }

    #[test]
    fn test_crashing_exit_observer() {
        let w = worker();
        let handle = w.handle();
        let hits = Arc::new(AtomicUsize::new(0));

        w.add_task(move || handle.request_stop());
        let exited = exit_signal(&w);
        let counter = hits.clone();
        w.on_successful_exit(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            panic!("Test");
        });
        w.start().unwrap();

        exited.recv_timeout(TIMEOUT).unwrap();
        assert!(w.stop_and_wait().is_ok());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_stop_and_wait_drains_queue() {
        let w = worker();
        let ran = Arc::new(AtomicUsize::new(0));
        w.start().unwrap();

        for _ in 0..50 {
            let ran = ran.clone();
            w.add_task(move || {
                thread::sleep(Duration::from_millis(1));
                ran.fetch_add(1, Ordering::SeqCst);
            });
        }
        w.stop_and_wait().unwrap();

        assert_eq!(ran.load(Ordering::SeqCst), 50);
        assert_eq!(w.queue_depth(), 0);
        assert!(!w.is_running());
        assert!(!w.is_working());
    }

    #[test]
    fn test_tasks_queued_before_start_run() {
        let w = worker();
        let ran = Arc::new(AtomicUsize::new(0));
        for _ in 0..3 {
            let ran = ran.clone();
            w.add_task(move || {
                ran.fetch_add(1, Ordering::SeqCst);
            });
        }
        assert_eq!(w.queue_depth(), 3);
        assert!(!w.is_running());

        w.start().unwrap();
        w.stop_and_wait().unwrap();
        assert_eq!(ran.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_start_twice_fails() {
        let w = worker();
        w.start().unwrap();
        assert!(matches!(w.start(), Err(Error::WorkerAlreadyStarted(_))));
        w.stop_and_wait().unwrap();
        assert!(matches!(w.start(), Err(Error::WorkerAlreadyStarted(_))));
    }

    #[test]
    fn test_stop_and_wait_without_start() {
        let w = worker();
        assert!(w.stop_and_wait().is_ok());
        assert!(!w.is_started());
    }

    #[test]
    fn test_idle_worker_is_not_working() {
        let w = worker();
        w.start().unwrap();
        assert!(w.is_running());

        let deadline = std::time::Instant::now() + TIMEOUT;
        while w.is_working() {
            assert!(std::time::Instant::now() < deadline, "worker never went idle");
            thread::sleep(Duration::from_millis(1));
        }
        w.stop_and_wait().unwrap();
    }

    #[test]
    fn test_join_from_own_thread_is_rejected() {
        let w = Arc::new(worker());
        let inner = w.clone();
        let (tx, rx) = mpsc::channel();

        w.add_task(move || {
            let _ = tx.send(inner.stop_and_wait());
        });
        w.start().unwrap();

        let result = rx.recv_timeout(TIMEOUT).unwrap();
        assert!(matches!(result, Err(Error::JoinSelf(_))));
        w.stop_and_wait().unwrap();
    }

    #[test]
    fn test_loop_fault_propagates_by_default() {
        let w = worker();
        let reports = Arc::new(Mutex::new(Vec::new()));
        let sink = reports.clone();
        w.on_thread_crash(move |e, name, _action| {
            sink.lock().push((e.panic.message.clone(), name.to_string()));
        });

        w.start().unwrap();
        w.inject_loop_fault();

        let result = w.join();
        assert!(matches!(result, Err(Error::WorkerPanic(ref msg)) if msg == "injected loop fault"));
        assert_eq!(
            *reports.lock(),
            vec![("injected loop fault".to_string(), "Test thread".to_string())]
        );
        assert!(!w.is_running());
    }

    #[test]
    fn test_loop_fault_can_be_suppressed() {
        let w = worker();
        let exited = exit_signal(&w);
        w.on_thread_crash(|_, _, _| panic!("broken crash observer"));
        w.on_thread_crash(|_, _, action| *action = CrashAction::Suppress);

        w.start().unwrap();
        w.inject_loop_fault();

        assert!(w.join().is_ok());
        // a crash is not a successful exit
        assert!(exited.try_recv().is_err());
    }

    #[test]
    fn test_unsubscribe_observer() {
        let w = worker();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let id = w.on_task_crash(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert!(w.unsubscribe(id));

        w.add_task(|| panic!("unobserved"));
        w.start().unwrap();
        w.stop_and_wait().unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_worker_created_observer() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let id = on_worker_created(move |h| {
            if h.name().starts_with("created-observer-") {
                sink.lock().push(h.name().to_string());
            }
        });
        let broken = on_worker_created(|_| panic!("broken"));

        let w = Worker::new("created-observer-1", true);
        assert_eq!(*seen.lock(), vec!["created-observer-1".to_string()]);

        assert!(remove_worker_created_observer(id));
        assert!(remove_worker_created_observer(broken));
        drop(w);
    }
}
