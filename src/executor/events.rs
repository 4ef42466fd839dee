//! Observer lists for worker notifications.
//!
//! Every notification point owns an [`Observers`] list. Notifying walks a
//! snapshot of the list, so observers may subscribe or unsubscribe from inside
//! a callback, and a panicking observer is logged and skipped.

use super::panic_handler::{catch_panic, CrashAction, TaskExecutionError, ThreadCrashError};
use super::worker::WorkerHandle;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

pub type TaskCrashObserver = dyn Fn(&TaskExecutionError) + Send + Sync;
pub type ThreadCrashObserver = dyn Fn(&ThreadCrashError, &str, &mut CrashAction) + Send + Sync;
pub type ExitObserver = dyn Fn() + Send + Sync;
pub type WorkerCreatedObserver = dyn Fn(&WorkerHandle) + Send + Sync;

static NEXT_OBSERVER_ID: AtomicU64 = AtomicU64::new(1);

/// Token returned by every subscribe call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

impl ObserverId {
    fn next() -> Self {
        ObserverId(NEXT_OBSERVER_ID.fetch_add(1, Ordering::Relaxed))
    }
}

pub struct Observers<F: ?Sized> {
    list: RwLock<Vec<(ObserverId, Arc<F>)>>,
}

impl<F: ?Sized> Observers<F> {
    pub const fn new() -> Self {
        Self {
            list: RwLock::new(Vec::new()),
        }
    }

    pub fn subscribe(&self, observer: Arc<F>) -> ObserverId {
        let id = ObserverId::next();
        self.list.write().push((id, observer));
        id
    }

    pub fn unsubscribe(&self, id: ObserverId) -> bool {
        let mut list = self.list.write();
        let before = list.len();
        list.retain(|(existing, _)| *existing != id);
        list.len() != before
    }

    pub fn len(&self) -> usize {
        self.list.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.read().is_empty()
    }

    pub(crate) fn snapshot(&self) -> Vec<Arc<F>> {
        self.list.read().iter().map(|(_, f)| f.clone()).collect()
    }

    /// Invoke `call` once per observer. Returns how many observers panicked.
    pub(crate) fn notify<C>(&self, point: &'static str, mut call: C) -> usize
    where
        C: FnMut(&F),
    {
        let mut faults = 0;
        for observer in self.snapshot() {
            if let Err(panic) = catch_panic(|| call(observer.as_ref())) {
                faults += 1;
                tracing::warn!(point, error = %panic, "observer panicked, ignoring");
            }
        }
        faults
    }
}

impl<F: ?Sized> Default for Observers<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: ?Sized> std::fmt::Debug for Observers<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observers")
            .field("len", &self.len())
            .finish()
    }
}

// Process-wide; observers stay registered until removed explicitly.
static WORKER_CREATED: Observers<WorkerCreatedObserver> = Observers::new();

/// Register an observer fired once for every worker constructed in this
/// process, pool workers included. Register it before building workers.
pub fn on_worker_created<F>(observer: F) -> ObserverId
where
    F: Fn(&WorkerHandle) + Send + Sync + 'static,
{
    WORKER_CREATED.subscribe(Arc::new(observer))
}

pub fn remove_worker_created_observer(id: ObserverId) -> bool {
    WORKER_CREATED.unsubscribe(id)
}

pub(crate) fn notify_worker_created(handle: &WorkerHandle) {
    WORKER_CREATED.notify("worker_created", |observer| observer(handle));
}
