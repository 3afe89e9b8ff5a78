//! Permit-bounded structured parallelism.
//!
//! A [`ForkJoinExecutor`] caps concurrent work at `max_parallel` permits
//! (default: CPU count). Child contexts created by
//! [`isolate`](ForkJoinExecutor::isolate) and
//! [`fork_join`](ForkJoinExecutor::fork_join) share the parent's permit
//! pool but track their own outstanding work, so `fork_join` waits exactly
//! for the work forked inside it.
//!
//! The one subtle rule: a task that blocks on [`FjHandle::get`] for a fork
//! of its own releases its permit before blocking and re-acquires it
//! afterwards. Without this, `max_parallel` tasks all waiting on their own
//! forks would starve the pool and deadlock.

use crossbeam_channel::{bounded, Receiver};
use parking_lot::{Condvar, Mutex};
use std::cell::RefCell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::thread;
use tracing::debug;

use crate::error::{RuntimeError, RuntimeResult};

thread_local! {
    /// Permit pool of the fork/join task running on this thread, if any.
    static CURRENT_POOL: RefCell<Option<Arc<PermitPool>>> = const { RefCell::new(None) };
}

/// Counting semaphore over a mutex/condvar pair.
struct PermitPool {
    available: Mutex<usize>,
    released: Condvar,
}

impl PermitPool {
    fn new(permits: usize) -> Self {
        Self {
            available: Mutex::new(permits.max(1)),
            released: Condvar::new(),
        }
    }

    fn acquire(&self) {
        let mut available = self.available.lock();
        while *available == 0 {
            self.released.wait(&mut available);
        }
        *available -= 1;
    }

    fn release(&self) {
        let mut available = self.available.lock();
        *available += 1;
        self.released.notify_one();
    }
}

struct FjContext {
    pool: Arc<PermitPool>,
    outstanding: Mutex<usize>,
    drained: Condvar,
    shutdown: AtomicBool,
    children: Mutex<Vec<Weak<FjContext>>>,
}

impl FjContext {
    fn task_started(&self) {
        *self.outstanding.lock() += 1;
    }

    fn task_finished(&self) {
        let mut outstanding = self.outstanding.lock();
        *outstanding -= 1;
        if *outstanding == 0 {
            self.drained.notify_all();
        }
    }

    fn shutdown_now(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
        for child in self.children.lock().iter() {
            if let Some(child) = child.upgrade() {
                child.shutdown_now();
            }
        }
    }
}

/// Handle on a forked task.
pub struct FjHandle<T> {
    receiver: Receiver<T>,
    pool: Arc<PermitPool>,
}

impl<T> FjHandle<T> {
    /// Blocks until the fork completes.
    ///
    /// When called from inside a fork/join task, the caller's permit is
    /// released around the wait so a task awaiting its own fork cannot
    /// deadlock the pool. A fork that was shut down before running yields
    /// the cancellation sentinel.
    pub fn get(self) -> RuntimeResult<T> {
        let inherited = CURRENT_POOL.with(|c| c.borrow().clone());
        let same_pool =
            inherited.as_ref().is_some_and(|p| Arc::ptr_eq(p, &self.pool));
        if same_pool {
            self.pool.release();
        }
        let result = self.receiver.recv().map_err(|_| RuntimeError::Cancelled);
        if same_pool {
            self.pool.acquire();
        }
        result
    }
}

/// Bounded structured-parallelism executor.
#[derive(Clone)]
pub struct ForkJoinExecutor {
    context: Arc<FjContext>,
}

impl ForkJoinExecutor {
    /// Creates an executor with `max_parallel` permits.
    pub fn new(max_parallel: usize) -> Self {
        Self {
            context: Arc::new(FjContext {
                pool: Arc::new(PermitPool::new(max_parallel)),
                outstanding: Mutex::new(0),
                drained: Condvar::new(),
                shutdown: AtomicBool::new(false),
                children: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Creates an executor with one permit per CPU.
    pub fn with_cpu_permits() -> Self {
        Self::new(
            thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
        )
    }

    /// Forks a task and returns a handle on its result.
    pub fn submit<T, F>(&self, f: F) -> FjHandle<T>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        let (tx, rx) = bounded(1);
        let context = Arc::clone(&self.context);
        context.task_started();
        thread::spawn(move || {
            context.pool.acquire();
            if context.shutdown.load(Ordering::SeqCst) {
                debug!("fork skipped after shutdown");
            } else {
                CURRENT_POOL.with(|c| *c.borrow_mut() = Some(Arc::clone(&context.pool)));
                let result = f();
                CURRENT_POOL.with(|c| *c.borrow_mut() = None);
                let _ = tx.send(result);
            }
            context.pool.release();
            context.task_finished();
        });
        FjHandle {
            receiver: rx,
            pool: Arc::clone(&self.context.pool),
        }
    }

    /// Forks a task, discarding the result.
    pub fn execute<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        drop(self.submit(f));
    }

    /// Forks `f` and applies `g` to its result, still off the caller.
    pub fn submit_and_then<T, U, F, G>(&self, f: F, g: G) -> FjHandle<U>
    where
        T: Send + 'static,
        U: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
        G: FnOnce(T) -> U + Send + 'static,
    {
        self.submit(move || g(f()))
    }

    /// Runs `body` against a child context sharing this pool's permits.
    ///
    /// The child's outstanding work is not waited for; use
    /// [`fork_join`](Self::fork_join) for that.
    pub fn isolate<R>(&self, body: impl FnOnce(&ForkJoinExecutor) -> R) -> R {
        let child = self.child();
        body(&child)
    }

    /// Runs `body` against a child context and waits for every task the
    /// body forked on it.
    pub fn fork_join<R>(&self, body: impl FnOnce(&ForkJoinExecutor) -> R) -> R {
        let child = self.child();
        let result = body(&child);
        child.wait_for();
        result
    }

    /// Blocks until every task forked on this context has finished.
    pub fn wait_for(&self) {
        let mut outstanding = self.context.outstanding.lock();
        while *outstanding > 0 {
            self.context.drained.wait(&mut outstanding);
        }
    }

    /// Stops accepting work: queued forks are skipped, and the shutdown
    /// propagates to every child context.
    pub fn shutdown_now(&self) {
        self.context.shutdown_now();
    }

    fn child(&self) -> ForkJoinExecutor {
        let child = ForkJoinExecutor {
            context: Arc::new(FjContext {
                pool: Arc::clone(&self.context.pool),
                outstanding: Mutex::new(0),
                drained: Condvar::new(),
                shutdown: AtomicBool::new(self.context.shutdown.load(Ordering::SeqCst)),
                children: Mutex::new(Vec::new()),
            }),
        };
        self.context
            .children
            .lock()
            .push(Arc::downgrade(&child.context));
        child
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    #[test]
    fn test_submit_and_get() {
        let fj = ForkJoinExecutor::new(2);
        let handle = fj.submit(|| 21 * 2);
        assert_eq!(handle.get().unwrap(), 42);
    }

    #[test]
    fn test_submit_and_then() {
        let fj = ForkJoinExecutor::new(2);
        let handle = fj.submit_and_then(|| 10, |v| v + 1);
        assert_eq!(handle.get().unwrap(), 11);
    }

    #[test]
    fn test_wait_for_drains() {
        let fj = ForkJoinExecutor::new(4);
        let counter = Arc::new(AtomicUsize::new(0));
        for _ in 0..8 {
            let counter = Arc::clone(&counter);
            fj.execute(move || {
                thread::sleep(Duration::from_millis(10));
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }
        fj.wait_for();
        assert_eq!(counter.load(Ordering::SeqCst), 8);
    }

    #[test]
    fn test_fork_join_waits_only_for_child_work() {
        let fj = ForkJoinExecutor::new(4);
        let child_done = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&child_done);
        let result = fj.fork_join(move |child| {
            let flag = Arc::clone(&flag);
            child.execute(move || {
                thread::sleep(Duration::from_millis(20));
                flag.store(true, Ordering::SeqCst);
            });
            "body result"
        });
        assert_eq!(result, "body result");
        assert!(child_done.load(Ordering::SeqCst));
    }

    #[test]
    fn test_self_fork_does_not_deadlock() {
        // One permit: the outer task must release it while waiting on its
        // own fork, or this test hangs.
        let fj = ForkJoinExecutor::new(1);
        let inner_fj = fj.clone();
        let outer = fj.submit(move || {
            let inner = inner_fj.submit(|| 7);
            inner.get().unwrap()
        });
        assert_eq!(outer.get().unwrap(), 7);
    }

    #[test]
    fn test_parallelism_is_bounded() {
        let fj = ForkJoinExecutor::new(2);
        let inside = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));
        let mut handles = Vec::new();
        for _ in 0..8 {
            let inside = Arc::clone(&inside);
            let max_seen = Arc::clone(&max_seen);
            handles.push(fj.submit(move || {
                let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                max_seen.fetch_max(now, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(10));
                inside.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for h in handles {
            h.get().unwrap();
        }
        assert!(max_seen.load(Ordering::SeqCst) <= 2);
    }

    #[test]
    fn test_shutdown_skips_queued_forks() {
        let fj = ForkJoinExecutor::new(1);
        // Occupy the single permit.
        let blocker = fj.submit(|| thread::sleep(Duration::from_millis(100)));
        thread::sleep(Duration::from_millis(20));
        let queued = fj.submit(|| "ran");
        fj.shutdown_now();
        assert!(queued.get().unwrap_err().is_cancelled());
        let _ = blocker.get();
        fj.wait_for();
    }

    #[test]
    fn test_shutdown_propagates_to_children() {
        let fj = ForkJoinExecutor::new(2);
        let observed = fj.isolate(|child| {
            let child = child.clone();
            fj.shutdown_now();
            let fork = child.submit(|| 1);
            fork.get()
        });
        assert!(observed.unwrap_err().is_cancelled());
    }
}
