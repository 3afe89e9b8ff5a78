//! Memory-pressure policy.
//!
//! The soft-reference behavior of the original memory manager is modeled
//! as an explicit policy: the runtime accounts every resident
//! materialization against a configured byte budget, and three watermarks
//! drive the spill decisions:
//!
//! - free < 10% - a freshly wrapped image requests an immediate flush
//! - free < 25% - a global `flush_images` pass actually flushes
//! - free > 50% - queued flush workers abort, memory has recovered
//!
//! Waiters on pressure relief block on a condvar that `release` notifies,
//! replacing the fixed sleep of the original with an event-driven wait.

use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Watermark: free fraction below which wrapping requests a flush.
const WRAP_WATERMARK: f64 = 0.10;
/// Watermark: free fraction below which `flush_images` engages.
const FLUSH_WATERMARK: f64 = 0.25;
/// Watermark: free fraction above which pending flushes abort.
const RECOVER_WATERMARK: f64 = 0.50;

/// Byte-accounted memory budget with pressure watermarks.
pub struct MemoryPolicy {
    budget_bytes: usize,
    resident: AtomicUsize,
    relief_lock: Mutex<()>,
    relief: Condvar,
}

impl MemoryPolicy {
    /// Creates a policy with the given byte budget.
    pub fn new(budget_bytes: usize) -> Self {
        Self {
            budget_bytes: budget_bytes.max(1),
            resident: AtomicUsize::new(0),
            relief_lock: Mutex::new(()),
            relief: Condvar::new(),
        }
    }

    /// Accounts `bytes` of a new resident materialization.
    pub fn reserve(&self, bytes: usize) {
        self.resident.fetch_add(bytes, Ordering::SeqCst);
    }

    /// Releases `bytes` of a spilled or dropped materialization.
    pub fn release(&self, bytes: usize) {
        let mut current = self.resident.load(Ordering::SeqCst);
        loop {
            let next = current.saturating_sub(bytes);
            match self.resident.compare_exchange(
                current,
                next,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => break,
                Err(observed) => current = observed,
            }
        }
        let _guard = self.relief_lock.lock();
        self.relief.notify_all();
    }

    /// Bytes currently accounted as resident.
    pub fn resident_bytes(&self) -> usize {
        self.resident.load(Ordering::SeqCst)
    }

    /// Configured budget in bytes.
    pub fn budget_bytes(&self) -> usize {
        self.budget_bytes
    }

    /// Free fraction of the budget, clamped to `[0, 1]`.
    pub fn free_fraction(&self) -> f64 {
        let used = self.resident_bytes() as f64 / self.budget_bytes as f64;
        (1.0 - used).clamp(0.0, 1.0)
    }

    /// A freshly wrapped image should be flushed immediately.
    pub fn needs_immediate_flush(&self) -> bool {
        self.free_fraction() < WRAP_WATERMARK
    }

    /// A global flush pass should engage.
    pub fn under_pressure(&self) -> bool {
        self.free_fraction() < FLUSH_WATERMARK
    }

    /// Memory has recovered; queued flush work may abort.
    pub fn recovered(&self) -> bool {
        self.free_fraction() > RECOVER_WATERMARK
    }

    /// Blocks up to `timeout` for a release to relieve pressure.
    ///
    /// Returns early as soon as the flush watermark clears.
    pub fn wait_for_relief(&self, timeout: Duration) {
        let deadline = std::time::Instant::now() + timeout;
        let mut guard = self.relief_lock.lock();
        while self.under_pressure() {
            let now = std::time::Instant::now();
            if now >= deadline {
                return;
            }
            self.relief.wait_for(&mut guard, deadline - now);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_watermarks() {
        let policy = MemoryPolicy::new(1000);
        assert!(!policy.under_pressure());
        assert!(policy.recovered());

        policy.reserve(800);
        // 20% free: under pressure, not yet critical.
        assert!(policy.under_pressure());
        assert!(!policy.needs_immediate_flush());
        assert!(!policy.recovered());

        policy.reserve(150);
        // 5% free: wrap watermark crossed.
        assert!(policy.needs_immediate_flush());

        policy.release(800);
        assert!(policy.recovered());
    }

    #[test]
    fn test_release_never_underflows() {
        let policy = MemoryPolicy::new(100);
        policy.reserve(10);
        policy.release(50);
        assert_eq!(policy.resident_bytes(), 0);
    }

    #[test]
    fn test_wait_for_relief_wakes_on_release() {
        use std::sync::Arc;
        let policy = Arc::new(MemoryPolicy::new(100));
        policy.reserve(90);
        let waiter = {
            let policy = Arc::clone(&policy);
            std::thread::spawn(move || {
                let start = std::time::Instant::now();
                policy.wait_for_relief(Duration::from_secs(5));
                start.elapsed()
            })
        };
        std::thread::sleep(Duration::from_millis(50));
        policy.release(90);
        let waited = waiter.join().expect("waiter thread");
        assert!(waited < Duration::from_secs(2), "waited {waited:?}");
    }

    #[test]
    fn test_wait_for_relief_times_out() {
        let policy = MemoryPolicy::new(100);
        policy.reserve(95);
        let start = std::time::Instant::now();
        policy.wait_for_relief(Duration::from_millis(50));
        assert!(start.elapsed() >= Duration::from_millis(40));
    }
}
