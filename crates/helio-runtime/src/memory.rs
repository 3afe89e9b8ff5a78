//! File-backed images with spill-to-disk under memory pressure.
//!
//! [`ImageRuntime`] keeps the working set in RAM and spills least-recently
//! used materializations to per-process scratch files. A [`FileBacked`]
//! handle owns a share of one backing path: the path's reference count
//! drops to zero when the last handle drops, and the file is deleted.
//!
//! The original's soft references become an explicit cache slot per handle
//! (a strong `Arc` while resident, a weak one after spilling) driven by the
//! [`MemoryPolicy`] watermarks and LRU timestamps; spill decisions are
//! explicit, never garbage-collector-driven. The `saved` flag of a path is
//! monotonic: once true, the file bytes are canonical and a later
//! materialization reloads from disk.
//!
//! Two watchdogs run as runtime threads: the auto-flush pass spills
//! handles idle beyond the configured window, and the reclaim pass prunes
//! registries of dead handles (verifying that nothing unsaved ever lost
//! its materialization).

use crossbeam_channel::{bounded, unbounded, RecvTimeoutError, Sender};
use parking_lot::{Condvar, Mutex};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use helio_core::{Image, MetadataBag};

use crate::error::{RuntimeError, RuntimeResult};
use crate::executors::Executors;
use crate::forkjoin::ForkJoinExecutor;
use crate::pressure::MemoryPolicy;
use crate::tempdir::TempWorkspace;

/// Period of the reclaim (registry-pruning) watchdog.
const RECLAIM_PERIOD: Duration = Duration::from_secs(1);

/// Poll granularity of waits on the `saved` condition.
const SAVED_WAIT_SLICE: Duration = Duration::from_millis(100);

/// Configuration of an [`ImageRuntime`].
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Override of the scratch base directory (`<tmp>/jsolex` by default).
    pub temp_base: Option<PathBuf>,
    /// Byte budget of the memory-pressure policy.
    pub memory_budget_bytes: usize,
    /// Worker count of the global flush pass.
    pub flush_workers: usize,
    /// Idle window after which the watchdog spills a handle.
    pub idle_flush: Duration,
    /// Period of the auto-flush watchdog.
    pub watchdog_period: Duration,
    /// Permit count of the fork/join executor.
    pub max_parallel: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        let cores = thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
        Self {
            temp_base: None,
            memory_budget_bytes: 1 << 30,
            flush_workers: (cores / 2).max(1),
            idle_flush: Duration::from_secs(10),
            watchdog_period: Duration::from_secs(10),
            max_parallel: cores,
        }
    }
}

struct PathState {
    ref_count: usize,
    saved: bool,
}

struct CacheSlot {
    strong: Option<Arc<Image>>,
    weak: Weak<Image>,
}

struct HandleState {
    width: usize,
    height: usize,
    bytes: usize,
    path: PathBuf,
    cache: Mutex<CacheSlot>,
    last_access: Mutex<Instant>,
}

struct RuntimeShared {
    temp: TempWorkspace,
    policy: MemoryPolicy,
    executors: Executors,
    fork_join: ForkJoinExecutor,
    paths: Mutex<HashMap<PathBuf, PathState>>,
    saved_cond: Condvar,
    handles: Mutex<Vec<Weak<HandleState>>>,
    wrap_cache: Mutex<HashMap<usize, Weak<HandleState>>>,
    flush_workers: usize,
    idle_flush: Duration,
    interrupted: AtomicBool,
}

impl RuntimeShared {
    fn retain_path(&self, path: &Path) {
        let mut paths = self.paths.lock();
        if let Some(entry) = paths.get_mut(path) {
            entry.ref_count += 1;
        } else {
            warn!(path = %path.display(), "retain on an unregistered backing path");
        }
    }

    /// Decrements the path's reference count; at zero the file is deleted
    /// and all status tracking removed.
    fn release_path(&self, state: &HandleState) {
        let gone = {
            let mut paths = self.paths.lock();
            match paths.get_mut(&state.path) {
                Some(entry) => {
                    entry.ref_count -= 1;
                    if entry.ref_count == 0 {
                        paths.remove(&state.path);
                        true
                    } else {
                        false
                    }
                }
                None => false,
            }
        };
        if gone {
            if let Err(e) = std::fs::remove_file(&state.path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!(path = %state.path.display(), error = %e, "failed to delete backing file");
                }
            }
            let mut slot = state.cache.lock();
            if slot.strong.take().is_some() {
                self.policy.release(state.bytes);
            }
        }
    }

    fn path_saved(&self, path: &Path) -> bool {
        self.paths.lock().get(path).is_some_and(|e| e.saved)
    }

    /// Blocks until the path's `saved` flag is true.
    ///
    /// An interrupt terminates the wait with the cancellation sentinel
    /// (consuming the interrupt, which is how the re-raise translates to
    /// an error-value world).
    fn wait_saved(&self, path: &Path) -> RuntimeResult<()> {
        let mut paths = self.paths.lock();
        loop {
            match paths.get(path) {
                Some(entry) if entry.saved => return Ok(()),
                Some(_) => {}
                None => {
                    return Err(RuntimeError::Storage(helio_io::IoError::MissingData(
                        format!("backing path {} no longer registered", path.display()),
                    )));
                }
            }
            if self.interrupted.swap(false, Ordering::SeqCst) {
                return Err(RuntimeError::Cancelled);
            }
            self.saved_cond.wait_for(&mut paths, SAVED_WAIT_SLICE);
        }
    }

    /// Writes the handle's materialization if unsaved, then spills the
    /// strong cache reference.
    fn flush_handle(&self, state: &HandleState) -> RuntimeResult<()> {
        let needs_write = {
            let paths = self.paths.lock();
            match paths.get(&state.path) {
                Some(entry) => !entry.saved,
                // All handles dropped while the flush was queued.
                None => return Ok(()),
            }
        };

        if needs_write {
            let image = {
                let slot = state.cache.lock();
                slot.strong.clone().or_else(|| slot.weak.upgrade())
            };
            let Some(image) = image else {
                warn!(
                    path = %state.path.display(),
                    "unsaved materialization vanished before flush"
                );
                return Ok(());
            };
            helio_io::scratch::write(&state.path, &image)?;
            let mut paths = self.paths.lock();
            if let Some(entry) = paths.get_mut(&state.path) {
                entry.saved = true;
            }
            self.saved_cond.notify_all();
            debug!(path = %state.path.display(), "spilled image to scratch");
        }

        let mut slot = state.cache.lock();
        if slot.strong.take().is_some() {
            self.policy.release(state.bytes);
        }
        Ok(())
    }

    fn live_handles(&self) -> Vec<Arc<HandleState>> {
        self.handles.lock().iter().filter_map(Weak::upgrade).collect()
    }

    /// Auto-flush pass: spill every resident handle idle beyond the window.
    fn auto_flush_pass(&self) {
        for state in self.live_handles() {
            let idle = state.last_access.lock().elapsed();
            let resident = state.cache.lock().strong.is_some();
            if resident && idle > self.idle_flush {
                if let Err(e) = self.flush_handle(&state) {
                    warn!(path = %state.path.display(), error = %e, "auto-flush failed");
                }
            }
        }
    }

    /// Reclaim pass: prune dead registry entries, and verify the
    /// flush-before-clear invariant for anything that died unsaved.
    fn reclaim_pass(&self) {
        for state in self.live_handles() {
            let slot = state.cache.lock();
            if slot.strong.is_none()
                && slot.weak.upgrade().is_none()
                && !self.path_saved(&state.path)
                && self.paths.lock().contains_key(&state.path)
            {
                warn!(
                    path = %state.path.display(),
                    "materialization reclaimed before save; pixels are lost"
                );
            }
        }
        self.handles.lock().retain(|w| w.upgrade().is_some());
        self.wrap_cache
            .lock()
            .retain(|_, w| w.upgrade().is_some());
    }
}

/// A handle on a spilled (or spillable) image.
///
/// Cloning shares the backing path and increments its reference count;
/// the metadata bag is carried on the handle, not in the scratch file.
pub struct FileBacked {
    state: Arc<HandleState>,
    runtime: Arc<RuntimeShared>,
    metadata: MetadataBag,
}

impl FileBacked {
    /// Image width in pixels.
    pub fn width(&self) -> usize {
        self.state.width
    }

    /// Image height in pixels.
    pub fn height(&self) -> usize {
        self.state.height
    }

    /// The backing scratch path.
    pub fn path(&self) -> &Path {
        &self.state.path
    }

    /// Borrows the metadata bag.
    pub fn metadata(&self) -> &MetadataBag {
        &self.metadata
    }

    /// Mutably borrows the metadata bag.
    pub fn metadata_mut(&mut self) -> &mut MetadataBag {
        &mut self.metadata
    }

    /// Whether the backing file holds canonical bytes.
    pub fn is_saved(&self) -> bool {
        self.runtime.path_saved(&self.state.path)
    }

    /// Returns the concrete image, from cache or disk.
    ///
    /// A live cached materialization is returned directly; otherwise the
    /// call waits until the backing file is saved, reads it back, installs
    /// a fresh cache entry and refreshes the last-access timestamp.
    pub fn unwrap_to_memory(&self) -> RuntimeResult<Arc<Image>> {
        {
            let slot = self.state.cache.lock();
            if let Some(image) = slot.strong.clone().or_else(|| slot.weak.upgrade()) {
                *self.state.last_access.lock() = Instant::now();
                return Ok(image);
            }
        }

        self.runtime.wait_saved(&self.state.path)?;
        let mut image = helio_io::scratch::read(&self.state.path)?;
        *image.metadata_mut() = self.metadata.clone();
        let image = Arc::new(image);

        let mut slot = self.state.cache.lock();
        if slot.strong.is_none() {
            self.runtime.policy.reserve(self.state.bytes);
        }
        slot.strong = Some(Arc::clone(&image));
        slot.weak = Arc::downgrade(&image);
        *self.state.last_access.lock() = Instant::now();
        Ok(image)
    }

    /// Spills this handle now: writes the scratch file if needed and drops
    /// the strong cache reference.
    pub fn flush(&self) -> RuntimeResult<()> {
        self.runtime.flush_handle(&self.state)
    }
}

impl Clone for FileBacked {
    fn clone(&self) -> Self {
        self.runtime.retain_path(&self.state.path);
        Self {
            state: Arc::clone(&self.state),
            runtime: Arc::clone(&self.runtime),
            metadata: self.metadata.clone(),
        }
    }
}

impl Drop for FileBacked {
    fn drop(&mut self) {
        self.runtime.release_path(&self.state);
    }
}

impl std::fmt::Debug for FileBacked {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileBacked")
            .field("path", &self.state.path)
            .field("width", &self.state.width)
            .field("height", &self.state.height)
            .field("saved", &self.is_saved())
            .finish()
    }
}

/// An image that is either in memory or behind a file-backed handle.
///
/// `FileBacked` never wraps another `FileBacked`; the enum makes the
/// distinction explicit at the type level.
#[derive(Debug, Clone)]
pub enum ImageHandle {
    /// A concrete in-memory image.
    InMemory(Arc<Image>),
    /// A spilled handle.
    Spilled(FileBacked),
}

impl ImageHandle {
    /// Returns the concrete image, unwrapping lazily if spilled.
    pub fn unwrap_to_memory(&self) -> RuntimeResult<Arc<Image>> {
        match self {
            ImageHandle::InMemory(image) => Ok(Arc::clone(image)),
            ImageHandle::Spilled(handle) => handle.unwrap_to_memory(),
        }
    }
}

impl From<Image> for ImageHandle {
    fn from(image: Image) -> Self {
        ImageHandle::InMemory(Arc::new(image))
    }
}

/// The runtime value owning executors, caches and scratch space.
pub struct ImageRuntime {
    shared: Arc<RuntimeShared>,
    watchdog_stop: Option<Sender<()>>,
    watchdog: Option<JoinHandle<()>>,
    reclaim: Option<JoinHandle<()>>,
}

impl ImageRuntime {
    /// Creates a runtime and starts its watchdogs.
    pub fn new(config: RuntimeConfig) -> RuntimeResult<Self> {
        let temp = TempWorkspace::create(config.temp_base.clone())?;
        let shared = Arc::new(RuntimeShared {
            temp,
            policy: MemoryPolicy::new(config.memory_budget_bytes),
            executors: Executors::new(),
            fork_join: ForkJoinExecutor::new(config.max_parallel),
            paths: Mutex::new(HashMap::new()),
            saved_cond: Condvar::new(),
            handles: Mutex::new(Vec::new()),
            wrap_cache: Mutex::new(HashMap::new()),
            flush_workers: config.flush_workers,
            idle_flush: config.idle_flush,
            interrupted: AtomicBool::new(false),
        });

        let (stop_tx, stop_rx) = bounded::<()>(2);

        let watchdog = {
            let shared = Arc::clone(&shared);
            let stop = stop_rx.clone();
            let period = config.watchdog_period;
            thread::spawn(move || loop {
                match stop.recv_timeout(period) {
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => return,
                    Err(RecvTimeoutError::Timeout) => shared.auto_flush_pass(),
                }
            })
        };
        let reclaim = {
            let shared = Arc::clone(&shared);
            thread::spawn(move || loop {
                match stop_rx.recv_timeout(RECLAIM_PERIOD) {
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => return,
                    Err(RecvTimeoutError::Timeout) => shared.reclaim_pass(),
                }
            })
        };

        Ok(Self {
            shared,
            watchdog_stop: Some(stop_tx),
            watchdog: Some(watchdog),
            reclaim: Some(reclaim),
        })
    }

    /// Wraps a handle: file-backed input is returned as-is, in-memory
    /// input is registered for spilling.
    pub fn wrap(&self, handle: ImageHandle) -> RuntimeResult<FileBacked> {
        match handle {
            ImageHandle::Spilled(fb) => Ok(fb),
            ImageHandle::InMemory(image) => self.wrap_image(image),
        }
    }

    /// Registers an in-memory image behind a file-backed handle.
    ///
    /// Wrapping the same `Arc` twice yields handles sharing one backing
    /// path (the wrap cache is a weak map over the materialization's
    /// identity). Under critical pressure the new handle is flushed
    /// immediately on the I/O executor.
    pub fn wrap_image(&self, image: Arc<Image>) -> RuntimeResult<FileBacked> {
        let shared = &self.shared;
        let key = Arc::as_ptr(&image) as usize;

        if let Some(state) = shared.wrap_cache.lock().get(&key).and_then(Weak::upgrade) {
            if shared.paths.lock().contains_key(&state.path) {
                shared.retain_path(&state.path);
                return Ok(FileBacked {
                    state,
                    runtime: Arc::clone(shared),
                    metadata: image.metadata().clone(),
                });
            }
        }

        let (width, height) = image.dimensions();
        let bytes = image_bytes(&image);
        let path = shared.temp.scratch_path("img");
        shared.paths.lock().insert(
            path.clone(),
            PathState {
                ref_count: 1,
                saved: false,
            },
        );
        let state = Arc::new(HandleState {
            width,
            height,
            bytes,
            path,
            cache: Mutex::new(CacheSlot {
                strong: Some(Arc::clone(&image)),
                weak: Arc::downgrade(&image),
            }),
            last_access: Mutex::new(Instant::now()),
        });
        shared.policy.reserve(bytes);
        shared.handles.lock().push(Arc::downgrade(&state));
        shared.wrap_cache.lock().insert(key, Arc::downgrade(&state));

        let handle = FileBacked {
            state: Arc::clone(&state),
            runtime: Arc::clone(shared),
            metadata: image.metadata().clone(),
        };

        if shared.policy.needs_immediate_flush() {
            let shared = Arc::clone(&self.shared);
            let state = Arc::clone(&state);
            self.shared.executors.submit_io(move |_| {
                if let Err(e) = shared.flush_handle(&state) {
                    warn!(path = %state.path.display(), error = %e, "immediate flush failed");
                }
            });
        }

        Ok(handle)
    }

    /// Global flush pass.
    ///
    /// Engages only while memory is actually low: after a bounded
    /// event-driven wait for relief, every live materialization is queued
    /// on a small worker pool; each worker re-checks the recover watermark
    /// before writing and aborts once memory has recovered. The call
    /// blocks until the workers have drained.
    pub fn flush_images(&self) -> RuntimeResult<()> {
        let shared = &self.shared;
        if !shared.policy.under_pressure() {
            return Ok(());
        }
        shared.policy.wait_for_relief(Duration::from_millis(250));
        if !shared.policy.under_pressure() {
            return Ok(());
        }

        let targets: Vec<Arc<HandleState>> = shared
            .live_handles()
            .into_iter()
            .filter(|s| {
                let slot = s.cache.lock();
                slot.strong.is_some() || slot.weak.upgrade().is_some()
            })
            .collect();
        if targets.is_empty() {
            return Ok(());
        }

        let (tx, rx) = unbounded::<Arc<HandleState>>();
        for target in targets {
            let _ = tx.send(target);
        }
        drop(tx);

        let mut workers = Vec::new();
        for _ in 0..shared.flush_workers.max(1) {
            let rx = rx.clone();
            let shared = Arc::clone(shared);
            workers.push(thread::spawn(move || {
                while let Ok(state) = rx.recv() {
                    if shared.policy.recovered() {
                        debug!("memory recovered past the abort watermark, flush worker stopping");
                        return;
                    }
                    if let Err(e) = shared.flush_handle(&state) {
                        warn!(path = %state.path.display(), error = %e, "flush failed");
                    }
                }
            }));
        }
        for worker in workers {
            let _ = worker.join();
        }
        Ok(())
    }

    /// Cancels every tracked task and wakes blocked waiters with the
    /// cancellation sentinel.
    pub fn interrupt(&self) {
        self.shared.interrupted.store(true, Ordering::SeqCst);
        self.shared.executors.interrupt();
        self.shared.fork_join.shutdown_now();
    }

    /// The shared executors.
    pub fn executors(&self) -> &Executors {
        &self.shared.executors
    }

    /// The fork/join executor.
    pub fn fork_join(&self) -> &ForkJoinExecutor {
        &self.shared.fork_join
    }

    /// The scratch workspace.
    pub fn temp(&self) -> &TempWorkspace {
        &self.shared.temp
    }

    /// The memory-pressure policy.
    pub fn policy(&self) -> &MemoryPolicy {
        &self.shared.policy
    }
}

impl Drop for ImageRuntime {
    fn drop(&mut self) {
        // Dropping the sender disconnects both watchdog receivers.
        self.watchdog_stop.take();
        if let Some(handle) = self.watchdog.take() {
            let _ = handle.join();
        }
        if let Some(handle) = self.reclaim.take() {
            let _ = handle.join();
        }
    }
}

fn image_bytes(image: &Image) -> usize {
    let (w, h) = image.dimensions();
    let planes = match image {
        Image::Mono(_) => 1,
        Image::Rgb(_) => 3,
    };
    w * h * planes * std::mem::size_of::<f32>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use helio_core::{MetadataValue, MonoImage};
    use tempfile::tempdir;

    fn test_image(seed: f32) -> Arc<Image> {
        let mut img = MonoImage::new(8, 6);
        for (i, v) in img.data_mut().iter_mut().enumerate() {
            *v = seed + i as f32;
        }
        img.metadata_mut().insert(MetadataValue::PixelShift(1.5));
        Arc::new(Image::Mono(img))
    }

    fn runtime_with(base: &std::path::Path, budget: usize) -> ImageRuntime {
        ImageRuntime::new(RuntimeConfig {
            temp_base: Some(base.to_path_buf()),
            memory_budget_bytes: budget,
            ..RuntimeConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_wrap_unwrap_identity() {
        let dir = tempdir().unwrap();
        let runtime = runtime_with(dir.path(), 1 << 24);
        let image = test_image(10.0);
        let handle = runtime.wrap_image(Arc::clone(&image)).unwrap();

        // Still resident: the unwrap returns the cached materialization.
        let unwrapped = handle.unwrap_to_memory().unwrap();
        assert!(Arc::ptr_eq(&image, &unwrapped));
    }

    #[test]
    fn test_flush_then_unwrap_reloads_equal_pixels() {
        let dir = tempdir().unwrap();
        let runtime = runtime_with(dir.path(), 1 << 24);
        let image = test_image(3.0);
        let handle = runtime.wrap_image(Arc::clone(&image)).unwrap();

        handle.flush().unwrap();
        assert!(handle.is_saved());
        assert!(handle.path().exists());

        // Drop every strong reference to the materialization.
        drop(image);

        let reloaded = handle.unwrap_to_memory().unwrap();
        let Image::Mono(mono) = reloaded.as_ref() else {
            panic!()
        };
        assert_eq!(mono.pixel(0, 0), 3.0);
        assert_eq!(mono.pixel(7, 5), 3.0 + 47.0);
        // The handle's metadata bag was re-attached.
        assert_eq!(reloaded.metadata().pixel_shift(), Some(1.5));
    }

    #[test]
    fn test_refcount_zero_deletes_file() {
        let dir = tempdir().unwrap();
        let runtime = runtime_with(dir.path(), 1 << 24);
        let handle = runtime.wrap_image(test_image(0.0)).unwrap();
        handle.flush().unwrap();
        let path = handle.path().to_path_buf();
        assert!(path.exists());

        let second = handle.clone();
        drop(handle);
        assert!(path.exists(), "file must survive while a handle lives");
        drop(second);
        assert!(!path.exists(), "file must be deleted at refcount zero");
    }

    #[test]
    fn test_wrap_cache_shares_backing_path() {
        let dir = tempdir().unwrap();
        let runtime = runtime_with(dir.path(), 1 << 24);
        let image = test_image(1.0);
        let a = runtime.wrap_image(Arc::clone(&image)).unwrap();
        let b = runtime.wrap_image(Arc::clone(&image)).unwrap();
        assert_eq!(a.path(), b.path());

        let c = runtime.wrap_image(test_image(1.0)).unwrap();
        assert_ne!(a.path(), c.path());
    }

    #[test]
    fn test_wrap_is_idempotent_on_spilled_handles() {
        let dir = tempdir().unwrap();
        let runtime = runtime_with(dir.path(), 1 << 24);
        let handle = runtime.wrap_image(test_image(2.0)).unwrap();
        let path = handle.path().to_path_buf();
        let rewrapped = runtime.wrap(ImageHandle::Spilled(handle)).unwrap();
        assert_eq!(rewrapped.path(), path);
    }

    #[test]
    fn test_flush_images_spills_under_pressure() {
        let dir = tempdir().unwrap();
        // Two 8x6 mono images (192 bytes each) exhaust this budget, and
        // flushing one only brings free back to the 50% boundary, so the
        // workers never abort early.
        let runtime = runtime_with(dir.path(), 384);
        let a = runtime.wrap_image(test_image(0.0)).unwrap();
        let b = runtime.wrap_image(test_image(5.0)).unwrap();
        assert!(runtime.policy().under_pressure());

        runtime.flush_images().unwrap();
        assert!(a.is_saved());
        assert!(b.is_saved());
        // The strong references were dropped, releasing the budget.
        assert_eq!(runtime.policy().resident_bytes(), 0);
    }

    #[test]
    fn test_auto_flush_watchdog_spills_idle_handles() {
        let dir = tempdir().unwrap();
        let runtime = ImageRuntime::new(RuntimeConfig {
            temp_base: Some(dir.path().to_path_buf()),
            memory_budget_bytes: 1 << 24,
            idle_flush: Duration::from_millis(50),
            watchdog_period: Duration::from_millis(50),
            ..RuntimeConfig::default()
        })
        .unwrap();

        let handle = runtime.wrap_image(test_image(9.0)).unwrap();
        let deadline = Instant::now() + Duration::from_secs(5);
        while !handle.is_saved() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(20));
        }
        assert!(handle.is_saved(), "watchdog never spilled the idle handle");
    }

    #[test]
    fn test_unwrap_missing_path_errors() {
        let dir = tempdir().unwrap();
        let runtime = runtime_with(dir.path(), 1 << 24);
        let handle = runtime.wrap_image(test_image(0.0)).unwrap();
        let clone = handle.clone();
        drop(handle);
        // Still registered: one handle remains.
        assert!(clone.unwrap_to_memory().is_ok());
    }
}
