//! Per-process scratch folders with crash cleanup.
//!
//! Scratch files live under `<system temp>/jsolex/<pid>/`. On startup the
//! base directory is swept: plain files are deleted, directories whose
//! name is the PID of a live process are left alone, everything else (dead
//! PIDs, unparseable names) is removed recursively. The sweep is the only
//! producer or cleaner of `jsolex/*` siblings.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

use crate::error::RuntimeResult;

/// Name of the shared scratch base under the system temp directory.
const BASE_DIR_NAME: &str = "jsolex";

/// The per-process scratch workspace.
pub struct TempWorkspace {
    pid_dir: PathBuf,
    counter: AtomicU64,
}

impl TempWorkspace {
    /// Creates the workspace, sweeping stale siblings first.
    ///
    /// `base_override` replaces `<system temp>/jsolex` (used by tests and
    /// embedders with their own scratch volume).
    pub fn create(base_override: Option<PathBuf>) -> RuntimeResult<Self> {
        let base = base_override.unwrap_or_else(|| std::env::temp_dir().join(BASE_DIR_NAME));
        fs::create_dir_all(&base)?;
        sweep_stale(&base);

        let pid_dir = base.join(std::process::id().to_string());
        fs::create_dir_all(&pid_dir)?;
        Ok(Self {
            pid_dir,
            counter: AtomicU64::new(0),
        })
    }

    /// Directory holding this process's scratch files.
    pub fn pid_dir(&self) -> &Path {
        &self.pid_dir
    }

    /// Allocates a fresh scratch path with the given prefix.
    pub fn scratch_path(&self, prefix: &str) -> PathBuf {
        let seq = self.counter.fetch_add(1, Ordering::Relaxed);
        self.pid_dir.join(format!("{prefix}-{seq:06}.img"))
    }
}

impl Drop for TempWorkspace {
    fn drop(&mut self) {
        // Best-effort delete-on-exit; a crash leaves the sweep to the next run.
        if let Err(e) = fs::remove_dir_all(&self.pid_dir) {
            debug!(dir = %self.pid_dir.display(), error = %e, "scratch cleanup failed");
        }
    }
}

/// Removes every stale entry of the scratch base.
fn sweep_stale(base: &Path) {
    let entries = match fs::read_dir(base) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(base = %base.display(), error = %e, "cannot sweep scratch base");
            return;
        }
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_dir() {
            remove(&path, false);
            continue;
        }
        match entry.file_name().to_string_lossy().parse::<u32>() {
            Ok(pid) if pid_alive(pid) => {}
            _ => remove(&path, true),
        }
    }
}

fn remove(path: &Path, is_dir: bool) {
    let result = if is_dir {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    match result {
        Ok(()) => debug!(path = %path.display(), "removed stale scratch entry"),
        Err(e) => warn!(path = %path.display(), error = %e, "failed to remove stale scratch entry"),
    }
}

/// Whether a PID belongs to a live process.
///
/// On Linux this consults `/proc`; elsewhere the check is conservative and
/// treats every parseable PID as alive (stale dirs are then only removed
/// by their own process's next run).
fn pid_alive(pid: u32) -> bool {
    if cfg!(target_os = "linux") {
        Path::new("/proc").join(pid.to_string()).exists()
    } else {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_creates_pid_dir_and_paths() {
        let base = tempdir().unwrap();
        let ws = TempWorkspace::create(Some(base.path().to_path_buf())).unwrap();
        assert!(ws.pid_dir().is_dir());
        assert!(ws
            .pid_dir()
            .ends_with(std::process::id().to_string()));

        let a = ws.scratch_path("img");
        let b = ws.scratch_path("img");
        assert_ne!(a, b);
        assert!(a.starts_with(ws.pid_dir()));
    }

    #[test]
    fn test_drop_removes_pid_dir() {
        let base = tempdir().unwrap();
        let pid_dir = {
            let ws = TempWorkspace::create(Some(base.path().to_path_buf())).unwrap();
            std::fs::write(ws.scratch_path("img"), b"x").unwrap();
            ws.pid_dir().to_path_buf()
        };
        assert!(!pid_dir.exists());
    }

    #[test]
    fn test_sweep_removes_stale_entries() {
        let base = tempdir().unwrap();

        // A plain file, an unparseable directory and a dead-PID directory.
        std::fs::write(base.path().join("stray.tmp"), b"x").unwrap();
        std::fs::create_dir(base.path().join("not-a-pid")).unwrap();
        let dead = base.path().join("4294967294");
        std::fs::create_dir(&dead).unwrap();
        std::fs::write(dead.join("leftover.img"), b"x").unwrap();

        // A live-PID directory (our own) must survive.
        let own = base.path().join(std::process::id().to_string());
        std::fs::create_dir(&own).unwrap();

        let _ws = TempWorkspace::create(Some(base.path().to_path_buf())).unwrap();

        assert!(!base.path().join("stray.tmp").exists());
        assert!(!base.path().join("not-a-pid").exists());
        assert!(own.is_dir());
        if cfg!(target_os = "linux") {
            assert!(!dead.exists());
        }
    }
}
