//! # helio-runtime
//!
//! The runtime fabric of the solar imaging pipeline. One [`ImageRuntime`]
//! value owns everything that used to be a global: the scratch workspace,
//! the memory-pressure policy, the executors and the registries of
//! file-backed images. Background watchdogs run as threads of the runtime
//! and shut down cleanly when it drops.
//!
//! # Modules
//!
//! - [`memory`] - file-backed images with spill-to-disk under pressure
//! - [`pressure`] - the byte-accounted memory-pressure policy
//! - [`executors`] - shared CPU / I/O / exclusive-I/O executors
//! - [`forkjoin`] - permit-bounded structured parallelism
//! - [`scheduler`] - level-wise DAG scheduling of expression graphs
//! - [`tempdir`] - per-process scratch folders with crash cleanup
//! - [`value`] - the dynamic value type of the evaluator boundary

#![warn(rustdoc::missing_crate_level_docs)]

pub mod error;
pub mod executors;
pub mod forkjoin;
pub mod memory;
pub mod pressure;
pub mod scheduler;
pub mod tempdir;
pub mod value;

pub use error::{RuntimeError, RuntimeResult};
pub use executors::{CancellationToken, Executors, TaskHandle};
pub use forkjoin::{ForkJoinExecutor, FjHandle};
pub use memory::{FileBacked, ImageHandle, ImageRuntime, RuntimeConfig};
pub use pressure::MemoryPolicy;
pub use scheduler::{compute_levels, DependencyInfo, ExecutionLevel, SchedulerError};
pub use tempdir::TempWorkspace;
pub use value::Value;
