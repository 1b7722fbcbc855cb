//! Execution lock subsystem.
//!
//! # Responsibilities
//! - Cross-process mutual exclusion via a filesystem marker (execution.rs)
//! - Non-intrusive pid liveness probing for staleness decisions (liveness.rs)

pub mod execution;
pub mod liveness;

pub use execution::{ExecutionLock, LockGuard, LockRecord};
pub use liveness::is_pid_alive;
