//! core::ops
//!
//! Write-side coordination primitives.
//!
//! # Modules
//!
//! - [`lock`] - Exclusive per-repository commit lock
//!
//! # Architecture
//!
//! Every commit:
//! 1. Opens (or creates) the class repository
//! 2. Acquires that repository's commit lock
//! 3. Builds one revision from the staged paths on top of the tip
//! 4. Advances the tip and releases the lock

pub mod lock;

pub use lock::{CommitLock, LockError};
