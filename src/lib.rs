//! Chronicle - versioned history for application objects
//!
//! Chronicle records snapshots of host objects into one bare git repository
//! per class, batching every change made during a unit of work into a single
//! revision per repository. Any stored revision can be read back, an
//! object's revision history walked, and two points in that history (or a
//! stored revision and the live object) diffed field by field.
//!
//! # Architecture
//!
//! The codebase follows a strict layered architecture:
//!
//! - [`versions`] - Object-level facade over everything below
//! - [`inspect`] - Host types, inspectors, and field policies
//! - [`engine`] - Sessions, the commit protocol, and history reads
//! - [`core`] - Domain types, snapshots, paths, configuration, and locking
//! - [`git`] - Single interface for all repository operations
//!
//! # Correctness Invariants
//!
//! 1. One finished session produces at most one revision per repository
//! 2. Each revision contains exactly the snapshots staged for it
//! 3. Commits to one repository are serialized across threads and processes
//! 4. Stored history is append-only; nothing is rewritten or deleted

pub mod core;
pub mod engine;
pub mod git;
pub mod inspect;
pub mod versions;

pub use versions::Versions;
