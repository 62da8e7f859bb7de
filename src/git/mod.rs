//! git
//!
//! Single interface to the revision-control engine.
//!
//! # Architecture
//!
//! This module is the **ONLY doorway** to git. Every repository read and
//! write flows through it, and no other module imports `git2`. Any engine
//! that offers the same operations (create-or-open, build a revision from
//! explicit paths on the tip, read a blob at a revision, walk a path's
//! history) could replace it.
//!
//! # Responsibilities
//!
//! - Repository opening and bare initialization
//! - Revision construction from an explicit (path, content) set
//! - Revision resolution (full/abbreviated hex, `HEAD`)
//! - Blob retrieval by path and revision
//! - First-parent history and per-path change detection
//!
//! # Invariants
//!
//! - Revisions are built without a working directory or on-disk index
//! - Every revision has the previous tip as its only parent
//! - All operations return strong types (Revision, ObjectPath)

mod interface;

pub use interface::{Author, CommitInfo, Git, GitError};
