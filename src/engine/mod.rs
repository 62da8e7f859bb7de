//! engine
//!
//! Repository resolution, the commit protocol, sessions, and history reads.
//!
//! # Architecture
//!
//! ```text
//! Session ──stage/finish──> CommitEngine ──lock + commit──> Git
//!                                │
//!                         RepositoryHandle (open-or-create, cached)
//!                                │
//! HistoryReader ──get/history/diff──> Git
//! ```
//!
//! - [`RepositoryHandle`] turns a location into an open repository,
//!   creating it on first use
//! - [`CommitEngine`] writes one revision per repository under that
//!   repository's exclusive commit lock
//! - [`Session`] batches stages so each unit of work produces at most one
//!   revision per repository
//! - [`HistoryReader`] reads snapshots, revision history, and diffs
//!
//! # Invariants
//!
//! - Every revision a commit produces contains exactly the blobs staged for
//!   that repository, at exactly their paths
//! - Commits to one repository are strictly sequential; commits to
//!   different repositories never wait on each other
//! - Readers never observe a partially written revision

pub mod commit;
pub mod diff;
pub mod error;
pub mod history;
pub mod repository;
pub mod session;

pub use commit::{Attribution, CommitEngine};
pub use diff::{diff_snapshots, render_value, unified_diff};
pub use error::{FinishError, RepoAction, VersionError};
pub use history::{
    DiffTarget, History, HistoryIter, HistoryReader, RevisionRecord, LIVE_LABEL, TIP,
};
pub use repository::RepositoryHandle;
pub use session::{Session, StagedChanges};
