//! engine::error
//!
//! Error taxonomy for versioning operations.
//!
//! # Design
//!
//! Lower layers keep their own typed errors ([`GitError`], [`LockError`],
//! [`SnapshotError`]). They are mapped into [`VersionError`] at the engine
//! boundary, where the repository location and object path are known.
//! Nothing is retried or logged here; every error goes to the caller.
//!
//! # Example
//!
//! ```
//! use chronicle::engine::VersionError;
//! use chronicle::core::types::RepositoryLocation;
//!
//! let err = VersionError::VersionNotFound {
//!     revision: "tip".to_string(),
//!     path: "shop.models/order/42".to_string(),
//!     location: RepositoryLocation::new("/data/shop.models/order"),
//! };
//! assert!(err.to_string().contains("shop.models/order/42"));
//! ```

use std::collections::BTreeMap;
use std::time::Duration;

use thiserror::Error;

use crate::core::ops::lock::LockError;
use crate::core::snapshot::SnapshotError;
use crate::core::types::{RepositoryLocation, Revision, TypeError};
use crate::git::GitError;

/// Which step of repository resolution failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepoAction {
    /// Opening a repository that should already exist.
    Open,
    /// Creating directories or initializing a new repository.
    Create,
}

impl std::fmt::Display for RepoAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RepoAction::Open => write!(f, "open"),
            RepoAction::Create => write!(f, "create"),
        }
    }
}

/// Errors from versioning operations.
#[derive(Debug, Error)]
pub enum VersionError {
    /// The class repository could not be opened or created.
    #[error("cannot {action} repository {location}: {message}")]
    RepositoryUnavailable {
        /// The repository location
        location: RepositoryLocation,
        /// Whether opening or creating failed
        action: RepoAction,
        /// Underlying cause
        message: String,
    },

    /// Lock, construction, or finalize failed while committing.
    #[error("commit to {location} failed: {cause}")]
    CommitFailed {
        /// The repository location
        location: RepositoryLocation,
        /// Underlying cause
        cause: String,
    },

    /// The commit lock was not released within the configured bound.
    #[error("timed out after {waited:?} waiting for commit lock on {location}")]
    LockTimeout {
        /// The repository location
        location: RepositoryLocation,
        /// How long we waited
        waited: Duration,
    },

    /// No content exists for the path at the requested revision.
    #[error("revision `{revision}` does not exist for {path} in {location}")]
    VersionNotFound {
        /// The revision as requested
        revision: String,
        /// The object path
        path: String,
        /// The repository location
        location: RepositoryLocation,
    },

    /// A stored blob is not a valid snapshot.
    #[error("stored snapshot at {path} is corrupt: {message}")]
    CorruptSnapshot {
        /// The object path
        path: String,
        /// Parse failure
        message: String,
    },

    /// No inspector was registered for the object's type.
    #[error("no inspector registered for {type_name}")]
    UnregisteredClass {
        /// Rust type name of the object
        type_name: &'static str,
    },

    /// Reading history failed after the repository was opened.
    #[error("history read in {location} failed: {cause}")]
    ReadFailed {
        /// The repository location
        location: RepositoryLocation,
        /// Underlying cause
        cause: String,
    },

    /// A snapshot could not be serialized.
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    /// Type validation failed.
    #[error(transparent)]
    Type(#[from] TypeError),

    /// A unit of work committed only some of its repositories.
    #[error(transparent)]
    Finish(#[from] FinishError),
}

impl VersionError {
    /// Map a commit-time lock failure.
    pub(crate) fn from_lock(location: &RepositoryLocation, err: LockError) -> Self {
        match err {
            LockError::Timeout { waited } => VersionError::LockTimeout {
                location: location.clone(),
                waited,
            },
            other => VersionError::CommitFailed {
                location: location.clone(),
                cause: other.to_string(),
            },
        }
    }

    /// Map a commit-time engine failure.
    pub(crate) fn commit_failed(location: &RepositoryLocation, err: GitError) -> Self {
        VersionError::CommitFailed {
            location: location.clone(),
            cause: err.to_string(),
        }
    }

    /// Map a read-time engine failure.
    pub(crate) fn read_failed(location: &RepositoryLocation, err: GitError) -> Self {
        VersionError::ReadFailed {
            location: location.clone(),
            cause: err.to_string(),
        }
    }

    /// Whether this error means "nothing stored there", as opposed to a
    /// failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, VersionError::VersionNotFound { .. })
    }
}

/// Outcome of a `finish()` in which at least one repository failed.
///
/// Repositories listed in `committed` keep their new revisions; there is
/// no cross-repository rollback.
#[derive(Debug, Error)]
#[error("{} of {} repository commits failed", .failed.len(), .failed.len() + .committed.len())]
pub struct FinishError {
    /// Revisions that were committed before or after the failures.
    pub committed: BTreeMap<RepositoryLocation, Revision>,
    /// Per-repository failures.
    pub failed: BTreeMap<RepositoryLocation, VersionError>,
}
