//! engine::commit
//!
//! The atomic multi-path commit protocol.
//!
//! # Protocol
//!
//! For one repository and a set of (object path, blob) pairs:
//!
//! 1. Empty set: return without opening anything or taking the lock
//! 2. Open (or create) the repository
//! 3. Acquire the repository's exclusive commit lock
//! 4. Build one revision on the current tip containing exactly the given
//!    blobs at exactly the given paths
//! 5. Advance the tip, release the lock, return the revision
//!
//! A failure at any step is reported once and not retried. The lock guard
//! is dropped on every exit path.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use crate::core::config::Config;
use crate::core::ops::lock::CommitLock;
use crate::core::types::{ObjectPath, RepositoryLocation, Revision};
use crate::engine::error::VersionError;
use crate::engine::repository::RepositoryHandle;
use crate::git::Author;

/// Who a revision is attributed to, and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribution {
    /// Author, either a bare name or `Name <email>`
    pub user: String,
    /// Commit message
    pub message: String,
}

impl Attribution {
    /// Create an attribution.
    pub fn new(user: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            message: message.into(),
        }
    }
}

/// Commits staged blobs to class repositories, one revision per call.
#[derive(Debug)]
pub struct CommitEngine {
    repositories: Arc<RepositoryHandle>,
    lock_timeout: Option<Duration>,
    default_user: String,
    author_email: String,
}

impl CommitEngine {
    /// Create an engine that resolves repositories through `repositories`.
    pub fn new(repositories: Arc<RepositoryHandle>, config: &Config) -> Self {
        Self {
            repositories,
            lock_timeout: config.lock_timeout(),
            default_user: config.default_user().to_string(),
            author_email: config.author_email().to_string(),
        }
    }

    /// Commit `changes` to the repository at `location` as one revision.
    ///
    /// Returns `Ok(None)` without touching the repository when `changes`
    /// is empty.
    ///
    /// # Errors
    ///
    /// - [`VersionError::RepositoryUnavailable`] if the repository cannot be opened
    /// - [`VersionError::LockTimeout`] if a bounded lock wait expired
    /// - [`VersionError::CommitFailed`] if locking, construction, or finalize failed
    pub fn commit(
        &self,
        location: &RepositoryLocation,
        changes: &BTreeMap<ObjectPath, Vec<u8>>,
        attribution: &Attribution,
    ) -> Result<Option<Revision>, VersionError> {
        if changes.is_empty() {
            return Ok(None);
        }

        let git = self.repositories.open(location)?;
        let author = Author::parse(&attribution.user, &self.default_user, &self.author_email);

        let lock = CommitLock::acquire(location, self.lock_timeout)
            .map_err(|e| VersionError::from_lock(location, e))?;

        let revision = git
            .commit_paths(changes, &author, &attribution.message)
            .map_err(|e| VersionError::commit_failed(location, e))?;
        drop(lock);

        tracing::debug!(
            location = %location,
            revision = %revision.short(12),
            paths = changes.len(),
            author = %author.name,
            "committed revision"
        );
        Ok(Some(revision))
    }
}
