//! engine::repository
//!
//! Open-or-create resolution for class repositories.
//!
//! # Resolution
//!
//! Opening is an explicit two-step rather than "try create, swallow
//! whatever fails":
//!
//! 1. Directory exists: open it. If it holds no repository yet (an empty
//!    directory, or one a concurrent creator has not finished), initialize
//!    a bare repository in place. Re-initialization is idempotent in the
//!    engine, so racing creators converge on one repository.
//! 2. Directory missing: create parent directories, then initialize. If
//!    initialization fails, retry a plain open in case another creator won,
//!    and report the original create error if that fails too.
//!
//! Open failures and create failures surface as distinct
//! [`RepoAction`]s.
//!
//! # Caching
//!
//! Locations that resolved successfully are remembered, so later opens
//! skip straight to a plain open. Resolution of unknown locations is
//! serialized within the process; across processes the engine's atomic
//! init is what keeps creators from corrupting each other.
//!
//! Engine handles themselves are not cached: each caller gets its own,
//! since they cannot be shared across threads.

use std::collections::HashSet;
use std::fs;
use std::sync::{Mutex, RwLock};

use crate::core::types::RepositoryLocation;
use crate::engine::error::{RepoAction, VersionError};
use crate::git::{Git, GitError};

/// Opens (creating on first use) the repository at a location.
#[derive(Debug, Default)]
pub struct RepositoryHandle {
    known: RwLock<HashSet<RepositoryLocation>>,
    resolving: Mutex<()>,
}

impl RepositoryHandle {
    /// Create a handle with an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open the repository at `location`, creating it if needed.
    ///
    /// Safe to call concurrently for the same location.
    ///
    /// # Errors
    ///
    /// - [`VersionError::RepositoryUnavailable`] with [`RepoAction::Open`] if an
    ///   existing repository cannot be opened
    /// - [`VersionError::RepositoryUnavailable`] with [`RepoAction::Create`] if
    ///   directories or the repository cannot be created
    pub fn open(&self, location: &RepositoryLocation) -> Result<Git, VersionError> {
        if self.is_known(location) {
            match Git::open(location.as_path()) {
                Ok(git) => return Ok(git),
                // Removed behind our back; fall through to full resolution.
                Err(GitError::NotARepo { .. }) => self.forget(location),
                Err(e) => return Err(Self::unavailable(location, RepoAction::Open, e)),
            }
        }

        let _resolving = self.resolving.lock().unwrap_or_else(|e| e.into_inner());
        let git = if location.as_path().is_dir() {
            self.open_existing(location)?
        } else {
            self.create(location)?
        };

        self.remember(location);
        Ok(git)
    }

    fn open_existing(&self, location: &RepositoryLocation) -> Result<Git, VersionError> {
        match Git::open(location.as_path()) {
            Ok(git) => Ok(git),
            Err(GitError::NotARepo { .. }) => {
                tracing::debug!(location = %location, "initializing repository in existing directory");
                Git::init(location.as_path())
                    .map_err(|e| Self::unavailable(location, RepoAction::Create, e))
            }
            Err(e) => Err(Self::unavailable(location, RepoAction::Open, e)),
        }
    }

    fn create(&self, location: &RepositoryLocation) -> Result<Git, VersionError> {
        if let Some(parent) = location.as_path().parent() {
            fs::create_dir_all(parent).map_err(|e| VersionError::RepositoryUnavailable {
                location: location.clone(),
                action: RepoAction::Create,
                message: format!("cannot create {}: {}", parent.display(), e),
            })?;
        }

        match Git::init(location.as_path()) {
            Ok(git) => {
                tracing::debug!(location = %location, "created repository");
                Ok(git)
            }
            Err(create_err) => Git::open(location.as_path())
                .map_err(|_| Self::unavailable(location, RepoAction::Create, create_err)),
        }
    }

    fn unavailable(location: &RepositoryLocation, action: RepoAction, err: GitError) -> VersionError {
        VersionError::RepositoryUnavailable {
            location: location.clone(),
            action,
            message: err.to_string(),
        }
    }

    fn is_known(&self, location: &RepositoryLocation) -> bool {
        self.known
            .read()
            .map(|known| known.contains(location))
            .unwrap_or(false)
    }

    fn remember(&self, location: &RepositoryLocation) {
        if let Ok(mut known) = self.known.write() {
            known.insert(location.clone());
        }
    }

    fn forget(&self, location: &RepositoryLocation) {
        if let Ok(mut known) = self.known.write() {
            known.remove(location);
        }
    }

    /// Number of locations resolved so far.
    pub fn cached_len(&self) -> usize {
        self.known.read().map(|known| known.len()).unwrap_or(0)
    }
}
