//! engine::session
//!
//! Batching of staged snapshots into one revision per repository.
//!
//! A [`Session`] is a plain value owned by whoever drives the unit of work,
//! typically one per request or job. While active it accumulates the latest
//! blob for every object path it is given; [`Session::finish`] then commits
//! each repository's batch through the [`CommitEngine`]. While inactive,
//! every stage commits immediately.
//!
//! ```ignore
//! let mut session = versions.session();
//! session.start();
//! session.set_user("alice <alice@example.com>");
//! session.set_message("mark paid");
//! session.stage(location, path, blob)?;
//! let revisions = session.finish()?;
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::core::config::Config;
use crate::core::types::{ObjectPath, RepositoryLocation, Revision};
use crate::engine::commit::{Attribution, CommitEngine};
use crate::engine::error::{FinishError, VersionError};

/// Blobs staged for one repository, keyed by object path.
pub type StagedChanges = BTreeMap<ObjectPath, Vec<u8>>;

/// An explicit unit of work.
#[derive(Debug)]
pub struct Session {
    engine: Arc<CommitEngine>,
    active: bool,
    changes: BTreeMap<RepositoryLocation, StagedChanges>,
    user: Option<String>,
    message: Option<String>,
    default_user: String,
    default_message: String,
}

impl Session {
    /// Create an inactive session committing through `engine`.
    ///
    /// Attribution falls back to the defaults in `config`.
    pub fn new(engine: Arc<CommitEngine>, config: &Config) -> Self {
        Self {
            engine,
            active: false,
            changes: BTreeMap::new(),
            user: None,
            message: None,
            default_user: config.default_user().to_string(),
            default_message: config.default_message().to_string(),
        }
    }

    /// Begin batching. Calling this on an active session changes nothing.
    pub fn start(&mut self) {
        if !self.active {
            tracing::trace!("session started");
            self.active = true;
        }
    }

    /// Whether stages are currently being batched.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Stage `blob` at `path` in the repository at `location`.
    ///
    /// Active sessions keep the blob until [`Session::finish`], replacing
    /// whatever was staged for the same path, and return `Ok(None)`.
    /// Inactive sessions commit it at once and return the new revision.
    ///
    /// # Errors
    ///
    /// Only when committing immediately; see [`CommitEngine::commit`].
    pub fn stage(
        &mut self,
        location: RepositoryLocation,
        path: ObjectPath,
        blob: Vec<u8>,
    ) -> Result<Option<Revision>, VersionError> {
        if self.active {
            tracing::trace!(location = %location, path = %path, "staged");
            self.changes.entry(location).or_default().insert(path, blob);
            return Ok(None);
        }

        let mut changes = StagedChanges::new();
        changes.insert(path, blob);
        self.engine
            .commit(&location, &changes, &self.attribution())
    }

    /// Commit everything staged, one revision per repository.
    ///
    /// Repositories are committed in location order. A failure does not
    /// stop the remaining commits. The session is cleared and deactivated
    /// whatever the outcome. Finishing an inactive session commits nothing.
    ///
    /// # Errors
    ///
    /// [`FinishError`] if any repository failed; it also carries the
    /// revisions that did get committed.
    pub fn finish(&mut self) -> Result<BTreeMap<RepositoryLocation, Revision>, FinishError> {
        if !self.active {
            return Ok(BTreeMap::new());
        }

        let attribution = self.attribution();
        let changes = std::mem::take(&mut self.changes);
        self.reset();

        let mut committed = BTreeMap::new();
        let mut failed = BTreeMap::new();
        for (location, staged) in changes {
            match self.engine.commit(&location, &staged, &attribution) {
                Ok(Some(revision)) => {
                    committed.insert(location, revision);
                }
                Ok(None) => {}
                Err(e) => {
                    failed.insert(location, e);
                }
            }
        }

        tracing::debug!(
            committed = committed.len(),
            failed = failed.len(),
            "session finished"
        );

        if failed.is_empty() {
            Ok(committed)
        } else {
            Err(FinishError { committed, failed })
        }
    }

    /// Drop all staged changes and attribution, and deactivate.
    pub fn reset(&mut self) {
        self.active = false;
        self.changes.clear();
        self.user = None;
        self.message = None;
    }

    /// The attributed user, falling back to the configured default.
    pub fn user(&self) -> &str {
        self.user.as_deref().unwrap_or(&self.default_user)
    }

    /// Set the attributed user. An empty string clears it.
    pub fn set_user(&mut self, user: impl Into<String>) {
        self.user = non_empty(user.into());
    }

    /// The commit message, falling back to the configured default.
    pub fn message(&self) -> &str {
        self.message.as_deref().unwrap_or(&self.default_message)
    }

    /// Set the commit message. An empty string clears it.
    pub fn set_message(&mut self, message: impl Into<String>) {
        self.message = non_empty(message.into());
    }

    /// Number of object paths staged across all repositories.
    pub fn staged_len(&self) -> usize {
        self.changes.values().map(BTreeMap::len).sum()
    }

    /// Number of repositories with staged changes.
    pub fn staged_repositories(&self) -> usize {
        self.changes.len()
    }

    /// The attribution the next commit would carry.
    pub fn attribution(&self) -> Attribution {
        Attribution::new(self.user(), self.message())
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}
