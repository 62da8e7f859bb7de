//! engine::history
//!
//! Retrieval of historical snapshots, per-object revision history, and
//! diffs between points in an object's history.
//!
//! # Reads
//!
//! Readers take no lock. The engine advances the tip atomically, so a
//! read concurrent with a commit sees either the old or the new tip,
//! never a partial revision.
//!
//! # Example
//!
//! ```ignore
//! let reader = HistoryReader::new(resolver, repositories);
//!
//! let current = reader.get(&class, &id, TIP)?;
//! for record in reader.history(&class, &id).iter()? {
//!     let record = record?;
//!     println!("{} {} {}", record.revision.short(8), record.user, record.message);
//! }
//! let changes = reader.diff(&class, &id, "abc123", DiffTarget::Live(&current))?;
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::core::paths::PathResolver;
use crate::core::snapshot::Snapshot;
use crate::core::types::{ClassId, ObjectId, ObjectPath, RepositoryLocation, Revision};
use crate::engine::diff::diff_snapshots;
use crate::engine::error::VersionError;
use crate::engine::repository::RepositoryHandle;
use crate::git::{CommitInfo, Git};

/// Revision name for the current head of a repository.
pub const TIP: &str = "tip";

/// Label used for the live side of a diff.
pub const LIVE_LABEL: &str = "live";

/// One revision in an object's history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevisionRecord {
    /// The revision id
    pub revision: Revision,
    /// Attributed author name
    pub user: String,
    /// Attributed author email
    pub email: String,
    /// Commit message
    pub message: String,
    /// When the revision was committed
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl From<CommitInfo> for RevisionRecord {
    fn from(info: CommitInfo) -> Self {
        Self {
            revision: info.revision,
            user: info.author_name,
            email: info.author_email,
            message: info.message,
            timestamp: info.author_time,
        }
    }
}

/// What the historical side of a diff is compared against.
#[derive(Debug, Clone, Copy)]
pub enum DiffTarget<'a> {
    /// Another stored revision.
    Revision(&'a str),
    /// The current, not yet committed state of the object.
    Live(&'a Snapshot),
}

/// Reads stored snapshots and history.
#[derive(Debug, Clone)]
pub struct HistoryReader {
    resolver: PathResolver,
    repositories: Arc<RepositoryHandle>,
}

impl HistoryReader {
    /// Create a reader.
    pub fn new(resolver: PathResolver, repositories: Arc<RepositoryHandle>) -> Self {
        Self {
            resolver,
            repositories,
        }
    }

    /// The snapshot of `id` stored at `rev`.
    ///
    /// `rev` may be [`TIP`], a full or abbreviated revision id, or any other
    /// expression the engine resolves to a commit.
    ///
    /// The repository is opened through [`RepositoryHandle`], so reading a
    /// class that was never written creates its empty repository.
    ///
    /// # Errors
    ///
    /// - [`VersionError::VersionNotFound`] if `rev` is empty or unknown, or the
    ///   object has no content at that revision
    /// - [`VersionError::CorruptSnapshot`] if the stored blob does not parse
    pub fn get(&self, class: &ClassId, id: &ObjectId, rev: &str) -> Result<Snapshot, VersionError> {
        let location = self.resolver.repository_location(class);
        let path = self.resolver.object_path(class, id);
        let not_found = || VersionError::VersionNotFound {
            revision: rev.to_string(),
            path: path.to_string(),
            location: location.clone(),
        };

        if rev.trim().is_empty() {
            return Err(not_found());
        }

        let git = self.repositories.open(&location)?;
        let spec = if rev == TIP { "HEAD" } else { rev };

        let revision = git
            .resolve(spec)
            .map_err(|e| VersionError::read_failed(&location, e))?
            .ok_or_else(not_found)?;
        let bytes = git
            .read_blob_at(&revision, &path)
            .map_err(|e| VersionError::read_failed(&location, e))?
            .ok_or_else(not_found)?;

        Snapshot::from_bytes(&bytes).map_err(|e| VersionError::CorruptSnapshot {
            path: path.to_string(),
            message: e.to_string(),
        })
    }

    /// The revisions that changed `id`, newest first.
    ///
    /// The returned [`History`] walks the repository afresh on every
    /// [`History::iter`] call.
    pub fn history(&self, class: &ClassId, id: &ObjectId) -> History {
        History {
            repositories: Arc::clone(&self.repositories),
            location: self.resolver.repository_location(class),
            path: self.resolver.object_path(class, id),
        }
    }

    /// Per-field unified diffs from `rev_a` to `target`.
    ///
    /// Every key in either snapshot's fields gets an entry; a field missing
    /// on one side is diffed against empty text.
    ///
    /// # Errors
    ///
    /// Fails as [`HistoryReader::get`] does for either stored side.
    pub fn diff(
        &self,
        class: &ClassId,
        id: &ObjectId,
        rev_a: &str,
        target: DiffTarget<'_>,
    ) -> Result<BTreeMap<String, String>, VersionError> {
        let before = self.get(class, id, rev_a)?;

        let diff = match target {
            DiffTarget::Revision(rev_b) => {
                let after = self.get(class, id, rev_b)?;
                diff_snapshots(&before, &after, rev_a, rev_b)
            }
            DiffTarget::Live(after) => diff_snapshots(&before, after, rev_a, LIVE_LABEL),
        };
        Ok(diff)
    }
}

/// Re-iterable history of one object path.
#[derive(Debug, Clone)]
pub struct History {
    repositories: Arc<RepositoryHandle>,
    location: RepositoryLocation,
    path: ObjectPath,
}

impl History {
    /// Start a fresh walk from the current tip.
    ///
    /// # Errors
    ///
    /// - [`VersionError::RepositoryUnavailable`] if the repository cannot be opened
    pub fn iter(&self) -> Result<HistoryIter, VersionError> {
        let git = self.repositories.open(&self.location)?;
        let next = git
            .tip()
            .map_err(|e| VersionError::read_failed(&self.location, e))?;

        Ok(HistoryIter {
            git,
            next,
            location: self.location.clone(),
            path: self.path.clone(),
        })
    }

    /// Collect every record of a fresh walk.
    pub fn records(&self) -> Result<Vec<RevisionRecord>, VersionError> {
        self.iter()?.collect()
    }

    /// Number of revisions that changed the object.
    pub fn count(&self) -> Result<usize, VersionError> {
        let mut count = 0;
        for record in self.iter()? {
            record?;
            count += 1;
        }
        Ok(count)
    }

    /// The object path this history is restricted to.
    pub fn path(&self) -> &ObjectPath {
        &self.path
    }

    /// The repository being walked.
    pub fn location(&self) -> &RepositoryLocation {
        &self.location
    }
}

/// One walk over an object's history, newest first.
///
/// Owns its repository handle. Yields an error at most once, then stops.
#[derive(Debug)]
pub struct HistoryIter {
    git: Git,
    next: Option<Revision>,
    location: RepositoryLocation,
    path: ObjectPath,
}

impl HistoryIter {
    /// Advance one commit; `Ok(None)` means "this commit did not touch the path".
    fn step(&mut self, current: Revision) -> Result<Option<RevisionRecord>, VersionError> {
        let read = |e| VersionError::read_failed(&self.location, e);

        self.next = self.git.first_parent(&current).map_err(read)?;
        if !self.git.touches_path(&current, &self.path).map_err(read)? {
            return Ok(None);
        }
        let info = self.git.commit_info(&current).map_err(read)?;
        Ok(Some(info.into()))
    }
}

impl Iterator for HistoryIter {
    type Item = Result<RevisionRecord, VersionError>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(current) = self.next.take() {
            match self.step(current) {
                Ok(Some(record)) => return Some(Ok(record)),
                Ok(None) => continue,
                Err(e) => {
                    self.next = None;
                    return Some(Err(e));
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::Config;
    use crate::engine::commit::{Attribution, CommitEngine};
    use serde_json::json;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        resolver: PathResolver,
        engine: CommitEngine,
        reader: HistoryReader,
        class: ClassId,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let config = Config::new(dir.path());
            let repositories = Arc::new(RepositoryHandle::new());
            let resolver = PathResolver::new(dir.path());
            Self {
                engine: CommitEngine::new(Arc::clone(&repositories), &config),
                reader: HistoryReader::new(resolver.clone(), repositories),
                resolver,
                class: ClassId::new("shop", "Order").unwrap(),
                _dir: dir,
            }
        }

        fn commit(&self, items: &[(&ObjectId, &Snapshot)], message: &str) -> Revision {
            let location = self.resolver.repository_location(&self.class);
            let changes = items
                .iter()
                .map(|(id, snap)| {
                    (
                        self.resolver.object_path(&self.class, id),
                        snap.to_bytes().unwrap(),
                    )
                })
                .collect();
            self.engine
                .commit(&location, &changes, &Attribution::new("alice", message))
                .unwrap()
                .unwrap()
        }
    }

    fn status(value: &str) -> Snapshot {
        Snapshot::new().with_field("status", json!(value))
    }

    mod get {
        use super::*;

        #[test]
        fn tip_and_explicit_revisions() {
            let fx = Fixture::new();
            let id = ObjectId::from(1);
            let first = fx.commit(&[(&id, &status("open"))], "open");
            fx.commit(&[(&id, &status("paid"))], "pay");

            assert_eq!(fx.reader.get(&fx.class, &id, TIP).unwrap(), status("paid"));
            assert_eq!(
                fx.reader.get(&fx.class, &id, first.as_str()).unwrap(),
                status("open")
            );
            assert_eq!(
                fx.reader.get(&fx.class, &id, first.short(10)).unwrap(),
                status("open")
            );
        }

        #[test]
        fn empty_repository_has_no_tip() {
            let fx = Fixture::new();
            let err = fx.reader.get(&fx.class, &ObjectId::from(1), TIP).unwrap_err();
            assert!(err.is_not_found());
        }

        #[test]
        fn empty_and_unknown_revisions_are_not_found() {
            let fx = Fixture::new();
            let id = ObjectId::from(1);
            fx.commit(&[(&id, &status("open"))], "open");

            for rev in ["", "   ", "deadbeefdeadbeefdeadbeefdeadbeefdeadbeef", "no-such-ref"] {
                let err = fx.reader.get(&fx.class, &id, rev).unwrap_err();
                assert!(err.is_not_found(), "{rev:?}: {err}");
            }
        }

        #[test]
        fn object_absent_at_revision_is_not_found() {
            let fx = Fixture::new();
            let one = ObjectId::from(1);
            let two = ObjectId::from(2);
            let first = fx.commit(&[(&one, &status("open"))], "one");
            fx.commit(&[(&two, &status("open"))], "two");

            let err = fx
                .reader
                .get(&fx.class, &two, first.as_str())
                .unwrap_err();
            assert!(matches!(err, VersionError::VersionNotFound { .. }));
            assert!(fx.reader.get(&fx.class, &two, TIP).is_ok());
        }

        #[test]
        fn unparseable_blob_is_corrupt() {
            let fx = Fixture::new();
            let id = ObjectId::from(9);
            let location = fx.resolver.repository_location(&fx.class);
            let mut changes = BTreeMap::new();
            changes.insert(fx.resolver.object_path(&fx.class, &id), b"not json".to_vec());
            fx.engine
                .commit(&location, &changes, &Attribution::new("alice", "bad"))
                .unwrap();

            let err = fx.reader.get(&fx.class, &id, TIP).unwrap_err();
            assert!(matches!(err, VersionError::CorruptSnapshot { .. }));
        }
    }

    mod history {
        use super::*;

        #[test]
        fn only_touching_revisions_newest_first() {
            let fx = Fixture::new();
            let one = ObjectId::from(1);
            let two = ObjectId::from(2);
            let r1 = fx.commit(&[(&one, &status("open"))], "first");
            fx.commit(&[(&two, &status("open"))], "other object");
            let r3 = fx.commit(&[(&one, &status("paid"))], "third");

            let records = fx.reader.history(&fx.class, &one).records().unwrap();
            let revisions: Vec<_> = records.iter().map(|r| r.revision.clone()).collect();
            assert_eq!(revisions, vec![r3, r1]);
            assert_eq!(records[0].message, "third");
            assert_eq!(records[0].user, "alice");
        }

        #[test]
        fn identical_recommit_is_not_a_change() {
            let fx = Fixture::new();
            let id = ObjectId::from(1);
            fx.commit(&[(&id, &status("open"))], "first");
            fx.commit(&[(&id, &status("open"))], "same again");

            assert_eq!(fx.reader.history(&fx.class, &id).count().unwrap(), 1);
        }

        #[test]
        fn history_is_reiterable_and_sees_new_commits() {
            let fx = Fixture::new();
            let id = ObjectId::from(1);
            fx.commit(&[(&id, &status("open"))], "first");

            let history = fx.reader.history(&fx.class, &id);
            assert_eq!(history.count().unwrap(), 1);
            assert_eq!(history.count().unwrap(), 1);

            fx.commit(&[(&id, &status("paid"))], "second");
            assert_eq!(history.count().unwrap(), 2);
        }

        #[test]
        fn unknown_object_has_empty_history() {
            let fx = Fixture::new();
            fx.commit(&[(&ObjectId::from(1), &status("open"))], "first");

            let history = fx.reader.history(&fx.class, &ObjectId::from(77));
            assert!(history.iter().unwrap().next().is_none());
        }
    }

    mod diff {
        use super::*;

        #[test]
        fn between_two_revisions() {
            let fx = Fixture::new();
            let id = ObjectId::from(1);
            let a = fx.commit(&[(&id, &status("open"))], "a");
            let b = fx.commit(&[(&id, &status("paid"))], "b");

            let diff = fx
                .reader
                .diff(&fx.class, &id, a.as_str(), DiffTarget::Revision(b.as_str()))
                .unwrap();
            let text = &diff["status"];
            assert!(text.contains(&format!("--- {}", a)));
            assert!(text.contains("-open"));
            assert!(text.contains("+paid"));
        }

        #[test]
        fn against_live_state() {
            let fx = Fixture::new();
            let id = ObjectId::from(1);
            let a = fx.commit(&[(&id, &status("open"))], "a");

            let live = status("open").with_field("total", json!(12));
            let diff = fx
                .reader
                .diff(&fx.class, &id, a.as_str(), DiffTarget::Live(&live))
                .unwrap();

            assert_eq!(diff["status"], "");
            assert!(diff["total"].contains("+++ live"));
            assert!(diff["total"].contains("+12"));
        }

        #[test]
        fn missing_revision_propagates_not_found() {
            let fx = Fixture::new();
            let id = ObjectId::from(1);
            let a = fx.commit(&[(&id, &status("open"))], "a");

            let err = fx
                .reader
                .diff(&fx.class, &id, a.as_str(), DiffTarget::Revision("nope"))
                .unwrap_err();
            assert!(err.is_not_found());
        }
    }
}
