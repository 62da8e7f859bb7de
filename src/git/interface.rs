//! git::interface
//!
//! Repository engine implementation using git2.
//!
//! This module provides the **single doorway** to the revision-control
//! engine. All repository interactions flow through this interface, which
//! provides structured results and normalizes errors into typed failure
//! categories.
//!
//! # Repository Shape
//!
//! Class repositories are bare: there is no working directory, no on-disk
//! index, and nothing to diff against. Revisions are built directly from
//! an explicit set of (path, content) pairs layered on top of the tip tree.
//!
//! # Error Handling
//!
//! Git errors are categorized into typed variants:
//! - [`GitError::NotARepo`]: Path exists but holds no repository
//! - [`GitError::InitFailed`]: Repository could not be created
//! - [`GitError::ObjectNotFound`]: Requested commit does not exist
//! - [`GitError::TipMoved`]: The tip changed underneath a commit
//!
//! # Example
//!
//! ```ignore
//! use chronicle::git::{Author, Git};
//!
//! let git = Git::init(Path::new("/data/shop.models/order"))?;
//! let rev = git.commit_paths(&entries, &Author::new("alice", "alice@example.com"), "edit")?;
//! let bytes = git.read_blob_at(&rev, &path)?;
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::core::config::{DEFAULT_AUTHOR_EMAIL, DEFAULT_USER};
use crate::core::types::{ObjectPath, Revision, TypeError};

/// File mode for every stored blob (regular, non-executable).
const BLOB_MODE: u32 = 0o100644;

/// Errors from repository engine operations.
#[derive(Debug, Error)]
pub enum GitError {
    /// Path exists but is not a repository.
    #[error("not a git repository: {path}")]
    NotARepo {
        /// The path that was opened
        path: PathBuf,
    },

    /// Repository initialization failed.
    #[error("failed to initialize repository at {path}: {message}")]
    InitFailed {
        /// The path being initialized
        path: PathBuf,
        /// Description of the failure
        message: String,
    },

    /// Object not found in repository.
    #[error("object not found: {oid}")]
    ObjectNotFound {
        /// The OID that was not found
        oid: String,
    },

    /// The tip is no longer the parent the new revision was built on.
    #[error("tip moved during commit: {message}")]
    TipMoved {
        /// The engine's description
        message: String,
    },

    /// Invalid object id format.
    #[error("invalid object id: {oid}")]
    InvalidOid {
        /// The invalid OID string
        oid: String,
    },

    /// Permission or filesystem error.
    #[error("repository access error: {message}")]
    AccessError {
        /// Description of the error
        message: String,
    },

    /// Internal git2 error.
    #[error("git error: {message}")]
    Internal {
        /// The error message
        message: String,
    },
}

impl GitError {
    /// Create a GitError from a git2::Error with richer context.
    fn from_git2(err: git2::Error, context: &str) -> Self {
        match err.code() {
            git2::ErrorCode::NotFound => GitError::ObjectNotFound {
                oid: context.to_string(),
            },
            git2::ErrorCode::InvalidSpec => GitError::InvalidOid {
                oid: context.to_string(),
            },
            git2::ErrorCode::Modified => GitError::TipMoved {
                message: err.message().to_string(),
            },
            git2::ErrorCode::Locked => GitError::AccessError {
                message: format!("repository is locked: {}", err.message()),
            },
            _ => GitError::Internal {
                message: format!("{}: {}", context, err.message()),
            },
        }
    }
}

impl From<git2::Error> for GitError {
    fn from(err: git2::Error) -> Self {
        GitError::Internal {
            message: err.message().to_string(),
        }
    }
}

impl From<TypeError> for GitError {
    fn from(err: TypeError) -> Self {
        GitError::InvalidOid {
            oid: err.to_string(),
        }
    }
}

/// Identity recorded as author and committer of a revision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Author {
    /// Display name
    pub name: String,
    /// Email address
    pub email: String,
}

impl Author {
    /// Create an author from explicit parts.
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }

    /// Parse `Name <email>` into a signature git will accept.
    ///
    /// A bare user string is taken as the name and paired with
    /// `default_email`. Both parts are cleaned of angle brackets, control
    /// characters, and the leading or trailing punctuation git strips from
    /// signatures. A part left empty falls back to `default_name` or
    /// `default_email`, then to the built-in defaults.
    ///
    /// # Example
    ///
    /// ```
    /// use chronicle::git::Author;
    ///
    /// let author = Author::parse("Ada Lovelace <ada@example.com>", "Anonymous", "x@localhost");
    /// assert_eq!(author.name, "Ada Lovelace");
    /// assert_eq!(author.email, "ada@example.com");
    ///
    /// let author = Author::parse("Grace", "Anonymous", "x@localhost");
    /// assert_eq!(author.email, "x@localhost");
    ///
    /// let author = Author::parse("<>", "Anonymous", "x@localhost");
    /// assert_eq!(author, Author::new("Anonymous", "x@localhost"));
    /// ```
    pub fn parse(user: &str, default_name: &str, default_email: &str) -> Self {
        let trimmed = user.trim_end();
        let (name, email) = match trimmed.find('<') {
            Some(open) if trimmed.ends_with('>') => {
                (&trimmed[..open], &trimmed[open + 1..trimmed.len() - 1])
            }
            _ => (trimmed, ""),
        };

        let name = clean_signature_part(name)
            .or_else(|| clean_signature_part(default_name))
            .unwrap_or_else(|| DEFAULT_USER.to_string());
        let email = clean_signature_part(email)
            .or_else(|| clean_signature_part(default_email))
            .unwrap_or_else(|| DEFAULT_AUTHOR_EMAIL.to_string());
        Self::new(name, email)
    }
}

/// Remove what git refuses or trims in a signature part; `None` if nothing is left.
fn clean_signature_part(raw: &str) -> Option<String> {
    let kept: String = raw
        .chars()
        .filter(|c| !matches!(c, '<' | '>') && !c.is_control())
        .collect();
    let cleaned = kept.trim_matches(|c: char| {
        c.is_whitespace() || matches!(c, '.' | ',' | ':' | ';' | '"' | '\\' | '\'')
    });
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.to_string())
    }
}

/// Information about a commit.
#[derive(Debug, Clone)]
pub struct CommitInfo {
    /// The commit id
    pub revision: Revision,
    /// Full commit message
    pub message: String,
    /// Author name
    pub author_name: String,
    /// Author email
    pub author_email: String,
    /// Author timestamp
    pub author_time: chrono::DateTime<chrono::Utc>,
}

/// The repository engine interface.
///
/// This is the **single point of interaction** with git. No other module
/// imports `git2` directly.
///
/// A `Git` handle is `Send` but not `Sync`; open one per thread.
pub struct Git {
    /// The underlying git2 repository
    repo: git2::Repository,
}

impl std::fmt::Debug for Git {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Git")
            .field("path", &self.repo.path())
            .finish()
    }
}

impl Git {
    // =========================================================================
    // Repository Opening
    // =========================================================================

    /// Open the repository rooted exactly at `path`.
    ///
    /// Parent directories are never searched, so a class repository nested
    /// under some unrelated checkout is not mistaken for it.
    ///
    /// # Errors
    ///
    /// - [`GitError::NotARepo`] if `path` holds no repository
    pub fn open(path: &Path) -> Result<Self, GitError> {
        let repo = git2::Repository::open_ext(
            path,
            git2::RepositoryOpenFlags::NO_SEARCH,
            std::iter::empty::<&std::ffi::OsStr>(),
        )
        .map_err(|e| match e.code() {
            git2::ErrorCode::NotFound => GitError::NotARepo {
                path: path.to_path_buf(),
            },
            _ => GitError::AccessError {
                message: format!("{}: {}", path.display(), e.message()),
            },
        })?;

        Ok(Self { repo })
    }

    /// Initialize a bare repository at `path`.
    ///
    /// Re-initializing an existing repository leaves its history intact.
    ///
    /// # Errors
    ///
    /// - [`GitError::InitFailed`] if the repository cannot be created
    pub fn init(path: &Path) -> Result<Self, GitError> {
        let repo = git2::Repository::init_bare(path).map_err(|e| GitError::InitFailed {
            path: path.to_path_buf(),
            message: e.message().to_string(),
        })?;

        Ok(Self { repo })
    }

    /// Path to the repository directory.
    pub fn path(&self) -> &Path {
        self.repo.path()
    }

    // =========================================================================
    // Revision Resolution
    // =========================================================================

    /// The current tip, or `None` for a repository with no commits yet.
    pub fn tip(&self) -> Result<Option<Revision>, GitError> {
        match self.repo.head() {
            Ok(head) => {
                let commit = head
                    .peel_to_commit()
                    .map_err(|e| GitError::from_git2(e, "HEAD"))?;
                Ok(Some(Revision::new(commit.id().to_string())?))
            }
            Err(e)
                if e.code() == git2::ErrorCode::UnbornBranch
                    || e.code() == git2::ErrorCode::NotFound =>
            {
                Ok(None)
            }
            Err(e) => Err(GitError::from_git2(e, "HEAD")),
        }
    }

    /// Resolve a revision expression (full or abbreviated hex, `HEAD`) to
    /// a commit.
    ///
    /// Returns `None` if nothing matches, the match is ambiguous, or the
    /// match is not a commit.
    pub fn resolve(&self, spec: &str) -> Result<Option<Revision>, GitError> {
        let object = match self.repo.revparse_single(spec) {
            Ok(object) => object,
            Err(e) if Self::is_unresolvable(&e) => return Ok(None),
            Err(e) => return Err(GitError::from_git2(e, spec)),
        };

        match object.peel_to_commit() {
            Ok(commit) => Ok(Some(Revision::new(commit.id().to_string())?)),
            Err(e) if Self::is_unresolvable(&e) => Ok(None),
            Err(e) => Err(GitError::from_git2(e, spec)),
        }
    }

    fn is_unresolvable(err: &git2::Error) -> bool {
        matches!(
            err.code(),
            git2::ErrorCode::NotFound
                | git2::ErrorCode::InvalidSpec
                | git2::ErrorCode::Ambiguous
                | git2::ErrorCode::UnbornBranch
                | git2::ErrorCode::Peel
        )
    }

    fn find_commit(&self, rev: &Revision) -> Result<git2::Commit<'_>, GitError> {
        let oid =
            git2::Oid::from_str(rev.as_str()).map_err(|e| GitError::from_git2(e, rev.as_str()))?;
        self.repo
            .find_commit(oid)
            .map_err(|e| GitError::from_git2(e, rev.as_str()))
    }

    // =========================================================================
    // Revision Construction
    // =========================================================================

    /// Build and finalize one revision on top of the tip.
    ///
    /// The new tree is the tip tree with every path in `entries` replaced
    /// (or added) with exactly the given content. Paths not listed are
    /// carried over unchanged; nothing is deleted. `HEAD` is advanced to
    /// the new commit.
    ///
    /// Callers must hold the repository's commit lock.
    ///
    /// # Errors
    ///
    /// - [`GitError::TipMoved`] if another writer advanced the tip first
    pub fn commit_paths(
        &self,
        entries: &BTreeMap<ObjectPath, Vec<u8>>,
        author: &Author,
        message: &str,
    ) -> Result<Revision, GitError> {
        let parent = match self.tip()? {
            Some(rev) => Some(self.find_commit(&rev)?),
            None => None,
        };

        let mut index = git2::Index::new()?;
        if let Some(parent) = &parent {
            let tree = parent
                .tree()
                .map_err(|e| GitError::from_git2(e, "parent tree"))?;
            index.read_tree(&tree)?;
        }

        for (path, content) in entries {
            let blob = self.repo.blob(content)?;
            index.add(&Self::index_entry(path, blob, content.len()))?;
        }

        let tree_oid = index.write_tree_to(&self.repo)?;
        let tree = self
            .repo
            .find_tree(tree_oid)
            .map_err(|e| GitError::from_git2(e, &tree_oid.to_string()))?;

        let signature = git2::Signature::now(&author.name, &author.email)?;
        let parents: Vec<&git2::Commit<'_>> = parent.iter().collect();
        let oid = self
            .repo
            .commit(
                Some("HEAD"),
                &signature,
                &signature,
                message,
                &tree,
                &parents,
            )
            .map_err(|e| GitError::from_git2(e, "HEAD"))?;

        Ok(Revision::new(oid.to_string())?)
    }

    fn index_entry(path: &ObjectPath, blob: git2::Oid, len: usize) -> git2::IndexEntry {
        git2::IndexEntry {
            ctime: git2::IndexTime::new(0, 0),
            mtime: git2::IndexTime::new(0, 0),
            dev: 0,
            ino: 0,
            mode: BLOB_MODE,
            uid: 0,
            gid: 0,
            file_size: u32::try_from(len).unwrap_or(u32::MAX),
            id: blob,
            flags: 0,
            flags_extended: 0,
            path: path.as_str().as_bytes().to_vec(),
        }
    }

    // =========================================================================
    // Blob Retrieval
    // =========================================================================

    /// Read the content stored at `path` in revision `rev`.
    ///
    /// Returns `None` if the path does not exist in that revision.
    ///
    /// # Errors
    ///
    /// - [`GitError::ObjectNotFound`] if `rev` is not a commit in this repository
    pub fn read_blob_at(
        &self,
        rev: &Revision,
        path: &ObjectPath,
    ) -> Result<Option<Vec<u8>>, GitError> {
        let Some(blob) = self.path_blob_id(rev, path)? else {
            return Ok(None);
        };

        let blob = self
            .repo
            .find_blob(blob)
            .map_err(|e| GitError::from_git2(e, &blob.to_string()))?;
        Ok(Some(blob.content().to_vec()))
    }

    /// Blob id at `path` in `rev`, ignoring anything that is not a blob.
    fn path_blob_id(
        &self,
        rev: &Revision,
        path: &ObjectPath,
    ) -> Result<Option<git2::Oid>, GitError> {
        let commit = self.find_commit(rev)?;
        let tree = commit
            .tree()
            .map_err(|e| GitError::from_git2(e, rev.as_str()))?;

        match tree.get_path(Path::new(path.as_str())) {
            Ok(entry) if entry.kind() == Some(git2::ObjectType::Blob) => Ok(Some(entry.id())),
            Ok(_) => Ok(None),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(None),
            Err(e) => Err(GitError::from_git2(e, path.as_str())),
        }
    }

    // =========================================================================
    // History
    // =========================================================================

    /// Get information about a commit.
    ///
    /// # Errors
    ///
    /// - [`GitError::ObjectNotFound`] if the commit doesn't exist
    pub fn commit_info(&self, rev: &Revision) -> Result<CommitInfo, GitError> {
        let commit = self.find_commit(rev)?;

        let author = commit.author();
        let author_time = chrono::DateTime::from_timestamp(author.when().seconds(), 0)
            .unwrap_or(chrono::DateTime::UNIX_EPOCH)
            .with_timezone(&chrono::Utc);

        Ok(CommitInfo {
            revision: rev.clone(),
            message: commit.message().unwrap_or("").to_string(),
            author_name: author.name().unwrap_or("").to_string(),
            author_email: author.email().unwrap_or("").to_string(),
            author_time,
        })
    }

    /// The first parent of a commit, or `None` for a root commit.
    pub fn first_parent(&self, rev: &Revision) -> Result<Option<Revision>, GitError> {
        let commit = self.find_commit(rev)?;
        match commit.parent_id(0) {
            Ok(oid) => Ok(Some(Revision::new(oid.to_string())?)),
            Err(_) => Ok(None),
        }
    }

    /// Whether `rev` changed the content at `path` relative to its first
    /// parent. Adding and removing the path both count as changes.
    pub fn touches_path(&self, rev: &Revision, path: &ObjectPath) -> Result<bool, GitError> {
        let here = self.path_blob_id(rev, path)?;
        let before = match self.first_parent(rev)? {
            Some(parent) => self.path_blob_id(&parent, path)?,
            None => None,
        };
        Ok(here != before)
    }
}
