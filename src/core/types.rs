//! core::types
//!
//! Strong types for core domain concepts.
//!
//! # Types
//!
//! - [`ClassId`] - Identity of a versioned class (module path + class name)
//! - [`ObjectId`] - Identifier of one instance within its class
//! - [`ObjectPath`] - Key addressing one object's blob inside a repository
//! - [`RepositoryLocation`] - Filesystem location of a class's repository
//! - [`Revision`] - Content-derived identifier of one committed changeset
//!
//! # Validation
//!
//! These types enforce validity at construction time. Invalid values
//! cannot be represented, so path derivation downstream never has to
//! second-guess its inputs.
//!
//! # Examples
//!
//! ```
//! use chronicle::core::types::{ClassId, ObjectId, Revision};
//!
//! let class = ClassId::new("shop.models", "Order").unwrap();
//! let id = ObjectId::new("42").unwrap();
//! let rev = Revision::new("ABC123DEF4567890ABC123DEF4567890ABC12345").unwrap();
//!
//! assert_eq!(class.module(), "shop.models");
//! assert_eq!(id.as_str(), "42");
//! assert_eq!(rev.short(7), "abc123d");
//!
//! assert!(ClassId::new("shop..models", "Order").is_err());
//! assert!(ObjectId::new("a/b").is_err());
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid class identity: {0}")]
    InvalidClass(String),

    #[error("invalid object id: {0}")]
    InvalidObjectId(String),

    #[error("invalid revision: {0}")]
    InvalidRevision(String),
}

/// Identity of a versioned class.
///
/// A class is named by a dot-separated module path (`shop.models`) and a
/// class name (`Order`). Every segment must be non-empty and consist of
/// ASCII alphanumerics or `_`.
///
/// # Example
///
/// ```
/// use chronicle::core::types::ClassId;
///
/// let class = ClassId::new("shop.models", "Order").unwrap();
/// assert_eq!(class.to_string(), "shop.models.Order");
///
/// assert!(ClassId::new("", "Order").is_err());
/// assert!(ClassId::new("shop.models", "Or-der").is_err());
/// assert!(ClassId::new("shop.models.", "Order").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ClassId {
    module: String,
    name: String,
}

impl ClassId {
    /// Create a new validated class identity.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidClass` if the module path or class name
    /// is empty or contains characters outside `[A-Za-z0-9_]`.
    pub fn new(module: impl Into<String>, name: impl Into<String>) -> Result<Self, TypeError> {
        let module = module.into();
        let name = name.into();

        if module.is_empty() {
            return Err(TypeError::InvalidClass("module path cannot be empty".into()));
        }
        for segment in module.split('.') {
            if !Self::is_identifier(segment) {
                return Err(TypeError::InvalidClass(format!(
                    "invalid module segment '{segment}' in '{module}'"
                )));
            }
        }
        if !Self::is_identifier(&name) {
            return Err(TypeError::InvalidClass(format!(
                "invalid class name '{name}'"
            )));
        }

        Ok(Self { module, name })
    }

    fn is_identifier(s: &str) -> bool {
        !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
    }

    /// The dot-separated module path.
    pub fn module(&self) -> &str {
        &self.module
    }

    /// The class name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Display for ClassId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.module, self.name)
    }
}

impl std::str::FromStr for ClassId {
    type Err = TypeError;

    /// Parse the dotted form, splitting the class name off the last dot.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (module, name) = s
            .rsplit_once('.')
            .ok_or_else(|| TypeError::InvalidClass(format!("'{s}' has no module path")))?;
        Self::new(module, name)
    }
}

impl TryFrom<String> for ClassId {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<ClassId> for String {
    fn from(class: ClassId) -> Self {
        class.to_string()
    }
}

/// Identifier of one object within its class.
///
/// Object ids become the last component of an [`ObjectPath`], so they
/// cannot contain path separators, control characters, or be `.`/`..`.
///
/// # Example
///
/// ```
/// use chronicle::core::types::ObjectId;
///
/// assert!(ObjectId::new("42").is_ok());
/// assert!(ObjectId::new("Order-2024-A").is_ok());
///
/// assert!(ObjectId::new("").is_err());
/// assert!(ObjectId::new("..").is_err());
/// assert!(ObjectId::new("a/b").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ObjectId(String);

impl ObjectId {
    /// Create a new validated object id.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidObjectId` if the id cannot be used as a
    /// single path component.
    pub fn new(id: impl Into<String>) -> Result<Self, TypeError> {
        let id = id.into();
        Self::validate(&id)?;
        Ok(Self(id))
    }

    fn validate(id: &str) -> Result<(), TypeError> {
        if id.is_empty() {
            return Err(TypeError::InvalidObjectId("object id cannot be empty".into()));
        }
        if id == "." || id == ".." || id.eq_ignore_ascii_case(".git") {
            return Err(TypeError::InvalidObjectId(format!(
                "object id cannot be '{id}'"
            )));
        }
        if id.contains('/') || id.contains('\\') {
            return Err(TypeError::InvalidObjectId(
                "object id cannot contain path separators".into(),
            ));
        }
        if id.chars().any(|c| c.is_control()) {
            return Err(TypeError::InvalidObjectId(
                "object id cannot contain control characters".into(),
            ));
        }
        Ok(())
    }

    /// Get the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ObjectId {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<ObjectId> for String {
    fn from(id: ObjectId) -> Self {
        id.0
    }
}

impl From<u64> for ObjectId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl AsRef<str> for ObjectId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Key addressing one object's blob within its class repository.
///
/// Always `/`-separated regardless of platform. Only constructed by
/// [`PathResolver`](crate::core::paths::PathResolver).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectPath(String);

impl ObjectPath {
    pub(crate) fn from_parts(module: &str, class: &str, id: &ObjectId) -> Self {
        Self(format!(
            "{}/{}/{}",
            module.to_lowercase(),
            class.to_lowercase(),
            id.as_str()
        ))
    }

    /// Get the path as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ObjectPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ObjectPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Filesystem location of the repository holding one class's history.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RepositoryLocation(PathBuf);

impl RepositoryLocation {
    /// Wrap an explicit directory as a repository location.
    ///
    /// Normally locations come from
    /// [`PathResolver::repository_location`](crate::core::paths::PathResolver::repository_location).
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    /// Get the location as a path.
    pub fn as_path(&self) -> &Path {
        &self.0
    }
}

impl AsRef<Path> for RepositoryLocation {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl std::fmt::Display for RepositoryLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

/// A committed revision identifier (SHA-1 or SHA-256 hex).
///
/// Revisions are normalized to lowercase.
///
/// # Example
///
/// ```
/// use chronicle::core::types::Revision;
///
/// let rev = Revision::new("abc123def4567890abc123def4567890abc12345").unwrap();
/// assert_eq!(rev.short(4), "abc1");
/// assert!(Revision::new("tip").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Revision(String);

impl Revision {
    /// Create a new validated revision.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidRevision` if the string is not a full hex
    /// commit id.
    pub fn new(rev: impl Into<String>) -> Result<Self, TypeError> {
        let rev = rev.into().to_ascii_lowercase();
        if rev.len() != 40 && rev.len() != 64 {
            return Err(TypeError::InvalidRevision(format!(
                "expected 40 or 64 hex characters, got {}",
                rev.len()
            )));
        }
        if !rev.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(TypeError::InvalidRevision(
                "revision must be hexadecimal".into(),
            ));
        }
        Ok(Self(rev))
    }

    /// Get an abbreviated form of the revision.
    pub fn short(&self, len: usize) -> &str {
        let end = len.min(self.0.len());
        &self.0[..end]
    }

    /// Get the revision as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Revision {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<Revision> for String {
    fn from(rev: Revision) -> Self {
        rev.0
    }
}

impl AsRef<str> for Revision {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Revision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
