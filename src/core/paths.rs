//! core::paths
//!
//! Centralized path routing for versioned objects.
//!
//! # Storage Layout
//!
//! Each versioned class owns one bare repository:
//!
//! ```text
//! <root>/
//!   shop.models/
//!     order/          <- repository for shop.models.Order
//!       chronicle.lock
//!     lineitem/       <- repository for shop.models.LineItem
//! ```
//!
//! Inside a repository, each object is one blob at
//! `lowercase(module)/lowercase(class)/<id>`.
//!
//! **Hard rule:** no code outside this module joins class or object
//! names into paths. Everything goes through [`PathResolver`].
//!
//! # Example
//!
//! ```
//! use chronicle::core::paths::PathResolver;
//! use chronicle::core::types::{ClassId, ObjectId};
//! use std::path::PathBuf;
//!
//! let resolver = PathResolver::new("/var/lib/chronicle");
//! let class = ClassId::new("shop.models", "Order").unwrap();
//! let id = ObjectId::new("42").unwrap();
//!
//! assert_eq!(
//!     resolver.repository_location(&class).as_path(),
//!     PathBuf::from("/var/lib/chronicle/shop.models/order")
//! );
//! assert_eq!(resolver.object_path(&class, &id).as_str(), "shop.models/order/42");
//! ```

use std::path::{Path, PathBuf};

use super::types::{ClassId, ObjectId, ObjectPath, RepositoryLocation};

/// File name of the commit lock inside each repository directory.
pub const LOCK_FILE_NAME: &str = "chronicle.lock";

/// Maps class identities and object ids to storage locations.
///
/// # Invariants
///
/// - Every instance of a class resolves to the same location
/// - Distinct classes (compared case-insensitively) never share a location,
///   and no location is nested inside another
/// - Object paths depend only on (class, id), never on object state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathResolver {
    root: PathBuf,
}

impl PathResolver {
    /// Create a resolver rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The directory all repositories live under.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Location of the repository holding `class`'s history.
    ///
    /// The module path stays a single directory name (dots included), so a
    /// repository is always exactly two levels below the root.
    pub fn repository_location(&self, class: &ClassId) -> RepositoryLocation {
        RepositoryLocation::new(
            self.root
                .join(class.module().to_lowercase())
                .join(class.name().to_lowercase()),
        )
    }

    /// Path of one object's blob within its class repository.
    pub fn object_path(&self, class: &ClassId, id: &ObjectId) -> ObjectPath {
        ObjectPath::from_parts(class.module(), class.name(), id)
    }

    /// Path of the commit lock for a repository.
    pub fn lock_path(location: &RepositoryLocation) -> PathBuf {
        location.as_path().join(LOCK_FILE_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn class(module: &str, name: &str) -> ClassId {
        ClassId::new(module, name).unwrap()
    }

    #[test]
    fn same_class_shares_location() {
        let resolver = PathResolver::new("/data");
        let order = class("shop.models", "Order");
        assert_eq!(
            resolver.repository_location(&order),
            resolver.repository_location(&order.clone())
        );
    }

    #[test]
    fn different_classes_in_same_module_are_separate() {
        let resolver = PathResolver::new("/data");
        let order = resolver.repository_location(&class("shop.models", "Order"));
        let item = resolver.repository_location(&class("shop.models", "LineItem"));
        assert_ne!(order, item);
        assert_eq!(order.as_path().parent(), item.as_path().parent());
    }

    #[test]
    fn module_dots_do_not_nest() {
        let resolver = PathResolver::new("/data");
        let nested = resolver.repository_location(&class("shop.models", "Order"));
        let flat = resolver.repository_location(&class("shop", "models"));
        assert_ne!(nested, flat);
        assert!(!nested.as_path().starts_with(flat.as_path()));
    }

    #[test]
    fn object_path_lowercases_class_but_not_id() {
        let resolver = PathResolver::new("/data");
        let path = resolver.object_path(
            &class("Shop.Models", "Order"),
            &ObjectId::new("AbC").unwrap(),
        );
        assert_eq!(path.as_str(), "shop.models/order/AbC");
    }

    #[test]
    fn object_paths_differ_by_id() {
        let resolver = PathResolver::new("/data");
        let order = class("shop", "Order");
        let a = resolver.object_path(&order, &ObjectId::from(1));
        let b = resolver.object_path(&order, &ObjectId::from(2));
        assert_ne!(a, b);
    }

    #[test]
    fn lock_path_is_inside_repository() {
        let location = RepositoryLocation::new("/data/shop/order");
        assert_eq!(
            PathResolver::lock_path(&location),
            PathBuf::from("/data/shop/order/chronicle.lock")
        );
    }
}
