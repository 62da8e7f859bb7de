//! inspect
//!
//! Turning host objects into [`Snapshot`]s.
//!
//! # Architecture
//!
//! Host types implement [`Versioned`] to say which class they belong to and
//! which object they are. How an object becomes a snapshot is a separate
//! concern, supplied by an [`ObjectInspector`] registered per type in an
//! [`InspectorRegistry`]. This keeps the storage layer ignorant of host
//! types entirely.
//!
//! # Example
//!
//! ```
//! use chronicle::core::snapshot::Snapshot;
//! use chronicle::core::types::{ClassId, ObjectId};
//! use chronicle::inspect::{FieldPolicy, FnInspector, InspectorRegistry, PolicyInspector, Versioned};
//! use serde_json::json;
//!
//! struct Order { id: u64, status: String, note: String }
//!
//! impl Versioned for Order {
//!     fn class_id() -> ClassId { ClassId::new("shop", "Order").unwrap() }
//!     fn object_id(&self) -> ObjectId { ObjectId::from(self.id) }
//! }
//!
//! let inspector = FnInspector::new(|o: &Order| {
//!     Snapshot::new()
//!         .with_field("status", json!(o.status))
//!         .with_field("note", json!(o.note))
//! });
//! let policy = FieldPolicy::default().exclude(["note"]);
//!
//! let mut registry = InspectorRegistry::new();
//! registry.register::<Order, _>(PolicyInspector::new(inspector, policy));
//!
//! let order = Order { id: 1, status: "open".into(), note: "internal".into() };
//! let snapshot = registry.get::<Order>().unwrap().snapshot(&order);
//! assert!(snapshot.field.contains_key("status"));
//! assert!(!snapshot.field.contains_key("note"));
//! ```

use std::any::{Any, TypeId};
use std::collections::{BTreeSet, HashMap};
use std::marker::PhantomData;
use std::sync::Arc;

use crate::core::snapshot::Snapshot;
use crate::core::types::{ClassId, ObjectId};
use crate::engine::error::VersionError;

/// A host type whose instances are versioned.
pub trait Versioned: 'static {
    /// The class every instance of this type belongs to.
    fn class_id() -> ClassId;

    /// This instance's identifier within its class.
    fn object_id(&self) -> ObjectId;
}

/// Produces the snapshot of an object.
///
/// Implementations must be deterministic and must leave the object's
/// identifier out of the snapshot; it is already encoded in the path.
pub trait ObjectInspector<T>: Send + Sync {
    /// Capture `object`'s current state.
    fn snapshot(&self, object: &T) -> Snapshot;
}

/// Adapts a closure into an [`ObjectInspector`].
pub struct FnInspector<T, F> {
    f: F,
    _marker: PhantomData<fn(&T)>,
}

impl<T, F> FnInspector<T, F>
where
    F: Fn(&T) -> Snapshot + Send + Sync,
{
    /// Wrap `f`.
    pub fn new(f: F) -> Self {
        Self {
            f,
            _marker: PhantomData,
        }
    }
}

impl<T, F> ObjectInspector<T> for FnInspector<T, F>
where
    F: Fn(&T) -> Snapshot + Send + Sync,
{
    fn snapshot(&self, object: &T) -> Snapshot {
        (self.f)(object)
    }
}

/// Which fields of a snapshot are kept.
///
/// A non-empty `include` list wins: only fields in `include` or
/// `core_include` are kept. Otherwise every field not in `exclude` is kept.
/// Related-object lists are never filtered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldPolicy {
    /// Fields to keep; empty means "all"
    pub include: BTreeSet<String>,
    /// Fields always kept alongside a non-empty `include`
    pub core_include: BTreeSet<String>,
    /// Fields to drop when `include` is empty
    pub exclude: BTreeSet<String>,
}

impl FieldPolicy {
    /// Add fields to the include list.
    pub fn include<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.include.extend(names.into_iter().map(Into::into));
        self
    }

    /// Add fields to the core include list.
    pub fn core_include<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.core_include.extend(names.into_iter().map(Into::into));
        self
    }

    /// Add fields to the exclude list.
    pub fn exclude<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude.extend(names.into_iter().map(Into::into));
        self
    }

    /// Filter `snapshot`'s fields.
    pub fn apply(&self, mut snapshot: Snapshot) -> Snapshot {
        if !self.include.is_empty() {
            snapshot
                .field
                .retain(|name, _| self.include.contains(name) || self.core_include.contains(name));
        } else if !self.exclude.is_empty() {
            snapshot.field.retain(|name, _| !self.exclude.contains(name));
        }
        snapshot
    }
}

/// Wraps an inspector and filters its output through a [`FieldPolicy`].
pub struct PolicyInspector<T, I> {
    inner: I,
    policy: FieldPolicy,
    _marker: PhantomData<fn(&T)>,
}

impl<T, I: ObjectInspector<T>> PolicyInspector<T, I> {
    /// Apply `policy` to everything `inner` produces.
    pub fn new(inner: I, policy: FieldPolicy) -> Self {
        Self {
            inner,
            policy,
            _marker: PhantomData,
        }
    }

    /// The policy in effect.
    pub fn policy(&self) -> &FieldPolicy {
        &self.policy
    }
}

impl<T, I: ObjectInspector<T>> ObjectInspector<T> for PolicyInspector<T, I> {
    fn snapshot(&self, object: &T) -> Snapshot {
        self.policy.apply(self.inner.snapshot(object))
    }
}

/// Inspectors by host type.
#[derive(Default)]
pub struct InspectorRegistry {
    // Each value is an `Arc<dyn ObjectInspector<T>>` for the `T` of its key.
    inspectors: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl std::fmt::Debug for InspectorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InspectorRegistry")
            .field("registered", &self.inspectors.len())
            .finish()
    }
}

impl InspectorRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `inspector` for `T`, replacing any earlier one.
    pub fn register<T, I>(&mut self, inspector: I)
    where
        T: 'static,
        I: ObjectInspector<T> + 'static,
    {
        let inspector: Arc<dyn ObjectInspector<T>> = Arc::new(inspector);
        self.inspectors.insert(TypeId::of::<T>(), Box::new(inspector));
    }

    /// The inspector registered for `T`.
    ///
    /// # Errors
    ///
    /// - [`VersionError::UnregisteredClass`] if nothing was registered for `T`
    pub fn get<T: 'static>(&self) -> Result<Arc<dyn ObjectInspector<T>>, VersionError> {
        self.inspectors
            .get(&TypeId::of::<T>())
            .and_then(|entry| entry.downcast_ref::<Arc<dyn ObjectInspector<T>>>())
            .cloned()
            .ok_or(VersionError::UnregisteredClass {
                type_name: std::any::type_name::<T>(),
            })
    }

    /// Whether an inspector is registered for `T`.
    pub fn contains<T: 'static>(&self) -> bool {
        self.inspectors.contains_key(&TypeId::of::<T>())
    }

    /// Number of registered types.
    pub fn len(&self) -> usize {
        self.inspectors.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.inspectors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Order {
        status: &'static str,
        total: u32,
        note: &'static str,
    }

    struct Customer;

    fn order() -> Order {
        Order {
            status: "open",
            total: 12,
            note: "call first",
        }
    }

    fn inspector() -> impl ObjectInspector<Order> {
        FnInspector::new(|o: &Order| {
            Snapshot::new()
                .with_field("status", json!(o.status))
                .with_field("total", json!(o.total))
                .with_field("note", json!(o.note))
                .with_related("items", [ObjectId::from(7)])
        })
    }

    fn field_names(snapshot: &Snapshot) -> Vec<&str> {
        snapshot.field.keys().map(String::as_str).collect()
    }

    mod policy {
        use super::*;

        #[test]
        fn default_keeps_everything() {
            let snap = PolicyInspector::new(inspector(), FieldPolicy::default()).snapshot(&order());
            assert_eq!(field_names(&snap), vec!["note", "status", "total"]);
        }

        #[test]
        fn exclude_drops_named_fields() {
            let policy = FieldPolicy::default().exclude(["note"]);
            let snap = PolicyInspector::new(inspector(), policy).snapshot(&order());
            assert_eq!(field_names(&snap), vec!["status", "total"]);
        }

        #[test]
        fn include_with_core_include() {
            let policy = FieldPolicy::default()
                .include(["status"])
                .core_include(["total"])
                .exclude(["status"]);
            let snap = PolicyInspector::new(inspector(), policy).snapshot(&order());
            assert_eq!(field_names(&snap), vec!["status", "total"]);
        }

        #[test]
        fn core_include_alone_filters_nothing() {
            let policy = FieldPolicy::default().core_include(["total"]);
            let snap = policy.apply(inspector().snapshot(&order()));
            assert_eq!(snap.field.len(), 3);
        }

        #[test]
        fn related_is_untouched() {
            let policy = FieldPolicy::default().include(["status"]);
            let snap = policy.apply(inspector().snapshot(&order()));
            assert_eq!(snap.related["items"], vec![ObjectId::from(7)]);
        }
    }

    mod registry {
        use super::*;

        #[test]
        fn registered_type_resolves() {
            let mut registry = InspectorRegistry::new();
            registry.register::<Order, _>(inspector());

            assert!(registry.contains::<Order>());
            let snap = registry.get::<Order>().unwrap().snapshot(&order());
            assert_eq!(snap.field["status"], json!("open"));
        }

        #[test]
        fn unregistered_type_is_an_error() {
            let mut registry = InspectorRegistry::new();
            registry.register::<Order, _>(inspector());

            match registry.get::<Customer>() {
                Err(VersionError::UnregisteredClass { type_name }) => {
                    assert!(type_name.ends_with("Customer"));
                }
                Err(other) => panic!("unexpected error: {other}"),
                Ok(_) => panic!("Customer should not be registered"),
            }
        }

        #[test]
        fn later_registration_replaces() {
            let mut registry = InspectorRegistry::new();
            registry.register::<Order, _>(inspector());
            registry.register::<Order, _>(FnInspector::new(|_: &Order| Snapshot::new()));

            assert_eq!(registry.len(), 1);
            assert!(registry.get::<Order>().unwrap().snapshot(&order()).field.is_empty());
        }
    }
}
