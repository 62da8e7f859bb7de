//! versions
//!
//! The object-level entry point.
//!
//! [`Versions`] wires configuration, path resolution, repository handling,
//! the commit engine, history reads, and the inspector registry together,
//! and exposes them in terms of host objects rather than paths and blobs.
//!
//! # Example
//!
//! ```no_run
//! use chronicle::core::config::Config;
//! use chronicle::core::snapshot::Snapshot;
//! use chronicle::core::types::{ClassId, ObjectId};
//! use chronicle::engine::{VersionError, TIP};
//! use chronicle::inspect::{FnInspector, Versioned};
//! use chronicle::Versions;
//! use serde_json::json;
//!
//! struct Order { id: u64, status: String }
//!
//! impl Versioned for Order {
//!     fn class_id() -> ClassId { ClassId::new("shop", "Order").unwrap() }
//!     fn object_id(&self) -> ObjectId { ObjectId::from(self.id) }
//! }
//!
//! let mut versions = Versions::new(Config::new("/var/lib/chronicle")).unwrap();
//! versions.register::<Order, _>(FnInspector::new(|o: &Order| {
//!     Snapshot::new().with_field("status", json!(o.status))
//! }));
//!
//! let order = Order { id: 7, status: "paid".into() };
//! versions.unit_of_work(|session| {
//!     session.set_user("alice <alice@example.com>");
//!     session.set_message("mark paid");
//!     versions.stage(session, &order)
//! })?;
//!
//! let stored = versions.version(&order, TIP)?;
//! assert_eq!(stored.field["status"], json!("paid"));
//! # Ok::<(), VersionError>(())
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::core::config::{Config, ConfigError};
use crate::core::paths::PathResolver;
use crate::core::snapshot::Snapshot;
use crate::core::types::{ObjectId, RepositoryLocation, Revision};
use crate::engine::{
    CommitEngine, DiffTarget, FinishError, History, HistoryReader, RepositoryHandle, Session,
    VersionError,
};
use crate::inspect::{InspectorRegistry, ObjectInspector, Versioned};

/// Versioned storage for host objects.
#[derive(Debug)]
pub struct Versions {
    config: Config,
    resolver: PathResolver,
    engine: Arc<CommitEngine>,
    reader: HistoryReader,
    registry: InspectorRegistry,
}

impl Versions {
    /// Build the store from a validated configuration.
    ///
    /// Nothing is touched on disk until the first commit or read.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::InvalidValue`] or [`ConfigError::MissingRoot`] if
    ///   `config` does not validate
    pub fn new(config: Config) -> Result<Self, ConfigError> {
        config.validate()?;

        let resolver = PathResolver::new(config.repository_root());
        let repositories = Arc::new(RepositoryHandle::new());
        let engine = Arc::new(CommitEngine::new(Arc::clone(&repositories), &config));
        let reader = HistoryReader::new(resolver.clone(), repositories);

        tracing::debug!(
            root = %config.repository_root().display(),
            lock_timeout = ?config.lock_timeout(),
            "versions store ready"
        );

        Ok(Self {
            config,
            resolver,
            engine,
            reader,
            registry: InspectorRegistry::new(),
        })
    }

    /// Build the store from the environment; see [`Config::from_env`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::new(Config::from_env()?)
    }

    /// The configuration in effect.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The resolver mapping classes and objects to locations and paths.
    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    // =========================================================================
    // Sessions
    // =========================================================================

    /// A new, inactive session bound to this store.
    pub fn session(&self) -> Session {
        Session::new(Arc::clone(&self.engine), &self.config)
    }

    /// Run `work` inside an active session.
    ///
    /// If `work` succeeds the session is finished and the committed
    /// revisions are returned alongside its result. If it fails the session
    /// is reset and nothing staged is committed.
    ///
    /// # Errors
    ///
    /// Whatever `work` returns, or the [`FinishError`] from finishing.
    pub fn unit_of_work<R, E, F>(
        &self,
        work: F,
    ) -> Result<(R, BTreeMap<RepositoryLocation, Revision>), E>
    where
        F: FnOnce(&mut Session) -> Result<R, E>,
        E: From<FinishError>,
    {
        let mut session = self.session();
        session.start();

        match work(&mut session) {
            Ok(value) => {
                let revisions = session.finish()?;
                Ok((value, revisions))
            }
            Err(e) => {
                session.reset();
                Err(e)
            }
        }
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    /// Register how instances of `T` become snapshots.
    pub fn register<T, I>(&mut self, inspector: I)
    where
        T: Versioned,
        I: ObjectInspector<T> + 'static,
    {
        self.registry.register::<T, I>(inspector);
    }

    /// The inspector registry.
    pub fn registry(&self) -> &InspectorRegistry {
        &self.registry
    }

    /// The current snapshot of `object`.
    ///
    /// # Errors
    ///
    /// - [`VersionError::UnregisteredClass`] if no inspector is registered for `T`
    pub fn data<T: Versioned>(&self, object: &T) -> Result<Snapshot, VersionError> {
        Ok(self.registry.get::<T>()?.snapshot(object))
    }

    /// The blob `object` would be stored as.
    pub fn serialize<T: Versioned>(&self, object: &T) -> Result<Vec<u8>, VersionError> {
        Ok(self.data(object)?.to_bytes()?)
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Stage `object`'s current state in `session`.
    ///
    /// Returns the new revision if the session was inactive and the stage
    /// committed immediately.
    pub fn stage<T: Versioned>(
        &self,
        session: &mut Session,
        object: &T,
    ) -> Result<Option<Revision>, VersionError> {
        let class = T::class_id();
        let id = object.object_id();
        let blob = self.serialize(object)?;

        session.stage(
            self.resolver.repository_location(&class),
            self.resolver.object_path(&class, &id),
            blob,
        )
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// The stored snapshot of `object` at `rev`.
    ///
    /// Reading a class that was never written creates its empty repository
    /// on disk, the same way the first commit would.
    pub fn version<T: Versioned>(&self, object: &T, rev: &str) -> Result<Snapshot, VersionError> {
        self.get::<T>(&object.object_id(), rev)
    }

    /// The stored snapshot of the `T` identified by `id` at `rev`.
    ///
    /// Reading a class that was never written creates its empty repository
    /// on disk, the same way the first commit would.
    ///
    /// # Errors
    ///
    /// - [`VersionError::VersionNotFound`] if nothing is stored there
    /// - [`VersionError::CorruptSnapshot`] if the stored blob does not parse
    pub fn get<T: Versioned>(&self, id: &ObjectId, rev: &str) -> Result<Snapshot, VersionError> {
        self.reader.get(&T::class_id(), id, rev)
    }

    /// Revisions that changed `object`, newest first.
    ///
    /// Reading a class that was never written creates its empty repository
    /// on disk, the same way the first commit would.
    pub fn revisions<T: Versioned>(&self, object: &T) -> History {
        self.history::<T>(&object.object_id())
    }

    /// Revisions that changed the `T` identified by `id`, newest first.
    ///
    /// The repository is opened when the returned [`History`] is iterated.
    /// Reading a class that was never written creates its empty repository
    /// on disk, the same way the first commit would.
    pub fn history<T: Versioned>(&self, id: &ObjectId) -> History {
        self.reader.history(&T::class_id(), id)
    }

    /// Per-field diffs of `object` from `rev_a` to `rev_b`, or to its live
    /// state when `rev_b` is `None`.
    pub fn diff<T: Versioned>(
        &self,
        object: &T,
        rev_a: &str,
        rev_b: Option<&str>,
    ) -> Result<BTreeMap<String, String>, VersionError> {
        let class = T::class_id();
        let id = object.object_id();

        match rev_b {
            Some(rev_b) => self
                .reader
                .diff(&class, &id, rev_a, DiffTarget::Revision(rev_b)),
            None => {
                let live = self.data(object)?;
                self.reader
                    .diff(&class, &id, rev_a, DiffTarget::Live(&live))
            }
        }
    }
}
