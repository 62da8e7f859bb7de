//! core::snapshot
//!
//! The serializable state of one object at one point in time.
//!
//! # Format
//!
//! Snapshots are stored as pretty-printed JSON:
//!
//! ```json
//! {
//!   "field": { "status": "paid", "total": 1250 },
//!   "related": { "items": ["3", "7"] }
//! }
//! ```
//!
//! Both maps are ordered, so serializing the same snapshot always
//! yields the same bytes and therefore the same blob id.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::types::ObjectId;

/// Errors from snapshot encoding.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("failed to serialize snapshot: {0}")]
    Serialize(String),

    #[error("failed to parse snapshot: {0}")]
    Parse(String),
}

/// Versioned state of an object: plain fields plus related-object ids.
///
/// # Example
///
/// ```
/// use chronicle::core::snapshot::Snapshot;
/// use chronicle::core::types::ObjectId;
/// use serde_json::json;
///
/// let snapshot = Snapshot::new()
///     .with_field("status", json!("paid"))
///     .with_related("items", [ObjectId::from(3), ObjectId::from(7)]);
///
/// let bytes = snapshot.to_bytes().unwrap();
/// assert_eq!(Snapshot::from_bytes(&bytes).unwrap(), snapshot);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Attribute name to value.
    #[serde(default)]
    pub field: BTreeMap<String, serde_json::Value>,

    /// Relation name to the ordered ids it references.
    #[serde(default)]
    pub related: BTreeMap<String, Vec<ObjectId>>,
}

impl Snapshot {
    /// Create an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: set a field value.
    pub fn with_field(mut self, name: impl Into<String>, value: serde_json::Value) -> Self {
        self.field.insert(name.into(), value);
        self
    }

    /// Builder: set a relation's referenced ids.
    pub fn with_related(
        mut self,
        name: impl Into<String>,
        ids: impl IntoIterator<Item = ObjectId>,
    ) -> Self {
        self.related.insert(name.into(), ids.into_iter().collect());
        self
    }

    /// Serialize to the stored blob format.
    pub fn to_bytes(&self) -> Result<Vec<u8>, SnapshotError> {
        let mut bytes =
            serde_json::to_vec_pretty(self).map_err(|e| SnapshotError::Serialize(e.to_string()))?;
        bytes.push(b'\n');
        Ok(bytes)
    }

    /// Parse a stored blob.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SnapshotError> {
        serde_json::from_slice(bytes).map_err(|e| SnapshotError::Parse(e.to_string()))
    }
}
