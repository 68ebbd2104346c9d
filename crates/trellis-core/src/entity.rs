//! State shared by every graph entity

use crate::error::{Error, Result};
use crate::identifier::{EntityKind, Identifier};
use crate::limits::validate_label;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Current version of every snapshot layout
pub const SNAPSHOT_VERSION: u32 = 1;

/// Identifier, label and creation time of an entity
///
/// Concrete entities own one of these and expose it through [`Entity`].
/// The identifier is fixed at construction.
#[derive(Debug, Clone)]
pub struct EntityBase {
    id: Identifier,
    kind: EntityKind,
    label: String,
    created_at: DateTime<Utc>,
}

impl EntityBase {
    /// Create a base with a freshly generated identifier and the kind's default label
    pub fn new(kind: EntityKind) -> Self {
        Self::with_id(Identifier::generate(kind), kind)
    }

    /// Create a base around an existing identifier
    pub fn with_id(id: Identifier, kind: EntityKind) -> Self {
        Self {
            id,
            kind,
            label: kind.default_label().to_string(),
            created_at: Utc::now(),
        }
    }

    /// Override the default label
    pub fn labeled(mut self, label: impl Into<String>) -> Result<Self> {
        let label = label.into();
        validate_label(&label)?;
        self.label = label;
        Ok(self)
    }

    /// Rebuild a base from a snapshot, keeping identifier and timestamp
    pub fn restore(snapshot: &EntitySnapshot, kind: EntityKind) -> Result<Self> {
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(Error::UnsupportedSnapshotVersion(snapshot.version));
        }
        validate_label(&snapshot.label)?;
        Ok(Self {
            id: snapshot.id,
            kind,
            label: snapshot.label.clone(),
            created_at: snapshot.created_at,
        })
    }

    pub fn id(&self) -> Identifier {
        self.id
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn snapshot(&self) -> EntitySnapshot {
        EntitySnapshot {
            version: SNAPSHOT_VERSION,
            id: self.id,
            label: self.label.clone(),
            created_at: self.created_at,
        }
    }

    pub fn to_map(&self) -> Map<String, Value> {
        self.snapshot().to_map()
    }
}

/// Serializable form of [`EntityBase`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    pub version: u32,
    pub id: Identifier,
    pub label: String,
    pub created_at: DateTime<Utc>,
}

impl EntitySnapshot {
    pub fn to_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("version".into(), Value::from(self.version));
        map.insert("id".into(), Value::String(self.id.to_string()));
        map.insert("label".into(), Value::String(self.label.clone()));
        map.insert(
            "created_at".into(),
            Value::String(self.created_at.to_rfc3339()),
        );
        map
    }
}

/// Common behavior of nodes, edges and graph contexts
pub trait Entity {
    fn base(&self) -> &EntityBase;

    fn id(&self) -> Identifier {
        self.base().id()
    }

    fn label(&self) -> &str {
        self.base().label()
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.base().created_at()
    }

    /// Mapping snapshot handed to persistence collaborators
    fn to_map(&self) -> Map<String, Value> {
        self.base().to_map()
    }
}

impl Entity for EntityBase {
    fn base(&self) -> &EntityBase {
        self
    }
}
