//! Error types for Trellis Core

use crate::hookable::ObserverError;
use crate::identifier::Identifier;
use crate::limits::ValidationError;
use thiserror::Error;

/// Result type alias using Trellis' Error
pub type Result<T> = std::result::Result<T, Error>;

/// Trellis error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("Malformed identifier: {0:?}")]
    MalformedIdentifier(String),

    #[error("Duplicate member {member} in context {context}")]
    DuplicateMember {
        context: Identifier,
        member: Identifier,
    },

    #[error("Member {member} not found in context {context}")]
    MemberNotFound {
        context: Identifier,
        member: Identifier,
    },

    #[error("Member {member} already belongs to context {context}")]
    AlreadyAttached {
        member: Identifier,
        context: Identifier,
    },

    #[error("The root context cannot be nested")]
    RootNotNestable,

    #[error("Entity {0} has no live context")]
    OrphanedEntity(Identifier),

    #[error("Adding context {member} to {context} would create a cycle")]
    CyclicMembership {
        context: Identifier,
        member: Identifier,
    },

    #[error("Edge {edge} not found on node {node}")]
    EdgeNotFound { node: Identifier, edge: Identifier },

    #[error("Context mismatch: expected {expected}, found {found}")]
    ContextMismatch {
        expected: Identifier,
        found: Identifier,
    },

    #[error("Unsupported snapshot version: {0}")]
    UnsupportedSnapshotVersion(u32),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("{} observer(s) failed during removal of {entity}", .failures.len())]
    ObserverFailures {
        entity: Identifier,
        failures: Vec<ObserverError>,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Observer failures carried by this error, if any
    pub fn observer_failures(&self) -> &[ObserverError] {
        match self {
            Self::ObserverFailures { failures, .. } => failures,
            _ => &[],
        }
    }
}
