//! Trellis Core - identity and composition for in-memory graphs
//!
//! This crate provides the identifier scheme, the shared entity state, the
//! cascading removal registry and the node/context containment model that
//! the rest of a Trellis graph is built on.

pub mod context;
pub mod edge;
pub mod entity;
pub mod error;
pub mod event;
pub mod hookable;
pub mod identifier;
pub mod limits;
pub mod node;

pub use context::{ContextSnapshot, GraphContext, Member};
pub use edge::{Edge, EdgeCollection, EdgeListSnapshot, EdgeSnapshot};
pub use entity::{Entity, EntityBase, EntitySnapshot, SNAPSHOT_VERSION};
pub use error::{Error, Result};
pub use event::{Event, EventEmitter, MODIFIED};
pub use hookable::{CallbackObserver, HookRegistry, Hookable, ObserverError, RemovalObserver};
pub use identifier::{AsIdentifier, EntityKind, Identifier};
pub use node::{Node, NodeSnapshot};
