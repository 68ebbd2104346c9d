//! Edges and the per-node edge collection
//!
//! Only what the identity layer needs: an edge links a tail node to a head
//! node, registers in both endpoints' collections and watches both endpoints
//! for removal.

use crate::entity::{Entity, EntityBase, EntitySnapshot};
use crate::error::Result;
use crate::hookable::{Hookable, ObserverError, RemovalObserver};
use crate::identifier::{EntityKind, Identifier};
use crate::node::{Node, NodeInner};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};

pub(crate) struct EdgeInner {
    base: EntityBase,
    tail: Identifier,
    head: Identifier,
    tail_node: Weak<NodeInner>,
    head_node: Weak<NodeInner>,
    orphaned: Cell<bool>,
}

impl EdgeInner {
    fn endpoints(&self) -> [(Identifier, &Weak<NodeInner>); 2] {
        [(self.tail, &self.tail_node), (self.head, &self.head_node)]
    }

    /// Drop this edge from every live endpoint
    fn unlink(&self) {
        let id = self.base.id();
        for (_, endpoint) in self.endpoints() {
            if let Some(inner) = endpoint.upgrade() {
                let node = Node::from_inner(inner);
                node.edges().remove(&id);
                node.hooks().detach(&id);
            }
        }
    }
}

impl RemovalObserver for EdgeInner {
    fn observer_id(&self) -> Identifier {
        self.base.id()
    }

    fn on_removal(&self, removed: Identifier) -> std::result::Result<(), ObserverError> {
        tracing::debug!(edge = %self.base.id(), endpoint = %removed, "Endpoint removed, detaching edge");
        self.orphaned.set(true);
        self.unlink();
        Ok(())
    }
}

/// Shared handle to an edge
#[derive(Clone)]
pub struct Edge(Rc<EdgeInner>);

impl Edge {
    /// Connect `tail` to `head`
    pub fn new(tail: &Node, head: &Node) -> Result<Self> {
        Self::connect(EntityBase::new(EntityKind::Edge), tail, head)
    }

    pub fn with_label(tail: &Node, head: &Node, label: impl Into<String>) -> Result<Self> {
        Self::connect(EntityBase::new(EntityKind::Edge).labeled(label)?, tail, head)
    }

    fn connect(base: EntityBase, tail: &Node, head: &Node) -> Result<Self> {
        let edge = Self(Rc::new(EdgeInner {
            base,
            tail: tail.id(),
            head: head.id(),
            tail_node: tail.downgrade(),
            head_node: head.downgrade(),
            orphaned: Cell::new(false),
        }));
        tail.edges().add_outgoing(edge.clone());
        head.edges().add_incoming(edge.clone());
        tail.attach(edge.0.clone());
        head.attach(edge.0.clone());
        tracing::debug!(edge = %edge.id(), tail = %tail.id(), head = %head.id(), "Edge connected");
        Ok(edge)
    }

    pub fn tail_id(&self) -> Identifier {
        self.0.tail
    }

    pub fn head_id(&self) -> Identifier {
        self.0.head
    }

    pub fn tail(&self) -> Option<Node> {
        self.0.tail_node.upgrade().map(Node::from_inner)
    }

    pub fn head(&self) -> Option<Node> {
        self.0.head_node.upgrade().map(Node::from_inner)
    }

    /// True once one of the endpoints has been removed
    pub fn is_orphaned(&self) -> bool {
        self.0.orphaned.get()
    }

    /// Remove this edge from both endpoints
    pub fn disconnect(&self) {
        self.0.unlink();
    }

    pub fn snapshot(&self) -> EdgeSnapshot {
        EdgeSnapshot {
            entity: self.0.base.snapshot(),
            tail: self.0.tail,
            head: self.0.head,
        }
    }
}

impl Entity for Edge {
    fn base(&self) -> &EntityBase {
        &self.0.base
    }

    fn to_map(&self) -> Map<String, Value> {
        self.snapshot().to_map()
    }
}

impl fmt::Debug for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Edge")
            .field("id", &self.id())
            .field("tail", &self.0.tail)
            .field("head", &self.0.head)
            .field("orphaned", &self.is_orphaned())
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeSnapshot {
    #[serde(flatten)]
    pub entity: EntitySnapshot,
    pub tail: Identifier,
    pub head: Identifier,
}

impl EdgeSnapshot {
    pub fn to_map(&self) -> Map<String, Value> {
        let mut map = self.entity.to_map();
        map.insert("tail".into(), Value::String(self.tail.to_string()));
        map.insert("head".into(), Value::String(self.head.to_string()));
        map
    }
}

#[derive(Debug, Default)]
struct EdgeSets {
    outgoing: BTreeMap<Identifier, Edge>,
    incoming: BTreeMap<Identifier, Edge>,
}

/// Edges going out of and coming into one node
///
/// Cloning yields another handle onto the same edges. Each call borrows the
/// underlying sets only for its own duration, so edges may be disconnected
/// while iterating over [`EdgeCollection::all`].
#[derive(Debug, Clone)]
pub struct EdgeCollection {
    owner: Identifier,
    sets: Rc<RefCell<EdgeSets>>,
}

impl EdgeCollection {
    pub fn new(owner: Identifier) -> Self {
        Self {
            owner,
            sets: Rc::new(RefCell::new(EdgeSets::default())),
        }
    }

    pub fn owner(&self) -> Identifier {
        self.owner
    }

    pub(crate) fn add_outgoing(&self, edge: Edge) {
        self.sets.borrow_mut().outgoing.insert(edge.id(), edge);
    }

    pub(crate) fn add_incoming(&self, edge: Edge) {
        self.sets.borrow_mut().incoming.insert(edge.id(), edge);
    }

    pub(crate) fn remove(&self, id: &Identifier) -> bool {
        let (out, inc) = {
            let mut sets = self.sets.borrow_mut();
            (sets.outgoing.remove(id), sets.incoming.remove(id))
        };
        out.is_some() || inc.is_some()
    }

    pub fn get(&self, id: &Identifier) -> Option<Edge> {
        let sets = self.sets.borrow();
        sets.outgoing.get(id).or_else(|| sets.incoming.get(id)).cloned()
    }

    pub fn contains(&self, id: &Identifier) -> bool {
        let sets = self.sets.borrow();
        sets.outgoing.contains_key(id) || sets.incoming.contains_key(id)
    }

    pub fn outgoing(&self) -> Vec<Edge> {
        self.sets.borrow().outgoing.values().cloned().collect()
    }

    pub fn incoming(&self) -> Vec<Edge> {
        self.sets.borrow().incoming.values().cloned().collect()
    }

    /// Every distinct edge; self-loops appear once
    pub fn all(&self) -> Vec<Edge> {
        let sets = self.sets.borrow();
        let mut edges: Vec<Edge> = sets.outgoing.values().cloned().collect();
        edges.extend(
            sets.incoming
                .iter()
                .filter(|(id, _)| !sets.outgoing.contains_key(id))
                .map(|(_, e)| e.clone()),
        );
        edges
    }

    pub fn len(&self) -> usize {
        let sets = self.sets.borrow();
        sets.outgoing.len()
            + sets
                .incoming
                .keys()
                .filter(|id| !sets.outgoing.contains_key(id))
                .count()
    }

    pub fn is_empty(&self) -> bool {
        let sets = self.sets.borrow();
        sets.outgoing.is_empty() && sets.incoming.is_empty()
    }

    pub fn snapshot(&self) -> EdgeListSnapshot {
        let sets = self.sets.borrow();
        EdgeListSnapshot {
            outgoing: sets.outgoing.keys().copied().collect(),
            incoming: sets.incoming.keys().copied().collect(),
        }
    }

    pub fn to_map(&self) -> Map<String, Value> {
        self.snapshot().to_map()
    }
}

/// Edge collection by identifier
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EdgeListSnapshot {
    #[serde(rename = "out")]
    pub outgoing: Vec<Identifier>,
    #[serde(rename = "in")]
    pub incoming: Vec<Identifier>,
}

impl EdgeListSnapshot {
    pub fn to_map(&self) -> Map<String, Value> {
        let ids = |ids: &[Identifier]| {
            Value::Array(ids.iter().map(|id| Value::String(id.to_string())).collect())
        };
        let mut map = Map::new();
        map.insert("out".into(), ids(&self.outgoing));
        map.insert("in".into(), ids(&self.incoming));
        map
    }
}
