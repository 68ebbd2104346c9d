//! Node (atomic graph entity)
//!
//! A node owns its [`EdgeCollection`] and belongs to exactly one
//! [`GraphContext`] at a time. The context owns the membership; the node
//! only keeps a weak link back to it together with the context identifier,
//! so dropping the root releases the whole graph.

use crate::context::{ContextLink, GraphContext, Member};
use crate::edge::{Edge, EdgeCollection, EdgeListSnapshot};
use crate::entity::{Entity, EntityBase, EntitySnapshot};
use crate::error::{Error, Result};
use crate::event::{Event, EventEmitter, MODIFIED};
use crate::hookable::{HookRegistry, Hookable};
use crate::identifier::{EntityKind, Identifier};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

pub(crate) struct NodeInner {
    base: EntityBase,
    edges: EdgeCollection,
    context: RefCell<Option<ContextLink>>,
    hooks: HookRegistry,
    events: EventEmitter,
}

/// Shared handle to a node
#[derive(Clone)]
pub struct Node(Rc<NodeInner>);

impl Node {
    /// Create a node inside `context`
    pub fn new(context: &GraphContext) -> Result<Self> {
        Self::attach_new(EntityBase::new(EntityKind::Node), context)
    }

    /// Create a node with a custom label inside `context`
    pub fn with_label(context: &GraphContext, label: impl Into<String>) -> Result<Self> {
        Self::attach_new(EntityBase::new(EntityKind::Node).labeled(label)?, context)
    }

    /// Rebuild a node from its snapshot inside the context it was saved from.
    ///
    /// Edges are not relinked; the snapshot's edge list names them by
    /// identifier for whoever restores the edges.
    pub fn restore(snapshot: &NodeSnapshot, context: &GraphContext) -> Result<Self> {
        match snapshot.context {
            Some(id) if id == context.id() => {}
            Some(found) => {
                return Err(Error::ContextMismatch {
                    expected: context.id(),
                    found,
                })
            }
            None => return Err(Error::OrphanedEntity(snapshot.entity.id)),
        }
        let base = EntityBase::restore(&snapshot.entity, EntityKind::Node)?;
        Self::attach_new(base, context)
    }

    fn attach_new(base: EntityBase, context: &GraphContext) -> Result<Self> {
        let id = base.id();
        let node = Self(Rc::new(NodeInner {
            edges: EdgeCollection::new(id),
            context: RefCell::new(None),
            hooks: HookRegistry::new(id),
            events: EventEmitter::new(id),
            base,
        }));
        context.add(node.clone())?;
        tracing::info!(
            "A node with id \"{}\" and label \"{}\" constructed",
            node.id(),
            node.label()
        );
        Ok(node)
    }

    pub(crate) fn from_inner(inner: Rc<NodeInner>) -> Self {
        Self(inner)
    }

    pub(crate) fn downgrade(&self) -> Weak<NodeInner> {
        Rc::downgrade(&self.0)
    }

    pub(crate) fn link(&self) -> Option<ContextLink> {
        self.0.context.borrow().clone()
    }

    pub(crate) fn set_link(&self, link: Option<ContextLink>) {
        *self.0.context.borrow_mut() = link;
    }

    /// The live context, `None` once the node was removed or its context dropped
    pub fn context(&self) -> Option<GraphContext> {
        self.0.context.borrow().as_ref().and_then(ContextLink::upgrade)
    }

    /// The live context, or [`Error::OrphanedEntity`]
    pub fn require_context(&self) -> Result<GraphContext> {
        self.context().ok_or(Error::OrphanedEntity(self.id()))
    }

    /// Identifier of the live context, `None` whenever [`Node::context`] is
    pub fn context_id(&self) -> Option<Identifier> {
        self.context().map(|context| context.id())
    }

    /// Move this node into `new_context` and emit a `"modified"` event.
    ///
    /// Unlike [`GraphContext::remove`] this never calls `notify_removal`:
    /// removal observers are not fired and the node's edges stay connected.
    /// The target is validated before the node leaves its current context.
    pub fn change_context(&self, new_context: &GraphContext) -> Result<()> {
        let id = self.id();
        if new_context.contains(&id) {
            return Err(Error::DuplicateMember {
                context: new_context.id(),
                member: id,
            });
        }

        let previous = self.context();
        if let Some(previous) = &previous {
            previous.detach_member(&id);
        }
        // Cannot fail: duplicates are ruled out and the old link is cleared.
        new_context.add(self.clone())?;

        let from = previous.map(|p| p.id().to_string());
        tracing::debug!(node = %id, from = ?from, to = %new_context.id(), "Node changed context");
        self.emit(
            MODIFIED,
            Some(serde_json::json!({
                "from": from,
                "to": new_context.id().to_string(),
            })),
        );
        Ok(())
    }

    /// Handle onto the edges referencing this node
    pub fn edges(&self) -> EdgeCollection {
        self.0.edges.clone()
    }

    /// Resolve one of this node's edges
    pub fn edge(&self, id: &Identifier) -> Result<Edge> {
        self.edges().get(id).ok_or(Error::EdgeNotFound {
            node: self.id(),
            edge: *id,
        })
    }

    /// Subscribe to an event emitted by this node
    pub fn on<F>(&self, event: impl Into<String>, listener: F)
    where
        F: Fn(&Event) + 'static,
    {
        self.0.events.on(event, listener);
    }

    pub fn emit(&self, event: &str, payload: Option<Value>) -> usize {
        self.0.events.emit(event, payload)
    }

    pub fn snapshot(&self) -> NodeSnapshot {
        NodeSnapshot {
            entity: self.0.base.snapshot(),
            edge_list: self.edges().snapshot(),
            context: self.context_id(),
        }
    }

    pub fn ptr_eq(&self, other: &Node) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Entity for Node {
    fn base(&self) -> &EntityBase {
        &self.0.base
    }

    fn to_map(&self) -> Map<String, Value> {
        self.snapshot().to_map()
    }
}

impl Hookable for Node {
    fn hooks(&self) -> &HookRegistry {
        &self.0.hooks
    }

    /// Refuses with [`Error::AlreadyAttached`] while the node is still a
    /// member of its context; [`GraphContext::remove`] notifies after detaching.
    fn notify_removal(&self) -> Result<()> {
        if let Some(context) = self.context() {
            if context.contains(&self.id()) {
                return Err(Error::AlreadyAttached {
                    member: self.id(),
                    context: context.id(),
                });
            }
        }
        self.0.hooks.notify_removal()
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for Node {}

impl From<Node> for Member {
    fn from(node: Node) -> Self {
        Member::Node(node)
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id())
            .field("label", &self.label())
            .field("context", &self.context_id())
            .field("edges", &self.edges().len())
            .finish()
    }
}

/// Serializable form of a node; the context is kept by identifier only
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSnapshot {
    #[serde(flatten)]
    pub entity: EntitySnapshot,
    pub edge_list: EdgeListSnapshot,
    pub context: Option<Identifier>,
}

impl NodeSnapshot {
    pub fn to_map(&self) -> Map<String, Value> {
        let mut map = self.entity.to_map();
        map.insert("edge_list".into(), Value::Object(self.edge_list.to_map()));
        map.insert(
            "context".into(),
            self.context
                .map(|id| Value::String(id.to_string()))
                .unwrap_or(Value::Null),
        );
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_new_node_joins_context() {
        let graph = GraphContext::root();
        let node = Node::new(&graph).unwrap();

        assert!(graph.contains(&node.id()));
        assert_eq!(node.context().unwrap().id(), graph.id());
        assert!(node.context_id().unwrap().equals(&graph.id()));
        assert_eq!(node.label(), "Node");
        assert_eq!(node.id().kind(), Some(EntityKind::Node));
    }

    #[test]
    fn test_with_label() {
        let graph = GraphContext::root();
        let node = Node::with_label(&graph, "Alice").unwrap();
        assert_eq!(node.label(), "Alice");

        assert!(matches!(
            Node::with_label(&graph, ""),
            Err(Error::Validation(_))
        ));
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn test_change_context_moves_membership() {
        let graph = GraphContext::root();
        let g1 = GraphContext::nested(&graph).unwrap();
        let g2 = GraphContext::nested(&graph).unwrap();
        let node = Node::new(&g1).unwrap();

        let fired = Rc::new(Cell::new(0));
        let counter = fired.clone();
        node.on(MODIFIED, move |_| counter.set(counter.get() + 1));

        node.change_context(&g2).unwrap();

        assert!(!g1.contains(&node.id()));
        assert!(g2.contains(&node.id()));
        assert_eq!(node.context_id(), Some(g2.id()));
        assert_eq!(fired.get(), 1);
    }

    #[test]
    fn test_change_context_keeps_edges() {
        let graph = GraphContext::root();
        let other = GraphContext::nested(&graph).unwrap();
        let a = Node::new(&graph).unwrap();
        let b = Node::new(&graph).unwrap();
        let edge = Edge::new(&a, &b).unwrap();

        a.change_context(&other).unwrap();

        assert!(a.edges().contains(&edge.id()));
        assert!(b.edges().contains(&edge.id()));
        assert!(!edge.is_orphaned());
    }

    #[test]
    fn test_change_context_fires_no_removal_observers() {
        let graph = GraphContext::root();
        let other = GraphContext::nested(&graph).unwrap();
        let node = Node::new(&graph).unwrap();
        let notified = Rc::new(Cell::new(false));

        let flag = notified.clone();
        node.attach(Rc::new(crate::hookable::CallbackObserver::new(
            Identifier::generate(EntityKind::Edge),
            move |_| {
                flag.set(true);
                Ok(())
            },
        )));

        node.change_context(&other).unwrap();
        assert!(!notified.get());
        assert_eq!(node.hooks().len(), 1);
    }

    #[test]
    fn test_context_id_follows_live_context() {
        let node = {
            let graph = GraphContext::root();
            let team = GraphContext::nested(&graph).unwrap();
            let node = Node::new(&team).unwrap();
            assert_eq!(node.context_id(), Some(team.id()));
            node
        };

        assert!(node.context().is_none());
        assert_eq!(node.context_id(), None);
        assert_eq!(node.snapshot().context, None);
    }

    #[test]
    fn test_notify_removal_requires_detached_node() {
        let graph = GraphContext::root();
        let a = Node::new(&graph).unwrap();
        let b = Node::new(&graph).unwrap();
        let edge = Edge::new(&a, &b).unwrap();

        assert!(matches!(
            a.notify_removal(),
            Err(Error::AlreadyAttached { member, .. }) if member == a.id()
        ));
        assert!(!edge.is_orphaned());
        assert!(b.edges().contains(&edge.id()));

        graph.remove(&a.id()).unwrap();
        assert!(edge.is_orphaned());
        a.notify_removal().unwrap();
    }

    #[test]
    fn test_change_context_rejects_current_context() {
        let graph = GraphContext::root();
        let node = Node::new(&graph).unwrap();
        let fired = Rc::new(Cell::new(0));
        let counter = fired.clone();
        node.on(MODIFIED, move |_| counter.set(counter.get() + 1));

        let err = node.change_context(&graph).unwrap_err();
        assert!(matches!(err, Error::DuplicateMember { .. }));
        assert!(graph.contains(&node.id()));
        assert_eq!(node.context_id(), Some(graph.id()));
        assert_eq!(fired.get(), 0);
    }

    #[test]
    fn test_removed_node_is_orphaned() {
        let graph = GraphContext::root();
        let node = Node::new(&graph).unwrap();

        graph.remove(&node.id()).unwrap();

        assert!(node.context().is_none());
        assert!(matches!(
            node.require_context(),
            Err(Error::OrphanedEntity(id)) if id == node.id()
        ));
    }

    #[test]
    fn test_orphan_can_be_rehomed() {
        let graph = GraphContext::root();
        let node = Node::new(&graph).unwrap();
        graph.remove(&node.id()).unwrap();

        node.change_context(&graph).unwrap();
        assert!(graph.contains(&node.id()));
    }

    #[test]
    fn test_edge_lookup() {
        let graph = GraphContext::root();
        let a = Node::new(&graph).unwrap();
        let b = Node::new(&graph).unwrap();
        let edge = Edge::new(&a, &b).unwrap();

        assert_eq!(a.edge(&edge.id()).unwrap().id(), edge.id());
        let missing = Identifier::generate(EntityKind::Edge);
        assert!(matches!(
            a.edge(&missing),
            Err(Error::EdgeNotFound { edge, .. }) if edge == missing
        ));
    }

    #[test]
    fn test_to_map() {
        let graph = GraphContext::root();
        let node = Node::with_label(&graph, "Alice").unwrap();
        let map = node.to_map();

        for key in ["id", "label", "created_at", "edge_list", "context"] {
            assert!(map.contains_key(key), "missing {key}");
        }
        assert_eq!(map["context"], graph.id().to_string());
        assert_eq!(map["context"], "0".repeat(32));
        assert_eq!(map["label"], "Alice");
    }

    #[test]
    fn test_snapshot_round_trip() {
        let graph = GraphContext::root();
        let a = Node::with_label(&graph, "Alice").unwrap();
        let b = Node::new(&graph).unwrap();
        let edge = Edge::new(&a, &b).unwrap();

        let json = serde_json::to_string(&a.snapshot()).unwrap();
        let snapshot: NodeSnapshot = serde_json::from_str(&json).unwrap();

        assert_eq!(snapshot, a.snapshot());
        assert_eq!(snapshot.edge_list.outgoing, vec![edge.id()]);
        assert_eq!(snapshot.context, Some(graph.id()));
    }

    #[test]
    fn test_restore() {
        let graph = GraphContext::root();
        let node = Node::with_label(&graph, "Alice").unwrap();
        let snapshot = node.snapshot();

        let fresh = GraphContext::root();
        let restored = Node::restore(&snapshot, &fresh).unwrap();
        assert_eq!(restored.id(), node.id());
        assert_eq!(restored.label(), "Alice");
        assert!(fresh.contains(&node.id()));

        let nested = GraphContext::nested(&fresh).unwrap();
        assert!(matches!(
            Node::restore(&snapshot, &nested),
            Err(Error::ContextMismatch { .. })
        ));
    }
}
