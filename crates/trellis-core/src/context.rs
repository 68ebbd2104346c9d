//! Graph contexts (containers of nodes and nested contexts)

use crate::entity::{Entity, EntityBase, EntitySnapshot};
use crate::error::{Error, Result};
use crate::hookable::{HookRegistry, Hookable, ObserverError};
use crate::identifier::{EntityKind, Identifier};
use crate::limits::validate_context_depth;
use crate::node::Node;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};

/// Label given to contexts created with [`GraphContext::nested`]
pub const NESTED_LABEL: &str = "SubGraph";

/// Weak link from a member back to the context holding it
#[derive(Clone)]
pub(crate) struct ContextLink {
    handle: Weak<ContextInner>,
}

impl ContextLink {
    fn to(context: &GraphContext) -> Self {
        Self {
            handle: Rc::downgrade(&context.0),
        }
    }

    pub(crate) fn upgrade(&self) -> Option<GraphContext> {
        self.handle.upgrade().map(GraphContext)
    }
}

/// Anything a context can hold
#[derive(Debug, Clone)]
pub enum Member {
    Node(Node),
    Context(GraphContext),
}

impl Member {
    pub fn id(&self) -> Identifier {
        match self {
            Self::Node(node) => node.id(),
            Self::Context(context) => context.id(),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Node(node) => node.label(),
            Self::Context(context) => context.label(),
        }
    }

    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Self::Node(node) => Some(node),
            Self::Context(_) => None,
        }
    }

    pub fn as_context(&self) -> Option<&GraphContext> {
        match self {
            Self::Node(_) => None,
            Self::Context(context) => Some(context),
        }
    }

    pub fn to_map(&self) -> Map<String, Value> {
        match self {
            Self::Node(node) => node.to_map(),
            Self::Context(context) => context.to_map(),
        }
    }

    fn link(&self) -> Option<ContextLink> {
        match self {
            Self::Node(node) => node.link(),
            Self::Context(context) => context.0.parent.borrow().clone(),
        }
    }

    fn set_link(&self, link: Option<ContextLink>) {
        match self {
            Self::Node(node) => node.set_link(link),
            Self::Context(context) => *context.0.parent.borrow_mut() = link,
        }
    }

    fn cascade_removal(&self) -> Vec<ObserverError> {
        match self {
            Self::Node(node) => node.hooks().collect_failures(),
            Self::Context(context) => context.cascade_removal(),
        }
    }
}

impl From<GraphContext> for Member {
    fn from(context: GraphContext) -> Self {
        Member::Context(context)
    }
}

pub(crate) struct ContextInner {
    base: EntityBase,
    parent: RefCell<Option<ContextLink>>,
    members: RefCell<BTreeMap<Identifier, Member>>,
    hooks: HookRegistry,
}

/// Shared handle to a graph context
///
/// The root context carries [`Identifier::root`]; nested contexts generate
/// their own identifier and hang below a parent, forming a tree.
#[derive(Clone)]
pub struct GraphContext(Rc<ContextInner>);

impl GraphContext {
    fn from_base(base: EntityBase) -> Self {
        let hooks = HookRegistry::new(base.id());
        Self(Rc::new(ContextInner {
            base,
            parent: RefCell::new(None),
            members: RefCell::new(BTreeMap::new()),
            hooks,
        }))
    }

    /// Create the outermost context
    pub fn root() -> Self {
        Self::from_base(EntityBase::with_id(Identifier::root(), EntityKind::Graph))
    }

    /// Create a context nested inside `parent`
    pub fn nested(parent: &GraphContext) -> Result<Self> {
        Self::nested_with_label(parent, NESTED_LABEL)
    }

    pub fn nested_with_label(parent: &GraphContext, label: impl Into<String>) -> Result<Self> {
        let base = EntityBase::new(EntityKind::Graph).labeled(label)?;
        let context = Self::from_base(base);
        parent.add(context.clone())?;
        Ok(context)
    }

    pub fn is_root(&self) -> bool {
        self.id().is_root()
    }

    /// Add a member keyed by its identifier and link it back to this context.
    ///
    /// Returns `self` so calls can be chained.
    pub fn add(&self, member: impl Into<Member>) -> Result<&Self> {
        let member = member.into();
        let id = member.id();

        if self.contains(&id) {
            return Err(Error::DuplicateMember {
                context: self.id(),
                member: id,
            });
        }
        if let Some(current) = member.link().and_then(|link| link.upgrade()) {
            if current.contains(&id) {
                return Err(Error::AlreadyAttached {
                    member: id,
                    context: current.id(),
                });
            }
        }
        if let Member::Context(context) = &member {
            if context.is_root() {
                return Err(Error::RootNotNestable);
            }
            if self.is_within(context) {
                return Err(Error::CyclicMembership {
                    context: self.id(),
                    member: id,
                });
            }
            validate_context_depth(self.depth() + 1 + context.height())?;
        }

        member.set_link(Some(ContextLink::to(self)));
        self.0.members.borrow_mut().insert(id, member);
        tracing::debug!(context = %self.id(), member = %id, "Member added");
        Ok(self)
    }

    /// Remove a member and cascade the removal to everything depending on it.
    ///
    /// The member is gone from this context even when observers fail; their
    /// failures come back together as [`Error::ObserverFailures`].
    pub fn remove(&self, id: &Identifier) -> Result<Member> {
        let member = self.detach_member(id).ok_or(Error::MemberNotFound {
            context: self.id(),
            member: *id,
        })?;
        tracing::debug!(context = %self.id(), member = %id, "Member removed");

        let failures = member.cascade_removal();
        if failures.is_empty() {
            Ok(member)
        } else {
            Err(Error::ObserverFailures {
                entity: *id,
                failures,
            })
        }
    }

    /// Take a member out without notifying anyone
    pub(crate) fn detach_member(&self, id: &Identifier) -> Option<Member> {
        let member = self.0.members.borrow_mut().remove(id)?;
        member.set_link(None);
        Some(member)
    }

    fn cascade_removal(&self) -> Vec<ObserverError> {
        let mut failures = self.0.hooks.collect_failures();
        for member in self.members() {
            failures.extend(member.cascade_removal());
        }
        failures
    }

    pub fn contains(&self, id: &Identifier) -> bool {
        self.0.members.borrow().contains_key(id)
    }

    pub fn get(&self, id: &Identifier) -> Option<Member> {
        self.0.members.borrow().get(id).cloned()
    }

    pub fn node(&self, id: &Identifier) -> Option<Node> {
        self.get(id).and_then(|m| m.as_node().cloned())
    }

    /// Members ordered by identifier
    pub fn members(&self) -> Vec<Member> {
        self.0.members.borrow().values().cloned().collect()
    }

    pub fn member_ids(&self) -> Vec<Identifier> {
        self.0.members.borrow().keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.0.members.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.members.borrow().is_empty()
    }

    pub fn parent(&self) -> Option<GraphContext> {
        self.0.parent.borrow().as_ref().and_then(ContextLink::upgrade)
    }

    /// Number of live ancestors
    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut current = self.parent();
        while let Some(context) = current {
            depth += 1;
            current = context.parent();
        }
        depth
    }

    /// Length of the longest chain of nested contexts below this one
    pub fn height(&self) -> usize {
        self.members()
            .iter()
            .filter_map(Member::as_context)
            .map(|child| child.height() + 1)
            .max()
            .unwrap_or(0)
    }

    /// Whether this context is `other` or sits somewhere below it
    fn is_within(&self, other: &GraphContext) -> bool {
        let mut current = Some(self.clone());
        while let Some(context) = current {
            if context.ptr_eq(other) {
                return true;
            }
            current = context.parent();
        }
        false
    }

    pub fn ptr_eq(&self, other: &GraphContext) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn snapshot(&self) -> ContextSnapshot {
        ContextSnapshot {
            entity: self.0.base.snapshot(),
            parent: self.parent().map(|parent| parent.id()),
            members: self.member_ids(),
        }
    }
}

impl Entity for GraphContext {
    fn base(&self) -> &EntityBase {
        &self.0.base
    }

    fn to_map(&self) -> Map<String, Value> {
        self.snapshot().to_map()
    }
}

impl Hookable for GraphContext {
    fn hooks(&self) -> &HookRegistry {
        &self.0.hooks
    }

    /// Notifies this context's observers, then every member recursively.
    ///
    /// Refuses with [`Error::AlreadyAttached`] while the context is still
    /// held by its parent.
    fn notify_removal(&self) -> Result<()> {
        if let Some(parent) = self.parent() {
            if parent.contains(&self.id()) {
                return Err(Error::AlreadyAttached {
                    member: self.id(),
                    context: parent.id(),
                });
            }
        }
        let failures = self.cascade_removal();
        if failures.is_empty() {
            Ok(())
        } else {
            Err(Error::ObserverFailures {
                entity: self.id(),
                failures,
            })
        }
    }
}

impl fmt::Debug for GraphContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphContext")
            .field("id", &self.id())
            .field("label", &self.label())
            .field("members", &self.len())
            .finish()
    }
}

/// Serializable form of a context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextSnapshot {
    #[serde(flatten)]
    pub entity: EntitySnapshot,
    pub parent: Option<Identifier>,
    pub members: Vec<Identifier>,
}

impl ContextSnapshot {
    pub fn to_map(&self) -> Map<String, Value> {
        let mut map = self.entity.to_map();
        map.insert(
            "parent".into(),
            self.parent
                .map(|id| Value::String(id.to_string()))
                .unwrap_or(Value::Null),
        );
        map.insert(
            "members".into(),
            Value::Array(
                self.members
                    .iter()
                    .map(|id| Value::String(id.to_string()))
                    .collect(),
            ),
        );
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edge::Edge;
    use crate::hookable::CallbackObserver;
    use crate::limits::MAX_CONTEXT_DEPTH;
    use std::cell::Cell;

    #[test]
    fn test_root_context() {
        let graph = GraphContext::root();
        assert!(graph.is_root());
        assert_eq!(graph.id().to_string(), "0".repeat(32));
        assert_eq!(graph.label(), "Graph");
        assert!(graph.parent().is_none());
        assert_eq!(graph.depth(), 0);
    }

    #[test]
    fn test_nested_context() {
        let graph = GraphContext::root();
        let team = GraphContext::nested_with_label(&graph, "Team").unwrap();

        assert!(graph.contains(&team.id()));
        assert_eq!(team.parent().unwrap().id(), graph.id());
        assert_eq!(team.depth(), 1);
        assert_eq!(team.label(), "Team");
        assert_eq!(team.id().kind(), Some(EntityKind::Graph));
        assert_eq!(GraphContext::nested(&team).unwrap().label(), NESTED_LABEL);
    }

    #[test]
    fn test_add_is_chainable_and_rejects_duplicates() {
        let graph = GraphContext::root();
        let node = Node::new(&graph).unwrap();

        let err = graph.add(node.clone()).unwrap_err();
        assert!(matches!(
            err,
            Error::DuplicateMember { member, .. } if member == node.id()
        ));

        let other = GraphContext::nested(&graph).unwrap();
        graph.remove(&node.id()).unwrap();
        let len = other.add(node.clone()).unwrap().len();
        assert_eq!(len, 1);
        assert_eq!(node.context_id(), Some(other.id()));
    }

    #[test]
    fn test_add_rejects_member_of_another_context() {
        let graph = GraphContext::root();
        let other = GraphContext::nested(&graph).unwrap();
        let node = Node::new(&graph).unwrap();

        assert!(matches!(
            other.add(node.clone()),
            Err(Error::AlreadyAttached { context, .. }) if context == graph.id()
        ));
        assert!(!other.contains(&node.id()));
    }

    #[test]
    fn test_cycles_are_rejected() {
        let graph = GraphContext::root();
        let outer = GraphContext::nested(&graph).unwrap();
        let inner = GraphContext::nested(&outer).unwrap();

        graph.remove(&outer.id()).unwrap();
        assert!(matches!(
            inner.add(outer.clone()),
            Err(Error::CyclicMembership { .. })
        ));
        assert!(matches!(
            outer.add(outer.clone()),
            Err(Error::DuplicateMember { .. }) | Err(Error::CyclicMembership { .. })
        ));
        assert!(matches!(
            inner.add(GraphContext::root()),
            Err(Error::RootNotNestable)
        ));
    }

    #[test]
    fn test_depth_limit() {
        let graph = GraphContext::root();
        let mut current = graph.clone();
        for _ in 0..MAX_CONTEXT_DEPTH {
            current = GraphContext::nested(&current).unwrap();
        }
        assert!(matches!(
            GraphContext::nested(&current),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_depth_limit_counts_attached_subtree() {
        let graph = GraphContext::root();
        let top = GraphContext::nested(&graph).unwrap();
        let mut current = top.clone();
        for _ in 1..MAX_CONTEXT_DEPTH - 1 {
            current = GraphContext::nested(&current).unwrap();
        }
        assert_eq!(current.depth(), MAX_CONTEXT_DEPTH - 1);
        assert_eq!(top.height(), MAX_CONTEXT_DEPTH - 2);

        let mut host = graph.clone();
        for _ in 0..11 {
            host = GraphContext::nested(&host).unwrap();
        }
        graph.remove(&top.id()).unwrap();

        assert!(matches!(
            host.add(top.clone()),
            Err(Error::Validation(_))
        ));
        assert!(top.parent().is_none());
        assert!(!host.contains(&top.id()));

        graph.add(top.clone()).unwrap();
        assert_eq!(current.depth(), MAX_CONTEXT_DEPTH - 1);
    }

    #[test]
    fn test_notify_removal_requires_detached_context() {
        let graph = GraphContext::root();
        let team = GraphContext::nested(&graph).unwrap();
        let a = Node::new(&team).unwrap();
        let b = Node::new(&graph).unwrap();
        let edge = Edge::new(&a, &b).unwrap();

        assert!(matches!(
            team.notify_removal(),
            Err(Error::AlreadyAttached { context, .. }) if context == graph.id()
        ));
        assert!(!edge.is_orphaned());

        graph.remove(&team.id()).unwrap();
        assert!(edge.is_orphaned());
    }

    #[test]
    fn test_remove_missing_member() {
        let graph = GraphContext::root();
        let missing = Identifier::generate(EntityKind::Node);
        assert!(matches!(
            graph.remove(&missing),
            Err(Error::MemberNotFound { member, .. }) if member == missing
        ));
    }

    #[test]
    fn test_remove_notifies_member_observers() {
        let graph = GraphContext::root();
        let node = Node::new(&graph).unwrap();
        let notified = Rc::new(Cell::new(false));

        let flag = notified.clone();
        node.attach(Rc::new(CallbackObserver::new(
            Identifier::generate(EntityKind::Edge),
            move |_| {
                flag.set(true);
                Ok(())
            },
        )));

        let removed = graph.remove(&node.id()).unwrap();
        assert!(notified.get());
        assert_eq!(removed.id(), node.id());
        assert!(!graph.contains(&node.id()));
    }

    #[test]
    fn test_removing_context_cascades_to_members() {
        let graph = GraphContext::root();
        let team = GraphContext::nested(&graph).unwrap();
        let squad = GraphContext::nested(&team).unwrap();
        let alice = Node::new(&team).unwrap();
        let bob = Node::new(&squad).unwrap();
        let carol = Node::new(&graph).unwrap();

        let ab = Edge::new(&alice, &bob).unwrap();
        let bc = Edge::new(&bob, &carol).unwrap();

        graph.remove(&team.id()).unwrap();

        assert!(ab.is_orphaned());
        assert!(bc.is_orphaned());
        assert!(carol.edges().is_empty());
        // the detached subtree stays intact
        assert!(team.contains(&squad.id()));
        assert!(squad.contains(&bob.id()));
        assert!(team.parent().is_none());
    }

    #[test]
    fn test_observer_failures_do_not_stop_cascade() {
        let graph = GraphContext::root();
        let team = GraphContext::nested(&graph).unwrap();
        let a = Node::new(&team).unwrap();
        let b = Node::new(&team).unwrap();
        let reached = Rc::new(Cell::new(0));

        team.attach(Rc::new(CallbackObserver::new(
            Identifier::generate(EntityKind::Node),
            |_| Err("team observer".to_string()),
        )));
        a.attach(Rc::new(CallbackObserver::new(
            Identifier::generate(EntityKind::Node),
            |_| Err("a observer".to_string()),
        )));
        let counter = reached.clone();
        b.attach(Rc::new(CallbackObserver::new(
            Identifier::generate(EntityKind::Node),
            move |_| {
                counter.set(counter.get() + 1);
                Ok(())
            },
        )));

        let err = graph.remove(&team.id()).unwrap_err();
        assert_eq!(err.observer_failures().len(), 2);
        assert_eq!(reached.get(), 1);
        assert!(!graph.contains(&team.id()));
    }

    #[test]
    fn test_context_snapshot() {
        let graph = GraphContext::root();
        let team = GraphContext::nested(&graph).unwrap();
        let node = Node::new(&team).unwrap();

        let snapshot = team.snapshot();
        assert_eq!(snapshot.parent, Some(graph.id()));
        assert_eq!(snapshot.members, vec![node.id()]);

        let map = team.to_map();
        assert_eq!(map["parent"], graph.id().to_string());
        assert_eq!(map["members"][0], node.id().to_string());

        let json = serde_json::to_string(&snapshot).unwrap();
        let back: ContextSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snapshot);
    }
}
