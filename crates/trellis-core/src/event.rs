//! Named events emitted by entities

use crate::identifier::Identifier;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Emitted by a node after it moved to another context
pub const MODIFIED: &str = "modified";

/// An event delivered to listeners
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub name: String,
    pub source: Identifier,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

type Listener = Rc<dyn Fn(&Event)>;

/// Listener table of one entity
pub struct EventEmitter {
    source: Identifier,
    listeners: RefCell<Vec<(String, Listener)>>,
}

impl EventEmitter {
    pub fn new(source: Identifier) -> Self {
        Self {
            source,
            listeners: RefCell::new(Vec::new()),
        }
    }

    /// Subscribe to events called `name`
    pub fn on<F>(&self, name: impl Into<String>, listener: F)
    where
        F: Fn(&Event) + 'static,
    {
        self.listeners
            .borrow_mut()
            .push((name.into(), Rc::new(listener)));
    }

    /// Deliver an event synchronously; returns how many listeners saw it
    pub fn emit(&self, name: &str, payload: Option<Value>) -> usize {
        let event = Event {
            name: name.to_string(),
            source: self.source,
            payload,
        };
        let listeners: Vec<Listener> = self
            .listeners
            .borrow()
            .iter()
            .filter(|(n, _)| n == name)
            .map(|(_, l)| l.clone())
            .collect();
        tracing::trace!(source = %self.source, event = name, listeners = listeners.len(), "Emitting event");
        for listener in &listeners {
            listener(&event);
        }
        listeners.len()
    }

    pub fn listener_count(&self, name: &str) -> usize {
        self.listeners
            .borrow()
            .iter()
            .filter(|(n, _)| n == name)
            .count()
    }
}

impl fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventEmitter")
            .field("source", &self.source)
            .field("listeners", &self.listeners.borrow().len())
            .finish()
    }
}
