//! Cascading removal notifications
//!
//! Every hookable entity owns a [`HookRegistry`]. Parties interested in the
//! entity's removal attach a [`RemovalObserver`]; when the entity is removed
//! from its context the registry calls each observer in attachment order.
//! A failing observer never stops the fan-out: failures are gathered and
//! handed back to the caller as one batch.

use crate::entity::Entity;
use crate::error::{Error, Result};
use crate::identifier::Identifier;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Failure reported by a single observer
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("observer {observer} failed: {message}")]
pub struct ObserverError {
    pub observer: Identifier,
    pub message: String,
}

impl ObserverError {
    pub fn new(observer: Identifier, message: impl Into<String>) -> Self {
        Self {
            observer,
            message: message.into(),
        }
    }
}

/// Party reacting to the removal of an entity it depends on
pub trait RemovalObserver {
    /// Key under which the observer is registered
    fn observer_id(&self) -> Identifier;

    /// Called once the observed entity has been removed
    fn on_removal(&self, removed: Identifier) -> std::result::Result<(), ObserverError>;
}

/// Observer backed by a closure
pub struct CallbackObserver<F> {
    id: Identifier,
    callback: F,
}

impl<F> CallbackObserver<F>
where
    F: Fn(Identifier) -> std::result::Result<(), String>,
{
    pub fn new(id: Identifier, callback: F) -> Self {
        Self { id, callback }
    }
}

impl<F> RemovalObserver for CallbackObserver<F>
where
    F: Fn(Identifier) -> std::result::Result<(), String>,
{
    fn observer_id(&self) -> Identifier {
        self.id
    }

    fn on_removal(&self, removed: Identifier) -> std::result::Result<(), ObserverError> {
        (self.callback)(removed).map_err(|message| ObserverError::new(self.id, message))
    }
}

/// Observers registered against one entity
pub struct HookRegistry {
    owner: Identifier,
    observers: RefCell<Vec<Rc<dyn RemovalObserver>>>,
}

impl HookRegistry {
    pub fn new(owner: Identifier) -> Self {
        Self {
            owner,
            observers: RefCell::new(Vec::new()),
        }
    }

    pub fn owner(&self) -> Identifier {
        self.owner
    }

    /// Register an observer. Returns false if its id is already attached.
    pub fn attach(&self, observer: Rc<dyn RemovalObserver>) -> bool {
        let mut observers = self.observers.borrow_mut();
        let id = observer.observer_id();
        if observers.iter().any(|o| o.observer_id() == id) {
            return false;
        }
        observers.push(observer);
        true
    }

    /// Unregister an observer. Returns false if it was not attached.
    pub fn detach(&self, observer: &Identifier) -> bool {
        let mut observers = self.observers.borrow_mut();
        let before = observers.len();
        observers.retain(|o| o.observer_id() != *observer);
        observers.len() != before
    }

    pub fn is_attached(&self, observer: &Identifier) -> bool {
        self.observers
            .borrow()
            .iter()
            .any(|o| o.observer_id() == *observer)
    }

    pub fn observer_ids(&self) -> Vec<Identifier> {
        self.observers
            .borrow()
            .iter()
            .map(|o| o.observer_id())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.observers.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.borrow().is_empty()
    }

    /// Signal removal of the owner to every attached observer.
    pub fn notify_removal(&self) -> Result<()> {
        let failures = self.collect_failures();
        if failures.is_empty() {
            Ok(())
        } else {
            Err(Error::ObserverFailures {
                entity: self.owner,
                failures,
            })
        }
    }

    /// Notify every observer and return the failures instead of an error.
    pub(crate) fn collect_failures(&self) -> Vec<ObserverError> {
        // Observers commonly detach themselves while being notified.
        let observers: Vec<Rc<dyn RemovalObserver>> = self.observers.borrow().clone();
        let mut failures = Vec::new();
        for observer in observers {
            if let Err(err) = observer.on_removal(self.owner) {
                tracing::warn!(
                    entity = %self.owner,
                    observer = %err.observer,
                    "Removal observer failed: {}",
                    err.message
                );
                failures.push(err);
            }
        }
        failures
    }
}

impl fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookRegistry")
            .field("owner", &self.owner)
            .field("observers", &self.observer_ids())
            .finish()
    }
}

/// Entities that accept removal observers
pub trait Hookable: Entity {
    fn hooks(&self) -> &HookRegistry;

    fn attach(&self, observer: Rc<dyn RemovalObserver>) -> bool {
        self.hooks().attach(observer)
    }

    fn detach(&self, observer: &Identifier) -> bool {
        self.hooks().detach(observer)
    }

    fn notify_removal(&self) -> Result<()> {
        self.hooks().notify_removal()
    }
}
