//! Event bus for decoupled communication between the controller and the UI.
//!
//! The bus is single-threaded (WASM constraint) and uses interior mutability
//! via RefCell. Events are delivered synchronously to subscribers as they
//! are emitted; nothing is buffered, so an event with no subscriber is gone.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use chat_types::event::ControllerEvent;

type Listener = Rc<dyn Fn(&ControllerEvent)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Shared event bus — clone-cheap via Rc.
#[derive(Clone)]
pub struct EventBus {
    listeners: Rc<RefCell<Vec<(SubscriptionId, Listener)>>>,
    next_id: Rc<Cell<u64>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            listeners: Rc::new(RefCell::new(Vec::new())),
            next_id: Rc::new(Cell::new(0)),
        }
    }

    /// Publish an event. Subscribers run before this returns.
    pub fn emit(&self, event: ControllerEvent) {
        // Snapshot so a listener may subscribe or unsubscribe re-entrantly.
        let listeners: Vec<Listener> = self
            .listeners
            .borrow()
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        for listener in listeners {
            listener(&event);
        }
    }

    pub fn subscribe(&self, listener: impl Fn(&ControllerEvent) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.listeners.borrow_mut().push((id, Rc::new(listener)));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        let before = listeners.len();
        listeners.retain(|(sid, _)| *sid != id);
        listeners.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.listeners.borrow().len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
