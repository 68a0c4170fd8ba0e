//! Event registry
//!
//! The registry maps event names to their descriptor and ordered subscriber
//! set. Each [`EventDispatcher`](crate::EventDispatcher) owns one registry;
//! clones of a dispatcher share it, separately constructed dispatchers never
//! do.
//!
//! Entries are stored type-erased so events with different payload and
//! result types can live in the same map. The concrete types are recovered
//! by downcasting with the types of the descriptor used for the lookup; a
//! mismatch is reported as [`EventsError::TypeConflict`](crate::EventsError).

pub mod storage;

pub use storage::EventRegistry;

use std::any::Any;

use crate::handler::{Handler, HandlerId, SubscriberInfo};

/// Ordered, duplicate-free subscriber set with its types erased
///
/// Operations that only need handler identities (count, removal) go through
/// this trait; everything that runs handlers downcasts to [`Subscribers`].
pub(crate) trait SubscriberSet: Send + Sync {
    fn len(&self) -> usize;

    fn remove(&mut self, id: HandlerId) -> bool;

    fn clear(&mut self) -> Vec<SubscriberInfo>;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Typed subscriber set of one event
pub(crate) struct Subscribers<P, R> {
    handlers: Vec<Handler<P, R>>,
}

impl<P, R> Subscribers<P, R> {
    pub(crate) fn new() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    /// Append a handler unless it is already present
    pub(crate) fn insert(&mut self, handler: Handler<P, R>) -> bool {
        let id = handler.id();
        if self.handlers.iter().any(|h| h.id() == id) {
            return false;
        }
        self.handlers.push(handler);
        true
    }

    /// Handlers in invocation order
    pub(crate) fn snapshot(&self) -> Vec<Handler<P, R>> {
        self.handlers.clone()
    }
}

impl<P: 'static, R: 'static> SubscriberSet for Subscribers<P, R> {
    fn len(&self) -> usize {
        self.handlers.len()
    }

    fn remove(&mut self, id: HandlerId) -> bool {
        match self.handlers.iter().position(|h| h.id() == id) {
            Some(index) => {
                self.handlers.remove(index);
                true
            }
            None => false,
        }
    }

    fn clear(&mut self) -> Vec<SubscriberInfo> {
        self.handlers.drain(..).map(|h| h.info()).collect()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
