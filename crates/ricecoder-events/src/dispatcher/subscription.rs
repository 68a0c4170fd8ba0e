//! Subscription handles

use std::sync::atomic::{AtomicBool, Ordering};

use super::EventDispatcher;
use crate::handler::SubscriberInfo;

/// Handle returned by [`EventDispatcher::subscribe`]
///
/// Bound to one handler on one event. Dropping the handle does not
/// unsubscribe.
#[derive(Debug)]
pub struct Subscription {
    dispatcher: EventDispatcher,
    event_name: String,
    subscriber: SubscriberInfo,
    active: AtomicBool,
}

impl Subscription {
    pub(crate) fn new(dispatcher: EventDispatcher, event_name: &str, subscriber: SubscriberInfo) -> Self {
        Self {
            dispatcher,
            event_name: event_name.to_string(),
            subscriber,
            active: AtomicBool::new(true),
        }
    }

    /// Name of the subscribed event
    pub fn event_name(&self) -> &str {
        &self.event_name
    }

    /// The subscribed handler
    pub fn subscriber(&self) -> SubscriberInfo {
        self.subscriber
    }

    /// Remove the handler from the event
    ///
    /// Only the first call has an effect; it returns whether the handler was
    /// still subscribed.
    pub fn unsubscribe(&self) -> bool {
        if !self.active.swap(false, Ordering::SeqCst) {
            return false;
        }
        self.dispatcher
            .remove_subscriber(&self.event_name, self.subscriber)
    }
}
