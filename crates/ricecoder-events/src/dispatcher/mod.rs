//! Event dispatcher
//!
//! The [`EventDispatcher`] owns a registry of events and their subscriber
//! chains. It is responsible for:
//!
//! 1. Registering descriptors and enforcing one mode and one type pair per name
//! 2. Adding and removing subscribers in registration order
//! 3. Triggering events: running the chain and returning the context
//! 4. Reporting its own activity through the lifecycle events
//!
//! # Examples
//!
//! ```ignore
//! let dispatcher = EventDispatcher::new();
//! let counted: EventDescriptor<String, u32> =
//!     EventDescriptor::sync("counted").with_initial_result(|| 0);
//!
//! dispatcher.subscribe(&counted, Handler::sync(|ctx| {
//!     Ok(Some(ctx.result().copied().unwrap_or(0) + ctx.payload().len() as u32))
//! }))?;
//!
//! let ctx = dispatcher.trigger(&counted, "hello".to_string(), TriggerOptions::new())?;
//! assert_eq!(ctx.result(), Some(&5));
//! ```

mod subscription;
mod trigger;

pub use subscription::Subscription;
pub use trigger::SUBSCRIBER_ERROR_REASON;

use std::{fmt, sync::Arc};

use tracing::debug;

use crate::{
    config::DispatcherConfig,
    error::Result,
    handler::{Handler, SubscriberInfo},
    lifecycle::{CoreEvents, SubscriberRegisteredEvent, SubscriberRemovedEvent},
    registry::EventRegistry,
    types::{EventDescriptor, EventInfo, EventKey},
};

/// Typed, in-process event dispatcher
///
/// Cloning a dispatcher is cheap; clones share the same registry. A
/// dispatcher never holds its registry lock while subscribers run, so
/// subscribers may subscribe, unsubscribe and trigger events themselves.
#[derive(Clone)]
pub struct EventDispatcher {
    registry: Arc<EventRegistry>,
    core: Arc<CoreEvents>,
}

impl EventDispatcher {
    /// Create a dispatcher with the lifecycle events pre-registered
    pub fn new() -> Self {
        Self::with_config(DispatcherConfig::default())
    }

    /// Create a dispatcher from configuration
    pub fn with_config(config: DispatcherConfig) -> Self {
        let dispatcher = Self {
            registry: Arc::new(EventRegistry::new()),
            core: Arc::new(CoreEvents::new()),
        };

        if config.include_core_events {
            let core = &dispatcher.core;
            dispatcher.registry.install(&core.before_trigger);
            dispatcher.registry.install(&core.after_trigger);
            dispatcher.registry.install(&core.subscriber_error);
            dispatcher.registry.install(&core.subscriber_registered);
            dispatcher.registry.install(&core.subscriber_removed);
        }

        debug!(
            include_core_events = config.include_core_events,
            "Created event dispatcher"
        );
        dispatcher
    }

    /// The lifecycle descriptors used by this dispatcher
    pub fn core_events(&self) -> &CoreEvents {
        &self.core
    }

    /// Register an event
    ///
    /// Registering a name that is already known with the same mode and types
    /// returns the descriptor stored first; that stored descriptor (and its
    /// initial-result factory) is used for every later trigger of the name.
    ///
    /// # Errors
    ///
    /// Returns [`EventsError::ModeConflict`](crate::EventsError::ModeConflict)
    /// or [`EventsError::TypeConflict`](crate::EventsError::TypeConflict) when
    /// the name is bound to another mode or other types.
    pub fn register_event<P, R>(&self, descriptor: &EventDescriptor<P, R>) -> Result<EventDescriptor<P, R>>
    where
        P: 'static,
        R: 'static,
    {
        self.registry.register(descriptor)
    }

    /// Subscribe a handler to an event, registering the event if needed
    ///
    /// Subscribing a handler that is already subscribed changes nothing and
    /// emits no lifecycle notification, but still returns a handle.
    pub fn subscribe<P, R>(
        &self,
        descriptor: &EventDescriptor<P, R>,
        handler: Handler<P, R>,
    ) -> Result<Subscription>
    where
        P: 'static,
        R: 'static,
    {
        let subscriber = handler.info();
        let (canonical, added) = self.registry.subscribe(descriptor, handler)?;

        if added {
            debug!(
                event = %canonical.name(),
                handler = %subscriber.id,
                kind = ?subscriber.kind,
                "Subscribed handler"
            );
            if !canonical.is_internal() {
                self.notify(&self.core.subscriber_registered, || SubscriberRegisteredEvent {
                    event: canonical.info().clone(),
                    subscriber,
                });
            }
        } else {
            debug!(
                event = %canonical.name(),
                handler = %subscriber.id,
                "Handler already subscribed"
            );
        }

        Ok(Subscription::new(self.clone(), canonical.name(), subscriber))
    }

    /// Unsubscribe a handler
    ///
    /// Returns `false` when the event is unknown or the handler is not
    /// subscribed.
    pub fn unsubscribe<P, R>(&self, descriptor: &EventDescriptor<P, R>, handler: &Handler<P, R>) -> bool {
        self.remove_subscriber(descriptor.name(), handler.info())
    }

    pub(crate) fn remove_subscriber(&self, name: &str, subscriber: SubscriberInfo) -> bool {
        let event = match self.registry.remove_subscriber(name, subscriber.id) {
            Some(event) => event,
            None => return false,
        };

        debug!(event = %name, handler = %subscriber.id, "Unsubscribed handler");
        if !event.internal {
            self.notify(&self.core.subscriber_removed, || SubscriberRemovedEvent {
                event,
                subscriber,
            });
        }
        true
    }

    /// Remove every subscriber of an event
    ///
    /// Returns the number of removed subscribers. Each removal from a
    /// non-internal event is reported through `core:subscriber_removed`.
    pub fn clear_subscribers<K: EventKey + ?Sized>(&self, key: &K) -> usize {
        let (event, removed) = match self.registry.clear_subscribers(key.event_name()) {
            Some(cleared) => cleared,
            None => return 0,
        };

        debug!(event = %event.name, count = removed.len(), "Cleared subscribers");
        if !event.internal {
            for subscriber in &removed {
                self.notify(&self.core.subscriber_removed, || SubscriberRemovedEvent {
                    event: event.clone(),
                    subscriber: *subscriber,
                });
            }
        }
        removed.len()
    }

    /// Whether an event is registered
    pub fn has_event<K: EventKey + ?Sized>(&self, key: &K) -> bool {
        self.registry.contains(key.event_name())
    }

    /// Info of a registered event
    pub fn get_event<K: EventKey + ?Sized>(&self, key: &K) -> Option<EventInfo> {
        self.registry.info(key.event_name())
    }

    /// Typed descriptor stored for a name
    ///
    /// Returns `None` when the name is unknown or registered with other types.
    pub fn get_descriptor<P, R>(&self, name: &str) -> Option<EventDescriptor<P, R>>
    where
        P: 'static,
        R: 'static,
    {
        self.registry.descriptor(name)
    }

    /// Info of every registered event, sorted by name
    pub fn list_events(&self) -> Vec<EventInfo> {
        self.registry.list()
    }

    /// Number of subscribers of an event; 0 for unknown events
    pub fn get_subscriber_count<K: EventKey + ?Sized>(&self, key: &K) -> usize {
        self.registry.subscriber_count(key.event_name())
    }

    /// Remove an event and all its subscribers
    ///
    /// Returns `false` when the event is unknown.
    ///
    /// # Errors
    ///
    /// Returns [`EventsError::ProtectedEvent`](crate::EventsError::ProtectedEvent)
    /// for internal events.
    pub fn remove_event<K: EventKey + ?Sized>(&self, key: &K) -> Result<bool> {
        self.registry.remove(key.event_name())
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("registry", &self.registry)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::{error::EventsError, lifecycle};

    fn create_test_event(name: &str) -> EventDescriptor<String, u32> {
        EventDescriptor::sync(name)
    }

    fn create_recording_handler(log: Arc<Mutex<Vec<String>>>) -> Handler<SubscriberRegisteredEvent> {
        Handler::sync(move |ctx: &mut crate::context::EventContext<SubscriberRegisteredEvent, ()>| {
            log.lock().unwrap().push(ctx.payload().event.name.clone());
            Ok(None)
        })
    }

    #[test]
    fn test_new_registers_core_events() {
        let dispatcher = EventDispatcher::new();

        for name in CoreEvents::names() {
            assert!(dispatcher.has_event(name), "missing {}", name);
            assert!(dispatcher.get_event(name).unwrap().internal);
        }
        assert_eq!(dispatcher.list_events().len(), 5);
    }

    #[test]
    fn test_without_core_events() {
        let dispatcher = EventDispatcher::with_config(DispatcherConfig::without_core_events());

        assert!(dispatcher.list_events().is_empty());
        assert!(!dispatcher.has_event(lifecycle::BEFORE_TRIGGER));
    }

    #[test]
    fn test_dispatchers_do_not_share_state() {
        let first = EventDispatcher::new();
        let second = EventDispatcher::new();
        first.register_event(&create_test_event("file_saved")).unwrap();

        assert!(first.has_event("file_saved"));
        assert!(!second.has_event("file_saved"));

        let clone = first.clone();
        assert!(clone.has_event("file_saved"));
    }

    #[test]
    fn test_subscribe_notifies_registration_once() {
        let dispatcher = EventDispatcher::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        dispatcher
            .subscribe(
                &dispatcher.core_events().subscriber_registered,
                create_recording_handler(log.clone()),
            )
            .unwrap();

        let event = create_test_event("file_saved");
        let handler: Handler<String, u32> = Handler::sync(|_ctx| Ok(None));
        dispatcher.subscribe(&event, handler.clone()).unwrap();
        dispatcher.subscribe(&event, handler).unwrap();

        assert_eq!(*log.lock().unwrap(), vec!["file_saved".to_string()]);
        assert_eq!(dispatcher.get_subscriber_count(&event), 1);
    }

    #[test]
    fn test_subscribe_to_internal_event_does_not_notify() {
        let dispatcher = EventDispatcher::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        dispatcher
            .subscribe(
                &dispatcher.core_events().subscriber_registered,
                create_recording_handler(log.clone()),
            )
            .unwrap();

        let handler: Handler<lifecycle::AfterTriggerEvent> = Handler::sync(|_ctx| Ok(None));
        dispatcher
            .subscribe(&dispatcher.core_events().after_trigger, handler)
            .unwrap();

        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn test_unsubscribe() {
        let dispatcher = EventDispatcher::new();
        let removed = Arc::new(Mutex::new(0));
        let removed_clone = removed.clone();
        let observer: Handler<SubscriberRemovedEvent> = Handler::sync(move |_ctx| {
            *removed_clone.lock().unwrap() += 1;
            Ok(None)
        });
        dispatcher
            .subscribe(&dispatcher.core_events().subscriber_removed, observer)
            .unwrap();

        let event = create_test_event("file_saved");
        let handler: Handler<String, u32> = Handler::sync(|_ctx| Ok(None));
        dispatcher.subscribe(&event, handler.clone()).unwrap();

        assert!(dispatcher.unsubscribe(&event, &handler));
        assert!(!dispatcher.unsubscribe(&event, &handler));
        assert_eq!(*removed.lock().unwrap(), 1);
        assert_eq!(dispatcher.get_subscriber_count(&event), 0);
    }

    #[test]
    fn test_unsubscribe_unknown_event() {
        let dispatcher = EventDispatcher::new();
        let event = create_test_event("never_registered");
        let handler: Handler<String, u32> = Handler::sync(|_ctx| Ok(None));

        assert!(!dispatcher.unsubscribe(&event, &handler));
        assert!(!dispatcher.has_event(&event));
    }

    #[test]
    fn test_subscription_handle_unsubscribe_is_idempotent() {
        let dispatcher = EventDispatcher::new();
        let event = create_test_event("file_saved");
        let subscription = dispatcher
            .subscribe(&event, Handler::sync(|_ctx| Ok(None)))
            .unwrap();

        assert_eq!(subscription.event_name(), "file_saved");
        assert!(subscription.unsubscribe());
        assert!(!subscription.unsubscribe());
        assert_eq!(dispatcher.get_subscriber_count(&event), 0);
    }

    #[test]
    fn test_stale_subscription_does_not_remove_new_handler() {
        let dispatcher = EventDispatcher::new();
        let removed = Arc::new(Mutex::new(0));
        let removed_clone = removed.clone();
        let observer: Handler<SubscriberRemovedEvent> = Handler::sync(move |_ctx| {
            *removed_clone.lock().unwrap() += 1;
            Ok(None)
        });
        dispatcher
            .subscribe(&dispatcher.core_events().subscriber_removed, observer)
            .unwrap();
        let event = create_test_event("file_saved");

        for _ in 0..50 {
            let first: Handler<String, u32> = Handler::sync(|_ctx| Ok(None));
            let subscription = dispatcher.subscribe(&event, first.clone()).unwrap();
            assert!(dispatcher.unsubscribe(&event, &first));
            drop(first);

            let second: Handler<String, u32> = Handler::sync(|_ctx| Ok(None));
            dispatcher.subscribe(&event, second.clone()).unwrap();

            assert!(!subscription.unsubscribe());
            assert_eq!(dispatcher.get_subscriber_count(&event), 1);
            assert!(dispatcher.unsubscribe(&event, &second));
        }

        assert_eq!(*removed.lock().unwrap(), 100);
    }

    #[test]
    fn test_remove_event() {
        let dispatcher = EventDispatcher::new();
        let event = create_test_event("file_saved");
        dispatcher.subscribe(&event, Handler::sync(|_ctx| Ok(None))).unwrap();
        dispatcher.subscribe(&event, Handler::sync(|_ctx| Ok(None))).unwrap();
        assert_eq!(dispatcher.get_subscriber_count(&event), 2);

        assert!(dispatcher.remove_event(&event).unwrap());
        assert!(!dispatcher.has_event(&event));
        assert_eq!(dispatcher.get_subscriber_count(&event), 0);
        assert!(!dispatcher.remove_event("file_saved").unwrap());
    }

    #[test]
    fn test_remove_core_event_fails() {
        let dispatcher = EventDispatcher::new();

        for name in CoreEvents::names() {
            let result = dispatcher.remove_event(name);
            assert!(matches!(result, Err(EventsError::ProtectedEvent(_))));
            assert!(dispatcher.has_event(name));
        }
    }

    #[test]
    fn test_clear_subscribers() {
        let dispatcher = EventDispatcher::new();
        let event = create_test_event("file_saved");
        dispatcher.subscribe(&event, Handler::sync(|_ctx| Ok(None))).unwrap();
        dispatcher.subscribe(&event, Handler::sync(|_ctx| Ok(None))).unwrap();

        assert_eq!(dispatcher.clear_subscribers(&event), 2);
        assert_eq!(dispatcher.get_subscriber_count(&event), 0);
        assert!(dispatcher.has_event(&event));
        assert_eq!(dispatcher.clear_subscribers("unknown"), 0);
    }

    #[test]
    fn test_get_descriptor() {
        let dispatcher = EventDispatcher::new();
        let event: EventDescriptor<String, u32> =
            EventDescriptor::sync("file_saved").with_initial_result(|| 42);
        dispatcher.register_event(&event).unwrap();

        let stored = dispatcher.get_descriptor::<String, u32>("file_saved").unwrap();
        assert_eq!(stored.create_initial_result(), Some(42));
        assert!(dispatcher.get_descriptor::<String, String>("file_saved").is_none());
        assert!(dispatcher.get_descriptor::<String, u32>("missing").is_none());
    }
}
