//! Built-in lifecycle events
//!
//! The dispatcher reports its own activity through five internal, synchronous
//! events. They are ordinary descriptors, so observers subscribe to them like
//! to any other event:
//!
//! ```ignore
//! let dispatcher = EventDispatcher::new();
//! dispatcher.subscribe(
//!     &dispatcher.core_events().subscriber_error,
//!     Handler::sync(|ctx| {
//!         let report = ctx.payload();
//!         tracing::error!(event = %report.event.name, error = %report.error, "Subscriber failed");
//!         Ok(None)
//!     }),
//! )?;
//! ```
//!
//! Lifecycle events are internal: triggering them never emits further
//! lifecycle events, and failures of their own subscribers are logged, not
//! reported through `core:subscriber_error`.

use crate::{
    context::{AnyValue, ContextSummary},
    error::SharedError,
    handler::SubscriberInfo,
    types::{EventDescriptor, EventInfo},
};

/// Name of the event fired before a subscriber chain runs
pub const BEFORE_TRIGGER: &str = "core:before_trigger";

/// Name of the event fired after a subscriber chain ran
pub const AFTER_TRIGGER: &str = "core:after_trigger";

/// Name of the event fired when a subscriber fails
pub const SUBSCRIBER_ERROR: &str = "core:subscriber_error";

/// Name of the event fired when a subscriber is added
pub const SUBSCRIBER_REGISTERED: &str = "core:subscriber_registered";

/// Name of the event fired when a subscriber is removed
pub const SUBSCRIBER_REMOVED: &str = "core:subscriber_removed";

/// Trigger options as seen by lifecycle observers
#[derive(Debug, Clone)]
pub struct TriggerOptionsInfo {
    /// The caller's initial-result override, if one was given
    pub initial_result: Option<AnyValue>,

    /// Whether captured subscriber errors are returned to the caller
    pub throw_on_error: bool,

    /// Metadata attached to the invocation
    pub metadata: serde_json::Value,
}

/// Payload of `core:before_trigger`
#[derive(Debug, Clone)]
pub struct BeforeTriggerEvent {
    /// The event about to run
    pub event: EventInfo,

    /// The trigger payload, type-erased
    pub payload: AnyValue,

    /// Options passed to the trigger call
    pub options: TriggerOptionsInfo,
}

/// Payload of `core:after_trigger`
#[derive(Debug, Clone)]
pub struct AfterTriggerEvent {
    /// The event that ran
    pub event: EventInfo,

    /// Final state of the invocation
    pub context: ContextSummary,
}

/// Payload of `core:subscriber_error`
#[derive(Debug, Clone)]
pub struct SubscriberErrorEvent {
    /// The event whose subscriber failed
    pub event: EventInfo,

    /// The captured error
    pub error: SharedError,

    /// State of the invocation right after the failure
    pub context: ContextSummary,
}

/// Payload of `core:subscriber_registered`
#[derive(Debug, Clone)]
pub struct SubscriberRegisteredEvent {
    /// The event subscribed to
    pub event: EventInfo,

    /// The added subscriber
    pub subscriber: SubscriberInfo,
}

/// Payload of `core:subscriber_removed`
#[derive(Debug, Clone)]
pub struct SubscriberRemovedEvent {
    /// The event unsubscribed from
    pub event: EventInfo,

    /// The removed subscriber
    pub subscriber: SubscriberInfo,
}

/// The five lifecycle descriptors
#[derive(Debug, Clone)]
pub struct CoreEvents {
    /// `core:before_trigger`
    pub before_trigger: EventDescriptor<BeforeTriggerEvent>,

    /// `core:after_trigger`
    pub after_trigger: EventDescriptor<AfterTriggerEvent>,

    /// `core:subscriber_error`
    pub subscriber_error: EventDescriptor<SubscriberErrorEvent>,

    /// `core:subscriber_registered`
    pub subscriber_registered: EventDescriptor<SubscriberRegisteredEvent>,

    /// `core:subscriber_removed`
    pub subscriber_removed: EventDescriptor<SubscriberRemovedEvent>,
}

impl CoreEvents {
    pub fn new() -> Self {
        Self {
            before_trigger: EventDescriptor::sync(BEFORE_TRIGGER)
                .with_description("Fired before the subscribers of an event run")
                .as_internal(),
            after_trigger: EventDescriptor::sync(AFTER_TRIGGER)
                .with_description("Fired after the subscribers of an event ran")
                .as_internal(),
            subscriber_error: EventDescriptor::sync(SUBSCRIBER_ERROR)
                .with_description("Fired when a subscriber fails")
                .as_internal(),
            subscriber_registered: EventDescriptor::sync(SUBSCRIBER_REGISTERED)
                .with_description("Fired when a subscriber is added to an event")
                .as_internal(),
            subscriber_removed: EventDescriptor::sync(SUBSCRIBER_REMOVED)
                .with_description("Fired when a subscriber is removed from an event")
                .as_internal(),
        }
    }

    /// Names of all lifecycle events
    pub fn names() -> [&'static str; 5] {
        [
            BEFORE_TRIGGER,
            AFTER_TRIGGER,
            SUBSCRIBER_ERROR,
            SUBSCRIBER_REGISTERED,
            SUBSCRIBER_REMOVED,
        ]
    }
}

impl Default for CoreEvents {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EventMode;

    #[test]
    fn test_core_events_are_internal_and_sync() {
        let core = CoreEvents::new();
        let infos = [
            core.before_trigger.info(),
            core.after_trigger.info(),
            core.subscriber_error.info(),
            core.subscriber_registered.info(),
            core.subscriber_removed.info(),
        ];

        for (info, name) in infos.iter().zip(CoreEvents::names()) {
            assert_eq!(info.name, name);
            assert!(info.internal);
            assert_eq!(info.mode, EventMode::Sync);
            assert!(info.description.is_some());
        }
    }
}
