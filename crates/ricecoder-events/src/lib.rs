//! RiceCoder Events
//!
//! Typed, in-process publish/subscribe dispatcher.
//!
//! # Overview
//!
//! Components declare events with an [`EventDescriptor`] that fixes the event's
//! name, its payload and result types and whether it runs synchronously or
//! asynchronously. Subscribers attach a [`Handler`] to a descriptor. Triggering
//! an event runs every subscriber in registration order against a shared
//! [`EventContext`], through which subscribers read the payload, replace the
//! accumulated result or stop the chain.
//!
//! # Architecture
//!
//! 1. **Types** (`types`): Event descriptors, modes and trigger options
//! 2. **Handlers** (`handler`): The sync and async subscriber shapes
//! 3. **Context** (`context`): Per-invocation state shared along the chain
//! 4. **Registry** (`registry`): Name-indexed descriptors and subscriber sets
//! 5. **Dispatcher** (`dispatcher`): Subscription management and the trigger algorithm
//! 6. **Lifecycle** (`lifecycle`): Events the dispatcher emits about its own activity
//! 7. **Configuration** (`config`): Dispatcher options loaded from YAML
//!
//! # Quick Start
//!
//! ```ignore
//! use ricecoder_events::{EventDescriptor, EventDispatcher, Handler, TriggerOptions};
//!
//! let dispatcher = EventDispatcher::new();
//! let file_saved: EventDescriptor<String, Vec<String>> =
//!     EventDescriptor::sync("file_saved").with_initial_result(Vec::new);
//!
//! dispatcher.subscribe(&file_saved, Handler::sync(|ctx| {
//!     let mut seen = ctx.result().cloned().unwrap_or_default();
//!     seen.push(ctx.payload().clone());
//!     Ok(Some(seen))
//! }))?;
//!
//! let ctx = dispatcher.trigger(&file_saved, "src/main.rs".to_string(), TriggerOptions::new())?;
//! assert_eq!(ctx.result(), Some(&vec!["src/main.rs".to_string()]));
//! # Ok::<(), ricecoder_events::EventsError>(())
//! ```
//!
//! # Lifecycle Events
//!
//! Unless disabled through [`DispatcherConfig`], every dispatcher registers five
//! internal events (`core:before_trigger`, `core:after_trigger`,
//! `core:subscriber_error`, `core:subscriber_registered`,
//! `core:subscriber_removed`). They can be subscribed to like any other event
//! but never report on themselves.
//!
//! # Error Handling
//!
//! Registry and trigger operations return `Result<T>`, an alias for
//! `std::result::Result<T, EventsError>`. Subscriber errors are captured on the
//! context unless the trigger asks for them to be returned.
//!
//! # Thread Safety
//!
//! [`EventDispatcher`] is `Send + Sync` and cheap to clone; clones share the
//! same registry.

pub mod config;
pub mod context;
pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod lifecycle;
pub mod registry;
pub mod types;

// Re-export public types
pub use config::DispatcherConfig;
pub use context::{AnyValue, ContextSummary, EventContext};
pub use dispatcher::{EventDispatcher, Subscription, SUBSCRIBER_ERROR_REASON};
pub use error::{BoxError, EventsError, Result, SharedError};
pub use handler::{Callback, Handler, HandlerId, HandlerKind, HandlerResult, SubscriberInfo};
pub use lifecycle::{
    AfterTriggerEvent, BeforeTriggerEvent, CoreEvents, SubscriberErrorEvent,
    SubscriberRegisteredEvent, SubscriberRemovedEvent, TriggerOptionsInfo,
};
pub use registry::EventRegistry;
pub use types::{EventDescriptor, EventInfo, EventKey, EventMode, TriggerOptions};
