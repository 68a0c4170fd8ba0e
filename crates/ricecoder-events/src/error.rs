//! Error types for the event dispatcher
//!
//! Errors fall into three groups:
//!
//! 1. **Configuration errors** are returned directly from registry operations
//!    (conflicting registrations, removing an internal event, triggering an
//!    async event through the synchronous entry point).
//!
//! 2. **Contract violations** are captured on the invocation context. A
//!    future-returning subscriber attached to a synchronous event is the only
//!    one today.
//!
//! 3. **Subscriber errors** are whatever a handler returns as `Err`. They are
//!    captured on the context and only surface as [`EventsError::SubscriberFailed`]
//!    when the caller asked for `throw_on_error`.
//!
//! # Examples
//!
//! ```ignore
//! match dispatcher.trigger(&saved, payload, TriggerOptions::new().throw_on_error()) {
//!     Ok(ctx) => println!("result: {:?}", ctx.result()),
//!     Err(EventsError::SubscriberFailed { event, source }) => {
//!         eprintln!("{} failed: {}", event, source)
//!     }
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use std::sync::Arc;

use thiserror::Error;

use crate::types::EventMode;

/// Error returned by a subscriber handler
///
/// Anything convertible into a boxed error works, so handlers can use `?`
/// on their own error types or return `Err("message".into())`.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error captured on an invocation context
///
/// Shared so the same error can sit on the context, travel through the
/// subscriber-error lifecycle event and be re-raised to the caller.
pub type SharedError = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur in the event dispatcher
#[derive(Debug, Error)]
pub enum EventsError {
    /// An event name is already bound to a different execution mode
    ///
    /// A name keeps the mode it was first registered with for the lifetime
    /// of the dispatcher.
    #[error("Event '{name}' is already registered as {existing}, cannot register it as {requested}")]
    ModeConflict {
        name: String,
        existing: EventMode,
        requested: EventMode,
    },

    /// An event name is already bound to different payload or result types
    #[error("Event '{name}' is already registered with different payload or result types")]
    TypeConflict { name: String },

    /// Attempt to remove an internal (lifecycle) event
    #[error("Cannot remove internal event '{0}'")]
    ProtectedEvent(String),

    /// The synchronous trigger entry point was used for an async event
    ///
    /// Recovery: use `trigger_async` for events declared with
    /// [`EventMode::Async`].
    #[error("Event '{name}' is {mode} and must be triggered with trigger_async")]
    ModeMismatch { name: String, mode: EventMode },

    /// A future-returning subscriber was attached to a synchronous event
    ///
    /// This error is captured on the invocation context rather than returned.
    #[error("Subscriber for synchronous event '{0}' returned a future")]
    AsyncSubscriberOnSyncEvent(String),

    /// A subscriber failed and the caller requested `throw_on_error`
    #[error("Subscriber for event '{event}' failed: {source}")]
    SubscriberFailed {
        event: String,
        #[source]
        source: SharedError,
    },

    /// Invalid dispatcher configuration
    #[error("Invalid dispatcher configuration: {0}")]
    InvalidConfiguration(String),

    /// Serialization error
    ///
    /// Wraps `serde_yaml::Error` for configuration parsing failures.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_yaml::Error),
}

/// Result type for dispatcher operations
pub type Result<T> = std::result::Result<T, EventsError>;
