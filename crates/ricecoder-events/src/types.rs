//! Core data types for the event dispatcher
//!
//! This module defines event descriptors, their execution mode, and the
//! options accepted by a trigger call.
//!
//! # Examples
//!
//! Declaring a synchronous event whose result starts at zero:
//!
//! ```ignore
//! use ricecoder_events::*;
//!
//! let file_saved: EventDescriptor<FileSaved, u32> = EventDescriptor::sync("file_saved")
//!     .with_description("A file was written to disk")
//!     .with_metadata(serde_json::json!({ "source": "editor" }))
//!     .with_initial_result(|| 0);
//! ```

use std::{fmt, marker::PhantomData, sync::Arc};

use serde::{Deserialize, Serialize};

/// Execution mode of an event
///
/// The mode is fixed when the descriptor is created. Subscribers of a
/// [`EventMode::Sync`] event must be plain closures; subscribers of an
/// [`EventMode::Async`] event may also return futures, which are awaited one
/// after the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventMode {
    /// Subscribers run inline and the trigger returns immediately
    Sync,

    /// Subscribers are awaited sequentially
    Async,
}

impl fmt::Display for EventMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventMode::Sync => write!(f, "sync"),
            EventMode::Async => write!(f, "async"),
        }
    }
}

/// Type-erased, serializable view of an event descriptor
///
/// Returned by registry lookups and carried by lifecycle payloads, where the
/// payload and result types of the described event are not known.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventInfo {
    /// Unique event name
    pub name: String,

    /// Execution mode
    pub mode: EventMode,

    /// Optional human-readable description
    pub description: Option<String>,

    /// Arbitrary metadata attached by the declaring code
    pub metadata: serde_json::Value,

    /// Whether the event is internal (no lifecycle notifications, not removable)
    pub internal: bool,
}

impl EventInfo {
    fn new(name: String, mode: EventMode) -> Self {
        Self {
            name,
            mode,
            description: None,
            metadata: serde_json::json!({}),
            internal: false,
        }
    }
}

type InitialResultFn<R> = Arc<dyn Fn() -> R + Send + Sync>;

/// Declaration of an event
///
/// `P` is the payload type passed to subscribers and `R` the type of the
/// result value that flows through the subscriber chain. Descriptors are
/// plain values: creating one has no side effects and never fails. Two
/// descriptors with the same name refer to the same event once registered.
pub struct EventDescriptor<P, R = ()> {
    info: EventInfo,
    initial_result: Option<InitialResultFn<R>>,
    _payload: PhantomData<fn() -> P>,
}

impl<P, R> EventDescriptor<P, R> {
    /// Create a descriptor with the given name and mode
    pub fn new(name: impl Into<String>, mode: EventMode) -> Self {
        Self {
            info: EventInfo::new(name.into(), mode),
            initial_result: None,
            _payload: PhantomData,
        }
    }

    /// Create a synchronous event descriptor
    pub fn sync(name: impl Into<String>) -> Self {
        Self::new(name, EventMode::Sync)
    }

    /// Create an asynchronous event descriptor
    pub fn asynchronous(name: impl Into<String>) -> Self {
        Self::new(name, EventMode::Async)
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.info.description = Some(description.into());
        self
    }

    /// Set the metadata
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.info.metadata = metadata;
        self
    }

    /// Set the factory producing the default result of every invocation
    ///
    /// The factory runs once per trigger, unless the trigger supplies its own
    /// initial result.
    pub fn with_initial_result<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> R + Send + Sync + 'static,
    {
        self.initial_result = Some(Arc::new(factory));
        self
    }

    /// Mark the event as internal
    ///
    /// Internal events never emit lifecycle notifications and cannot be
    /// removed from a dispatcher.
    pub fn as_internal(mut self) -> Self {
        self.info.internal = true;
        self
    }

    /// Event name
    pub fn name(&self) -> &str {
        &self.info.name
    }

    /// Execution mode
    pub fn mode(&self) -> EventMode {
        self.info.mode
    }

    /// Description, if any
    pub fn description(&self) -> Option<&str> {
        self.info.description.as_deref()
    }

    /// Metadata
    pub fn metadata(&self) -> &serde_json::Value {
        &self.info.metadata
    }

    /// Whether the event is internal
    pub fn is_internal(&self) -> bool {
        self.info.internal
    }

    /// Type-erased view of this descriptor
    pub fn info(&self) -> &EventInfo {
        &self.info
    }

    /// Whether the descriptor declares an initial-result factory
    pub fn has_initial_result(&self) -> bool {
        self.initial_result.is_some()
    }

    /// Run the initial-result factory
    pub fn create_initial_result(&self) -> Option<R> {
        self.initial_result.as_ref().map(|factory| factory())
    }
}

impl<P, R> Clone for EventDescriptor<P, R> {
    fn clone(&self) -> Self {
        Self {
            info: self.info.clone(),
            initial_result: self.initial_result.clone(),
            _payload: PhantomData,
        }
    }
}

impl<P, R> fmt::Debug for EventDescriptor<P, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventDescriptor")
            .field("name", &self.info.name)
            .field("mode", &self.info.mode)
            .field("internal", &self.info.internal)
            .field("has_initial_result", &self.initial_result.is_some())
            .finish()
    }
}

/// Anything that identifies an event by name
///
/// Lookups accept a plain name or any descriptor, so callers can write
/// `dispatcher.has_event("file_saved")` as well as
/// `dispatcher.has_event(&file_saved)`.
pub trait EventKey {
    /// Name of the event
    fn event_name(&self) -> &str;
}

impl EventKey for str {
    fn event_name(&self) -> &str {
        self
    }
}

impl EventKey for String {
    fn event_name(&self) -> &str {
        self
    }
}

impl EventKey for EventInfo {
    fn event_name(&self) -> &str {
        &self.name
    }
}

impl<P, R> EventKey for EventDescriptor<P, R> {
    fn event_name(&self) -> &str {
        self.name()
    }
}

/// Options for a single trigger call
///
/// # Examples
///
/// ```ignore
/// let options = TriggerOptions::new()
///     .with_initial_result(7)
///     .with_metadata(serde_json::json!({ "user": "alice" }))
///     .throw_on_error();
/// ```
#[derive(Debug, Clone)]
pub struct TriggerOptions<R> {
    /// Overrides the descriptor's initial-result factory when present
    pub initial_result: Option<R>,

    /// Return captured subscriber errors as `Err` instead of only recording them
    pub throw_on_error: bool,

    /// Read-only metadata attached to the invocation context
    pub metadata: serde_json::Value,
}

impl<R> TriggerOptions<R> {
    /// Default options: no override, errors captured, empty metadata
    pub fn new() -> Self {
        Self {
            initial_result: None,
            throw_on_error: false,
            metadata: serde_json::json!({}),
        }
    }

    /// Start the chain with this result instead of the descriptor's default
    pub fn with_initial_result(mut self, initial_result: R) -> Self {
        self.initial_result = Some(initial_result);
        self
    }

    /// Attach metadata to the invocation context
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }

    /// Return captured subscriber errors to the caller
    pub fn throw_on_error(mut self) -> Self {
        self.throw_on_error = true;
        self
    }
}

impl<R> Default for TriggerOptions<R> {
    fn default() -> Self {
        Self::new()
    }
}
