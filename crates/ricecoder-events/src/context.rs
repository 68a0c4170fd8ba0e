//! Invocation context passed through a subscriber chain
//!
//! A fresh [`EventContext`] is built for every trigger call. Subscribers read
//! the payload, update the result and may stop the chain, either normally or
//! because of an error. The context is handed back to the caller once the
//! chain is done.

use std::{any::Any, fmt, sync::Arc};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    error::{BoxError, SharedError},
    types::EventInfo,
};

/// Type-erased shared value (payloads and results in lifecycle events)
pub type AnyValue = Arc<dyn Any + Send + Sync>;

/// Mutable state of one trigger call
///
/// Once stopped, a context stays stopped. `is_stopped_for_error()` implies
/// `is_stopped()`, and `error()` is `Some` exactly when the context was
/// stopped for an error.
pub struct EventContext<P, R> {
    invocation_id: Uuid,
    triggered_at: DateTime<Utc>,
    event: EventInfo,
    payload: Arc<P>,
    result: Option<R>,
    stopped: bool,
    stopped_reason: Option<String>,
    stopped_for_error: bool,
    error: Option<SharedError>,
    metadata: serde_json::Value,
    has_subscribers: bool,
}

impl<P, R> EventContext<P, R> {
    pub(crate) fn new(
        event: EventInfo,
        payload: Arc<P>,
        result: Option<R>,
        metadata: serde_json::Value,
        has_subscribers: bool,
    ) -> Self {
        Self {
            invocation_id: Uuid::new_v4(),
            triggered_at: Utc::now(),
            event,
            payload,
            result,
            stopped: false,
            stopped_reason: None,
            stopped_for_error: false,
            error: None,
            metadata,
            has_subscribers,
        }
    }

    /// Unique id of this invocation
    pub fn invocation_id(&self) -> Uuid {
        self.invocation_id
    }

    /// When the trigger call started
    pub fn triggered_at(&self) -> DateTime<Utc> {
        self.triggered_at
    }

    /// The event being dispatched
    pub fn event(&self) -> &EventInfo {
        &self.event
    }

    /// The payload supplied by the caller
    pub fn payload(&self) -> &P {
        &self.payload
    }

    /// Shared handle to the payload
    pub fn payload_handle(&self) -> Arc<P> {
        Arc::clone(&self.payload)
    }

    /// Current result
    pub fn result(&self) -> Option<&R> {
        self.result.as_ref()
    }

    /// Mutable access to the current result
    pub fn result_mut(&mut self) -> Option<&mut R> {
        self.result.as_mut()
    }

    /// Replace the result
    pub fn set_result(&mut self, result: R) {
        self.result = Some(result);
    }

    /// Remove the result, leaving the slot empty
    pub fn take_result(&mut self) -> Option<R> {
        self.result.take()
    }

    /// Consume the context and return its result
    pub fn into_result(self) -> Option<R> {
        self.result
    }

    /// Metadata supplied by the caller
    pub fn metadata(&self) -> &serde_json::Value {
        &self.metadata
    }

    /// Whether the event had at least one subscriber when it was triggered
    pub fn has_subscribers(&self) -> bool {
        self.has_subscribers
    }

    /// Whether the chain was stopped
    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Reason given by the first stop call, if any
    pub fn stopped_reason(&self) -> Option<&str> {
        self.stopped_reason.as_deref()
    }

    /// Whether the chain was stopped because of an error
    pub fn is_stopped_for_error(&self) -> bool {
        self.stopped_for_error
    }

    /// The captured error
    pub fn error(&self) -> Option<&SharedError> {
        self.error.as_ref()
    }

    /// Stop the chain; remaining subscribers will not run
    pub fn stop(&mut self) {
        self.stop_inner(None);
    }

    /// Stop the chain with a reason
    ///
    /// Only the first stop records its reason.
    pub fn stop_with_reason(&mut self, reason: impl Into<String>) {
        self.stop_inner(Some(reason.into()));
    }

    /// Record an error and stop the chain
    pub fn stop_for_error(&mut self, error: impl Into<BoxError>) {
        self.record_error(error.into());
        self.stop_inner(None);
    }

    /// Record an error and stop the chain with a reason
    pub fn stop_for_error_with_reason(
        &mut self,
        error: impl Into<BoxError>,
        reason: impl Into<String>,
    ) {
        self.record_error(error.into());
        self.stop_inner(Some(reason.into()));
    }

    fn record_error(&mut self, error: BoxError) {
        // First error wins, matching the stop reason.
        if self.error.is_none() {
            self.error = Some(Arc::from(error));
        }
        self.stopped_for_error = true;
    }

    fn stop_inner(&mut self, reason: Option<String>) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        self.stopped_reason = reason;
    }
}

impl<P, R> EventContext<P, R>
where
    P: Send + Sync + 'static,
    R: Clone + Send + Sync + 'static,
{
    /// Type-erased snapshot of the context
    pub fn summary(&self) -> ContextSummary {
        ContextSummary {
            invocation_id: self.invocation_id,
            triggered_at: self.triggered_at,
            event: self.event.clone(),
            payload: Arc::clone(&self.payload) as AnyValue,
            result: self
                .result
                .as_ref()
                .map(|result| Arc::new(result.clone()) as AnyValue),
            stopped: self.stopped,
            stopped_reason: self.stopped_reason.clone(),
            stopped_for_error: self.stopped_for_error,
            error: self.error.clone(),
            metadata: self.metadata.clone(),
            has_subscribers: self.has_subscribers,
        }
    }
}

impl<P, R: fmt::Debug> fmt::Debug for EventContext<P, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventContext")
            .field("invocation_id", &self.invocation_id)
            .field("event", &self.event.name)
            .field("result", &self.result)
            .field("stopped", &self.stopped)
            .field("stopped_reason", &self.stopped_reason)
            .field("stopped_for_error", &self.stopped_for_error)
            .field("error", &self.error)
            .field("has_subscribers", &self.has_subscribers)
            .finish()
    }
}

/// Snapshot of an [`EventContext`] with its payload and result type-erased
///
/// Used by the after-trigger and subscriber-error lifecycle events.
#[derive(Debug, Clone)]
pub struct ContextSummary {
    pub invocation_id: Uuid,
    pub triggered_at: DateTime<Utc>,
    pub event: EventInfo,
    pub payload: AnyValue,
    pub result: Option<AnyValue>,
    pub stopped: bool,
    pub stopped_reason: Option<String>,
    pub stopped_for_error: bool,
    pub error: Option<SharedError>,
    pub metadata: serde_json::Value,
    pub has_subscribers: bool,
}

impl ContextSummary {
    /// Payload downcast to its concrete type
    pub fn payload_as<T: 'static>(&self) -> Option<&T> {
        self.payload.downcast_ref::<T>()
    }

    /// Result downcast to its concrete type
    pub fn result_as<T: 'static>(&self) -> Option<&T> {
        self.result.as_ref().and_then(|r| r.downcast_ref::<T>())
    }
}
