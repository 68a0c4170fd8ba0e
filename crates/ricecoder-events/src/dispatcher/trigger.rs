//! Trigger algorithm
//!
//! Every trigger call goes through the same steps:
//!
//! ```text
//! Created → BeforeNotified → Running → (Stopped | Completed) → AfterNotified → Returned
//! ```
//!
//! Sync and async events share ordering, stop and error handling; they only
//! differ in whether future-returning handlers are awaited or rejected.

use std::sync::Arc;

use tracing::{debug, warn};

use super::EventDispatcher;
use crate::{
    context::{AnyValue, EventContext},
    error::{EventsError, Result},
    handler::{Callback, Handler, HandlerResult},
    lifecycle::{AfterTriggerEvent, BeforeTriggerEvent, SubscriberErrorEvent, TriggerOptionsInfo},
    types::{EventDescriptor, EventMode, TriggerOptions},
};

/// Stop reason recorded when a subscriber returns an error
pub const SUBSCRIBER_ERROR_REASON: &str = "Subscriber threw an error";

const ASYNC_ON_SYNC_REASON: &str = "Subscriber returned a future for a synchronous event";

impl EventDispatcher {
    /// Trigger a synchronous event
    ///
    /// Runs every subscriber inline, in registration order, and returns the
    /// finished context. Subscriber errors are captured on the context unless
    /// `options.throw_on_error` is set.
    ///
    /// # Errors
    ///
    /// - [`EventsError::ModeMismatch`] when the event is async
    /// - [`EventsError::ModeConflict`] / [`EventsError::TypeConflict`] when
    ///   auto-registration conflicts with a stored descriptor
    /// - [`EventsError::SubscriberFailed`] when `throw_on_error` is set and
    ///   the chain stopped for an error
    pub fn trigger<P, R>(
        &self,
        descriptor: &EventDescriptor<P, R>,
        payload: P,
        options: TriggerOptions<R>,
    ) -> Result<EventContext<P, R>>
    where
        P: Send + Sync + 'static,
        R: Clone + Send + Sync + 'static,
    {
        let (descriptor, handlers) = self.registry.prepare(descriptor)?;
        if descriptor.mode() == EventMode::Async {
            return Err(EventsError::ModeMismatch {
                name: descriptor.name().to_string(),
                mode: EventMode::Async,
            });
        }

        let (mut context, throw_on_error) = self.begin(&descriptor, &handlers, payload, options);
        self.run_sync_chain(&descriptor, &handlers, &mut context);
        self.finish(&descriptor, context, throw_on_error)
    }

    /// Trigger an event of either mode
    ///
    /// Async events await each subscriber before starting the next one; the
    /// chain never runs subscribers concurrently. Sync events behave exactly
    /// as with [`EventDispatcher::trigger`].
    ///
    /// # Errors
    ///
    /// Same as [`EventDispatcher::trigger`], except that async events are
    /// accepted.
    pub async fn trigger_async<P, R>(
        &self,
        descriptor: &EventDescriptor<P, R>,
        payload: P,
        options: TriggerOptions<R>,
    ) -> Result<EventContext<P, R>>
    where
        P: Send + Sync + 'static,
        R: Clone + Send + Sync + 'static,
    {
        let (descriptor, handlers) = self.registry.prepare(descriptor)?;

        let (mut context, throw_on_error) = self.begin(&descriptor, &handlers, payload, options);
        match descriptor.mode() {
            EventMode::Sync => self.run_sync_chain(&descriptor, &handlers, &mut context),
            EventMode::Async => {
                self.run_async_chain(&descriptor, &handlers, &mut context)
                    .await
            }
        }
        self.finish(&descriptor, context, throw_on_error)
    }

    fn begin<P, R>(
        &self,
        descriptor: &EventDescriptor<P, R>,
        handlers: &[Handler<P, R>],
        payload: P,
        options: TriggerOptions<R>,
    ) -> (EventContext<P, R>, bool)
    where
        P: Send + Sync + 'static,
        R: Clone + Send + Sync + 'static,
    {
        let TriggerOptions {
            initial_result,
            throw_on_error,
            metadata,
        } = options;
        let overridden = initial_result.is_some();
        let initial_result = initial_result.or_else(|| descriptor.create_initial_result());

        let context = EventContext::new(
            descriptor.info().clone(),
            Arc::new(payload),
            initial_result,
            metadata,
            !handlers.is_empty(),
        );

        debug!(
            event = %descriptor.name(),
            invocation_id = %context.invocation_id(),
            subscriber_count = handlers.len(),
            "Triggering event"
        );

        if !descriptor.is_internal() {
            self.notify(&self.core.before_trigger, || BeforeTriggerEvent {
                event: descriptor.info().clone(),
                payload: context.payload_handle() as AnyValue,
                options: TriggerOptionsInfo {
                    initial_result: context
                        .result()
                        .filter(|_| overridden)
                        .map(|result| Arc::new(result.clone()) as AnyValue),
                    throw_on_error,
                    metadata: context.metadata().clone(),
                },
            });
        }

        (context, throw_on_error)
    }

    pub(super) fn run_sync_chain<P, R>(
        &self,
        descriptor: &EventDescriptor<P, R>,
        handlers: &[Handler<P, R>],
        context: &mut EventContext<P, R>,
    ) where
        P: Send + Sync + 'static,
        R: Clone + Send + Sync + 'static,
    {
        for handler in handlers {
            if context.is_stopped() {
                break;
            }

            match handler.callback() {
                Callback::Sync(f) => {
                    let outcome = f(&mut *context);
                    self.apply_outcome(descriptor, context, outcome);
                }
                Callback::Async(_) => {
                    warn!(
                        event = %descriptor.name(),
                        handler = %handler.id(),
                        "Async subscriber attached to synchronous event"
                    );
                    context.stop_for_error_with_reason(
                        EventsError::AsyncSubscriberOnSyncEvent(descriptor.name().to_string()),
                        ASYNC_ON_SYNC_REASON,
                    );
                    self.report_subscriber_error(descriptor, context);
                }
            }
        }
    }

    async fn run_async_chain<P, R>(
        &self,
        descriptor: &EventDescriptor<P, R>,
        handlers: &[Handler<P, R>],
        context: &mut EventContext<P, R>,
    ) where
        P: Send + Sync + 'static,
        R: Clone + Send + Sync + 'static,
    {
        for handler in handlers {
            if context.is_stopped() {
                break;
            }

            let outcome = match handler.callback() {
                Callback::Sync(f) => f(&mut *context),
                Callback::Async(f) => f(&mut *context).await,
            };
            self.apply_outcome(descriptor, context, outcome);
        }
    }

    fn apply_outcome<P, R>(
        &self,
        descriptor: &EventDescriptor<P, R>,
        context: &mut EventContext<P, R>,
        outcome: HandlerResult<R>,
    ) where
        P: Send + Sync + 'static,
        R: Clone + Send + Sync + 'static,
    {
        match outcome {
            Ok(Some(result)) => context.set_result(result),
            Ok(None) => {}
            Err(error) => {
                warn!(
                    event = %descriptor.name(),
                    invocation_id = %context.invocation_id(),
                    error = %error,
                    "Subscriber failed"
                );
                context.stop_for_error_with_reason(error, SUBSCRIBER_ERROR_REASON);
                self.report_subscriber_error(descriptor, context);
            }
        }
    }

    fn report_subscriber_error<P, R>(
        &self,
        descriptor: &EventDescriptor<P, R>,
        context: &EventContext<P, R>,
    ) where
        P: Send + Sync + 'static,
        R: Clone + Send + Sync + 'static,
    {
        // Internal events never report their own failures.
        if descriptor.is_internal() {
            return;
        }
        let error = match context.error() {
            Some(error) => Arc::clone(error),
            None => return,
        };

        self.notify(&self.core.subscriber_error, || SubscriberErrorEvent {
            event: descriptor.info().clone(),
            error,
            context: context.summary(),
        });
    }

    fn finish<P, R>(
        &self,
        descriptor: &EventDescriptor<P, R>,
        context: EventContext<P, R>,
        throw_on_error: bool,
    ) -> Result<EventContext<P, R>>
    where
        P: Send + Sync + 'static,
        R: Clone + Send + Sync + 'static,
    {
        debug!(
            event = %descriptor.name(),
            invocation_id = %context.invocation_id(),
            stopped = context.is_stopped(),
            stopped_for_error = context.is_stopped_for_error(),
            "Subscriber chain finished"
        );

        if !descriptor.is_internal() {
            self.notify(&self.core.after_trigger, || AfterTriggerEvent {
                event: descriptor.info().clone(),
                context: context.summary(),
            });
        }

        if throw_on_error {
            if let Some(error) = context.error() {
                return Err(EventsError::SubscriberFailed {
                    event: descriptor.name().to_string(),
                    source: Arc::clone(error),
                });
            }
        }

        Ok(context)
    }

    /// Run a lifecycle event through the internal path
    ///
    /// The event must already be registered with matching types; it is never
    /// auto-registered here. Lifecycle events are internal, so this never
    /// emits further lifecycle events. Failures of lifecycle subscribers are
    /// logged and otherwise ignored.
    pub(super) fn notify<T, F>(&self, descriptor: &EventDescriptor<T>, payload: F)
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> T,
    {
        let (descriptor, handlers) = match self.registry.lookup::<T, ()>(descriptor.name()) {
            Some(found) => found,
            None => return,
        };
        if handlers.is_empty() {
            return;
        }

        let mut context = EventContext::new(
            descriptor.info().clone(),
            Arc::new(payload()),
            None,
            serde_json::json!({}),
            true,
        );
        self.run_sync_chain(&descriptor, &handlers, &mut context);

        if let Some(error) = context.error() {
            warn!(
                event = %descriptor.name(),
                error = %error,
                "Lifecycle subscriber failed"
            );
        }
    }
}
