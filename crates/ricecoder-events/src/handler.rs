//! Subscriber handlers
//!
//! A handler wraps one of two statically distinct callback shapes:
//!
//! - [`Callback::Sync`] wraps a closure that runs to completion inline.
//! - [`Callback::Async`] wraps a closure returning a boxed future.
//!
//! Both receive the invocation context mutably and return a
//! [`HandlerResult`]: `Ok(Some(value))` replaces the chain's result,
//! `Ok(None)` leaves it untouched and `Err(error)` stops the chain.
//!
//! # Examples
//!
//! ```ignore
//! let increment: Handler<(), u32> =
//!     Handler::sync(|ctx| Ok(Some(ctx.result().copied().unwrap_or(0) + 1)));
//!
//! let fetch: Handler<Url, String> = Handler::asynchronous(|ctx| {
//!     Box::pin(async move {
//!         let body = download(ctx.payload()).await?;
//!         Ok(Some(body))
//!     })
//! });
//! ```

use std::{
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

use crate::{context::EventContext, error::BoxError};

/// Value returned by every handler
pub type HandlerResult<R> = std::result::Result<Option<R>, BoxError>;

type SyncHandlerFn<P, R> = dyn Fn(&mut EventContext<P, R>) -> HandlerResult<R> + Send + Sync;

type AsyncHandlerFn<P, R> =
    dyn for<'a> Fn(&'a mut EventContext<P, R>) -> BoxFuture<'a, HandlerResult<R>> + Send + Sync;

static NEXT_HANDLER_ID: AtomicU64 = AtomicU64::new(1);

/// The closure behind a handler
pub enum Callback<P, R = ()> {
    /// Runs inline
    Sync(Arc<SyncHandlerFn<P, R>>),

    /// Returns a future that is awaited before the next subscriber runs
    Async(Arc<AsyncHandlerFn<P, R>>),
}

impl<P, R> Clone for Callback<P, R> {
    fn clone(&self) -> Self {
        match self {
            Callback::Sync(f) => Callback::Sync(Arc::clone(f)),
            Callback::Async(f) => Callback::Async(Arc::clone(f)),
        }
    }
}

/// A subscriber attached to an event
///
/// Every constructed handler gets a fresh id. Cloning a handler is cheap and
/// keeps its id: subscribing a clone of an already subscribed handler is a
/// no-op.
pub struct Handler<P, R = ()> {
    id: HandlerId,
    callback: Callback<P, R>,
}

impl<P, R> Handler<P, R> {
    fn new(callback: Callback<P, R>) -> Self {
        Self {
            id: HandlerId(NEXT_HANDLER_ID.fetch_add(1, Ordering::Relaxed)),
            callback,
        }
    }

    /// Wrap a synchronous closure
    pub fn sync<F>(handler: F) -> Self
    where
        F: Fn(&mut EventContext<P, R>) -> HandlerResult<R> + Send + Sync + 'static,
    {
        Self::new(Callback::Sync(Arc::new(handler)))
    }

    /// Wrap a closure returning a boxed future
    ///
    /// The future may borrow the context for as long as it runs.
    pub fn asynchronous<F>(handler: F) -> Self
    where
        F: for<'a> Fn(&'a mut EventContext<P, R>) -> BoxFuture<'a, HandlerResult<R>>
            + Send
            + Sync
            + 'static,
    {
        Self::new(Callback::Async(Arc::new(handler)))
    }

    /// Identity shared by this handler and its clones
    pub fn id(&self) -> HandlerId {
        self.id
    }

    /// The wrapped closure
    pub fn callback(&self) -> &Callback<P, R> {
        &self.callback
    }

    /// Shape of the handler
    pub fn kind(&self) -> HandlerKind {
        match self.callback {
            Callback::Sync(_) => HandlerKind::Sync,
            Callback::Async(_) => HandlerKind::Async,
        }
    }

    /// Type-erased description used by lifecycle payloads
    pub fn info(&self) -> SubscriberInfo {
        SubscriberInfo {
            id: self.id,
            kind: self.kind(),
        }
    }
}

impl<P, R> Clone for Handler<P, R> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            callback: self.callback.clone(),
        }
    }
}

impl<P, R> fmt::Debug for Handler<P, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("id", &self.id)
            .field("kind", &self.kind())
            .finish()
    }
}

/// Identity of a handler
///
/// Allocated from a process-wide counter when the handler is built and never
/// reused, so it only means something inside the running process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct HandlerId(u64);

impl fmt::Display for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "handler-{}", self.0)
    }
}

/// Shape of a handler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandlerKind {
    Sync,
    Async,
}

/// Handler identity and shape, without its types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SubscriberInfo {
    /// Id of the subscribed handler
    pub id: HandlerId,

    /// Whether the handler is a sync or a future-returning closure
    pub kind: HandlerKind,
}
