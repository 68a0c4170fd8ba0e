//! In-memory event registry implementation

use std::{
    any::Any,
    collections::{hash_map::Entry, HashMap},
    fmt,
};

use parking_lot::RwLock;
use tracing::{debug, info};

use super::{SubscriberSet, Subscribers};
use crate::{
    error::{EventsError, Result},
    handler::{Handler, HandlerId, SubscriberInfo},
    types::{EventDescriptor, EventInfo},
};

/// One registered event: its descriptor and subscribers
struct RegistryEntry {
    info: EventInfo,
    descriptor: Box<dyn Any + Send + Sync>,
    subscribers: Box<dyn SubscriberSet>,
}

impl RegistryEntry {
    fn new<P: 'static, R: 'static>(descriptor: EventDescriptor<P, R>) -> Self {
        Self {
            info: descriptor.info().clone(),
            descriptor: Box::new(descriptor),
            subscribers: Box::new(Subscribers::<P, R>::new()),
        }
    }

    fn typed<P: 'static, R: 'static>(
        &self,
    ) -> Option<(&EventDescriptor<P, R>, &Subscribers<P, R>)> {
        let descriptor = self.descriptor.downcast_ref::<EventDescriptor<P, R>>()?;
        let subscribers = self.subscribers.as_any().downcast_ref::<Subscribers<P, R>>()?;
        Some((descriptor, subscribers))
    }

    fn typed_mut<P: 'static, R: 'static>(
        &mut self,
    ) -> Option<(&EventDescriptor<P, R>, &mut Subscribers<P, R>)> {
        let descriptor = self.descriptor.downcast_ref::<EventDescriptor<P, R>>()?;
        let subscribers = self
            .subscribers
            .as_any_mut()
            .downcast_mut::<Subscribers<P, R>>()?;
        Some((descriptor, subscribers))
    }
}

/// In-memory event registry
///
/// The lock is only held for the duration of a single registry operation,
/// never while subscribers run.
#[derive(Default)]
pub struct EventRegistry {
    entries: RwLock<HashMap<String, RegistryEntry>>,
}

impl EventRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a descriptor if its name is unseen, without conflict checks
    pub(crate) fn install<P: 'static, R: 'static>(&self, descriptor: &EventDescriptor<P, R>) {
        self.entries
            .write()
            .entry(descriptor.name().to_string())
            .or_insert_with(|| RegistryEntry::new(descriptor.clone()));
    }

    /// Register a descriptor, returning the canonical stored descriptor
    pub(crate) fn register<P: 'static, R: 'static>(
        &self,
        descriptor: &EventDescriptor<P, R>,
    ) -> Result<EventDescriptor<P, R>> {
        let mut entries = self.entries.write();
        let (canonical, _) = Self::resolve(&mut entries, descriptor)?;
        Ok(canonical.clone())
    }

    /// Register a descriptor if needed and append a handler
    ///
    /// Returns the canonical descriptor and whether the handler was added.
    pub(crate) fn subscribe<P: 'static, R: 'static>(
        &self,
        descriptor: &EventDescriptor<P, R>,
        handler: Handler<P, R>,
    ) -> Result<(EventDescriptor<P, R>, bool)> {
        let mut entries = self.entries.write();
        let (canonical, subscribers) = Self::resolve(&mut entries, descriptor)?;
        let added = subscribers.insert(handler);
        Ok((canonical.clone(), added))
    }

    /// Register a descriptor if needed and snapshot its handlers
    pub(crate) fn prepare<P: 'static, R: 'static>(
        &self,
        descriptor: &EventDescriptor<P, R>,
    ) -> Result<(EventDescriptor<P, R>, Vec<Handler<P, R>>)> {
        let mut entries = self.entries.write();
        let (canonical, subscribers) = Self::resolve(&mut entries, descriptor)?;
        Ok((canonical.clone(), subscribers.snapshot()))
    }

    /// Snapshot the handlers of an already registered event
    ///
    /// Returns `None` when the name is unknown or bound to other types.
    pub(crate) fn lookup<P: 'static, R: 'static>(
        &self,
        name: &str,
    ) -> Option<(EventDescriptor<P, R>, Vec<Handler<P, R>>)> {
        let entries = self.entries.read();
        let (descriptor, subscribers) = entries.get(name)?.typed::<P, R>()?;
        Some((descriptor.clone(), subscribers.snapshot()))
    }

    /// Remove one handler; returns the event it was removed from
    pub(crate) fn remove_subscriber(&self, name: &str, id: HandlerId) -> Option<EventInfo> {
        let mut entries = self.entries.write();
        let entry = entries.get_mut(name)?;
        if entry.subscribers.remove(id) {
            Some(entry.info.clone())
        } else {
            None
        }
    }

    /// Remove every handler of an event
    pub(crate) fn clear_subscribers(&self, name: &str) -> Option<(EventInfo, Vec<SubscriberInfo>)> {
        let mut entries = self.entries.write();
        let entry = entries.get_mut(name)?;
        let removed = entry.subscribers.clear();
        Some((entry.info.clone(), removed))
    }

    /// Whether an event with this name is registered
    pub fn contains(&self, name: &str) -> bool {
        self.entries.read().contains_key(name)
    }

    /// Info of a registered event
    pub fn info(&self, name: &str) -> Option<EventInfo> {
        self.entries.read().get(name).map(|entry| entry.info.clone())
    }

    /// Typed descriptor of a registered event
    pub fn descriptor<P: 'static, R: 'static>(&self, name: &str) -> Option<EventDescriptor<P, R>> {
        let entries = self.entries.read();
        let (descriptor, _) = entries.get(name)?.typed::<P, R>()?;
        Some(descriptor.clone())
    }

    /// Info of every registered event, sorted by name
    pub fn list(&self) -> Vec<EventInfo> {
        let mut events: Vec<EventInfo> = self
            .entries
            .read()
            .values()
            .map(|entry| entry.info.clone())
            .collect();
        events.sort_by(|a, b| a.name.cmp(&b.name));
        events
    }

    /// Number of handlers subscribed to an event; 0 when unknown
    pub fn subscriber_count(&self, name: &str) -> usize {
        self.entries
            .read()
            .get(name)
            .map_or(0, |entry| entry.subscribers.len())
    }

    /// Number of registered events
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether no event is registered
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Remove an event and all its subscribers
    ///
    /// # Errors
    ///
    /// Returns [`EventsError::ProtectedEvent`] for internal events.
    pub(crate) fn remove(&self, name: &str) -> Result<bool> {
        let mut entries = self.entries.write();

        match entries.get(name) {
            None => return Ok(false),
            Some(entry) if entry.info.internal => {
                return Err(EventsError::ProtectedEvent(name.to_string()))
            }
            Some(_) => {}
        }

        if let Some(entry) = entries.remove(name) {
            info!(
                event = %name,
                subscriber_count = entry.subscribers.len(),
                "Removed event"
            );
        }
        Ok(true)
    }

    fn resolve<'a, P: 'static, R: 'static>(
        entries: &'a mut HashMap<String, RegistryEntry>,
        descriptor: &EventDescriptor<P, R>,
    ) -> Result<(&'a EventDescriptor<P, R>, &'a mut Subscribers<P, R>)> {
        let name = descriptor.name();

        let entry = match entries.entry(name.to_string()) {
            Entry::Occupied(occupied) => {
                let entry = occupied.into_mut();
                if entry.info.mode != descriptor.mode() {
                    return Err(EventsError::ModeConflict {
                        name: name.to_string(),
                        existing: entry.info.mode,
                        requested: descriptor.mode(),
                    });
                }
                entry
            }
            Entry::Vacant(vacant) => {
                debug!(
                    event = %name,
                    mode = %descriptor.mode(),
                    internal = descriptor.is_internal(),
                    "Registered event"
                );
                vacant.insert(RegistryEntry::new(descriptor.clone()))
            }
        };

        entry
            .typed_mut::<P, R>()
            .ok_or_else(|| EventsError::TypeConflict {
                name: name.to_string(),
            })
    }
}

impl fmt::Debug for EventRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries = self.entries.read();
        let mut names: Vec<&String> = entries.keys().collect();
        names.sort();
        f.debug_struct("EventRegistry").field("events", &names).finish()
    }
}
