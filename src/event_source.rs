//! Push-based event sources
//!
//! [`EventSource`] is the subscription capability an event bridge consumes.
//! [`EventEmitter`] is an in-process implementation with `on`/`once`/`off`
//! and `emit`.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::stream_configuration::ListenOptions;

/// Callback invoked with each event payload
pub type Listener<T> = Arc<dyn Fn(T) + Send + Sync>;

/// Handle identifying a registered listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl ListenerId {
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener#{}", self.0)
    }
}

/// Main trait for push-based event sources
pub trait EventSource<T>: Send + Sync {
    /// Register `listener` for every event of `event_type`
    fn subscribe(&self, event_type: &str, options: &ListenOptions, listener: Listener<T>) -> ListenerId;

    /// Register `listener` for the next event of `event_type` only. The
    /// registration is removed before the listener runs.
    fn subscribe_once(&self, event_type: &str, options: &ListenOptions, listener: Listener<T>) -> ListenerId;

    /// Remove a registration. Returns `false` if nothing matched.
    fn unsubscribe(&self, event_type: &str, options: &ListenOptions, id: ListenerId) -> bool;
}

struct Registration<T> {
    id: ListenerId,
    capture: bool,
    once: bool,
    listener: Listener<T>,
}

/// In-process event source
pub struct EventEmitter<T> {
    listeners: Mutex<HashMap<String, Vec<Registration<T>>>>,
    next_id: AtomicU64,
}

impl<T> EventEmitter<T> {
    pub fn new() -> Self {
        Self {
            listeners: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    fn registry(&self) -> MutexGuard<'_, HashMap<String, Vec<Registration<T>>>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn register(&self, event_type: &str, capture: bool, once: bool, listener: Listener<T>) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.registry()
            .entry(event_type.to_string())
            .or_default()
            .push(Registration { id, capture, once, listener });
        id
    }

    /// Listen for every event of `event_type`
    pub fn on<F>(&self, event_type: &str, listener: F) -> ListenerId
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        self.register(event_type, false, false, Arc::new(listener))
    }

    /// Listen for the next event of `event_type` only
    pub fn once<F>(&self, event_type: &str, listener: F) -> ListenerId
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        self.register(event_type, false, true, Arc::new(listener))
    }

    /// Remove a listener registered with `on` or `once`
    pub fn off(&self, event_type: &str, id: ListenerId) -> bool {
        self.remove(event_type, false, id)
    }

    fn remove(&self, event_type: &str, capture: bool, id: ListenerId) -> bool {
        let mut registry = self.registry();
        let Some(registrations) = registry.get_mut(event_type) else {
            return false;
        };
        let before = registrations.len();
        registrations.retain(|r| !(r.id == id && r.capture == capture));
        let removed = registrations.len() != before;
        if registrations.is_empty() {
            registry.remove(event_type);
        }
        removed
    }

    /// Number of listeners currently registered for `event_type`
    pub fn listener_count(&self, event_type: &str) -> usize {
        self.registry().get(event_type).map_or(0, Vec::len)
    }

    /// Deliver `payload` to every listener of `event_type`, returning how many
    /// were invoked.
    ///
    /// Listeners run after the registry lock is released, so they may add or
    /// remove listeners (including themselves) while being dispatched. A
    /// listener added during dispatch waits for the next event; one removed
    /// before its turn is skipped.
    pub fn emit(&self, event_type: &str, payload: T) -> usize
    where
        T: Clone,
    {
        let pending: Vec<ListenerId> = match self.registry().get(event_type) {
            Some(registrations) => registrations.iter().map(|r| r.id).collect(),
            None => return 0,
        };

        let mut fired = 0;
        for id in pending {
            if let Some(listener) = self.claim(event_type, id) {
                listener(payload.clone());
                fired += 1;
            }
        }
        fired
    }

    /// Look up a listener that is about to run. One-shot registrations are
    /// removed here, before they are invoked.
    fn claim(&self, event_type: &str, id: ListenerId) -> Option<Listener<T>> {
        let mut registry = self.registry();
        let (listener, now_empty) = {
            let registrations = registry.get_mut(event_type)?;
            let index = registrations.iter().position(|r| r.id == id)?;
            let listener = if registrations[index].once {
                registrations.remove(index).listener
            } else {
                Arc::clone(&registrations[index].listener)
            };
            (listener, registrations.is_empty())
        };
        if now_empty {
            registry.remove(event_type);
        }
        Some(listener)
    }
}

impl<T> Default for EventEmitter<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for EventEmitter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.registry();
        let mut counts: Vec<(&String, usize)> = registry.iter().map(|(k, v)| (k, v.len())).collect();
        counts.sort();
        f.debug_struct("EventEmitter")
            .field("listeners", &counts)
            .finish()
    }
}

impl<T> EventSource<T> for EventEmitter<T> {
    fn subscribe(&self, event_type: &str, options: &ListenOptions, listener: Listener<T>) -> ListenerId {
        self.register(event_type, options.capture, false, listener)
    }

    fn subscribe_once(&self, event_type: &str, options: &ListenOptions, listener: Listener<T>) -> ListenerId {
        self.register(event_type, options.capture, true, listener)
    }

    fn unsubscribe(&self, event_type: &str, options: &ListenOptions, id: ListenerId) -> bool {
        self.remove(event_type, options.capture, id)
    }
}
