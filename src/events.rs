//! Event bus keyed by event name.
//!
//! Components register a [`Callback`] under a name such as
//! `vat:vat-1:update` via [`EventBus::subscribe`] and receive every payload
//! later handed to [`EventBus::publish`] for that name. Delivery is
//! synchronous, on the publishing task, in subscription order.
//!
//! There are two ways to stop listening:
//! - [`EventBus::unsubscribe`] removes by callback identity (`Arc::ptr_eq`).
//!   A freshly built closure that merely looks the same is not removed.
//! - [`EventBus::remove`] removes one registration by the
//!   [`SubscriptionId`] that `subscribe` returned. [`Subscription`] does this
//!   on drop.

use std::collections::HashMap;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use serde_json::Value;

/// A subscriber. Cloning the `Arc` keeps its identity for [`EventBus::unsubscribe`].
pub type Callback = Arc<dyn Fn(&Value) + Send + Sync>;

/// Wrap a closure as a [`Callback`].
pub fn callback<F>(f: F) -> Callback
where
    F: Fn(&Value) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Token identifying one registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Registration {
    id: SubscriptionId,
    callback: Callback,
}

/// Name-keyed registry of callbacks.
pub struct EventBus {
    listeners: Mutex<HashMap<String, Vec<Registration>>>,
    next_id: AtomicU64,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            listeners: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    fn listeners(&self) -> MutexGuard<'_, HashMap<String, Vec<Registration>>> {
        match self.listeners.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Append `callback` to the list for `event`. Registering the same
    /// callback twice makes it fire twice.
    pub fn subscribe(&self, event: &str, callback: Callback) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners()
            .entry(event.to_string())
            .or_default()
            .push(Registration { id, callback });
        id
    }

    /// Like [`subscribe`](Self::subscribe), but the registration lives only
    /// as long as the returned guard.
    pub fn subscribe_scoped(self: &Arc<Self>, event: &str, callback: Callback) -> Subscription {
        let id = self.subscribe(event, callback);
        Subscription {
            bus: Arc::downgrade(self),
            event: event.to_string(),
            id: Some(id),
        }
    }

    /// Remove every registration of this exact callback under `event`.
    /// Returns how many were removed; zero for an unknown callback.
    pub fn unsubscribe(&self, event: &str, callback: &Callback) -> usize {
        let mut listeners = self.listeners();
        let Some(list) = listeners.get_mut(event) else {
            return 0;
        };
        let before = list.len();
        list.retain(|r| !Arc::ptr_eq(&r.callback, callback));
        let removed = before - list.len();
        if list.is_empty() {
            listeners.remove(event);
        }
        removed
    }

    /// Remove a single registration by token.
    pub fn remove(&self, event: &str, id: SubscriptionId) -> bool {
        let mut listeners = self.listeners();
        let Some(list) = listeners.get_mut(event) else {
            return false;
        };
        let Some(pos) = list.iter().position(|r| r.id == id) else {
            return false;
        };
        list.remove(pos);
        if list.is_empty() {
            listeners.remove(event);
        }
        true
    }

    /// Deliver `payload` to every callback registered for `event` at the
    /// moment of the call. A panicking callback is logged and skipped; the
    /// rest still run. Returns the number of callbacks that completed.
    pub fn publish(&self, event: &str, payload: &Value) -> usize {
        // Snapshot so callbacks may (un)subscribe without deadlocking.
        let callbacks: Vec<Callback> = match self.listeners().get(event) {
            Some(list) => list.iter().map(|r| Arc::clone(&r.callback)).collect(),
            None => return 0,
        };

        let mut delivered = 0;
        for callback in callbacks {
            match catch_unwind(AssertUnwindSafe(|| callback(payload))) {
                Ok(()) => delivered += 1,
                Err(_) => tracing::error!(event, "subscriber panicked; continuing delivery"),
            }
        }
        delivered
    }

    /// Number of registrations for `event`.
    pub fn subscriber_count(&self, event: &str) -> usize {
        self.listeners().get(event).map_or(0, Vec::len)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let listeners = self.listeners();
        let counts: HashMap<&str, usize> = listeners
            .iter()
            .map(|(event, list)| (event.as_str(), list.len()))
            .collect();
        f.debug_struct("EventBus").field("listeners", &counts).finish()
    }
}

/// Registration that is removed when dropped.
#[must_use = "dropping a Subscription unsubscribes immediately"]
#[derive(Debug)]
pub struct Subscription {
    bus: Weak<EventBus>,
    event: String,
    id: Option<SubscriptionId>,
}

impl Subscription {
    /// Event name this guard is registered under.
    pub fn event(&self) -> &str {
        &self.event
    }

    /// Unsubscribe now.
    pub fn cancel(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let (Some(id), Some(bus)) = (self.id.take(), self.bus.upgrade()) {
            bus.remove(&self.event, id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}
