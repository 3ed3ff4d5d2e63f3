use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::error;

use super::session::Session;

/// Kind of session transition delivered to subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthEvent {
    SignedIn,
    SignedOut,
    Expired,
}

impl AuthEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthEvent::SignedIn => "SIGNED_IN",
            AuthEvent::SignedOut => "SIGNED_OUT",
            AuthEvent::Expired => "EXPIRED",
        }
    }
}

impl fmt::Display for AuthEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub(crate) type Listener = Arc<dyn Fn(AuthEvent, Option<&Session>) + Send + Sync>;

/// Ordered listener list. Ids are never reused, so a stale handle cannot remove
/// a newer listener.
#[derive(Default)]
pub(crate) struct Registry {
    next_id: u64,
    listeners: Vec<(u64, Listener)>,
}

impl Registry {
    pub(crate) fn add(&mut self, listener: Listener) -> u64 {
        self.next_id += 1;
        self.listeners.push((self.next_id, listener));
        self.next_id
    }

    pub(crate) fn remove(&mut self, id: u64) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(lid, _)| *lid != id);
        self.listeners.len() != before
    }

    pub(crate) fn len(&self) -> usize { self.listeners.len() }

    fn snapshot(&self) -> Vec<Listener> {
        self.listeners.iter().map(|(_, l)| l.clone()).collect()
    }
}

pub(crate) type SharedRegistry = Arc<Mutex<Registry>>;

/// Call every listener in registration order. The registry lock is released
/// before any callback runs, so listeners may subscribe or unsubscribe.
pub(crate) fn notify(registry: &SharedRegistry, event: AuthEvent, session: Option<&Session>) {
    let listeners = registry.lock().snapshot();
    for l in listeners {
        deliver(&l, event, session);
    }
}

/// A panicking listener is logged and skipped; it never unwinds into the store.
pub(crate) fn deliver(listener: &Listener, event: AuthEvent, session: Option<&Session>) {
    if catch_unwind(AssertUnwindSafe(|| listener(event, session))).is_err() {
        error!(target: "fatecraft::session", event = %event, "session listener panicked");
    }
}

/// Handle returned by `SessionStore::subscribe`.
#[must_use = "dropping the handle keeps the listener registered; call unsubscribe() to remove it"]
pub struct Subscription {
    id: u64,
    registry: Weak<Mutex<Registry>>,
}

impl Subscription {
    pub(crate) fn new(id: u64, registry: &SharedRegistry) -> Self {
        Self { id, registry: Arc::downgrade(registry) }
    }

    /// Remove the listener. Returns false if it was already gone (or the store
    /// has been dropped).
    pub fn unsubscribe(self) -> bool {
        match self.registry.upgrade() {
            Some(reg) => reg.lock().remove(self.id),
            None => false,
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}
