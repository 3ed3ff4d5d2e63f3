use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, ReentrantMutex, RwLock};
use tracing::{debug, info, warn};

use super::events::{self, AuthEvent, Listener, Registry, SharedRegistry, Subscription};
use super::principal::{default_display_name, Role, User};
use super::provider::{AuthProvider, DemoRoleTable, Grant, LoginRequest, MockAuthProvider, RoleResolver};
use super::session::{self, Clock, Decoded, Session, SystemClock, SESSION_KEY};
use crate::error::AuthError;
use crate::storage::{MemoryStorage, SharedStorage};

/// Single authority for who is signed in and as what role.
///
/// Holds at most one session, mirrors it to durable storage, and notifies
/// subscribers after every transition (always after the storage write). One
/// store per process, shared by `Arc`; other components read session state only
/// through `get_session` and `subscribe`.
///
/// Credential operations are serialized: a second `sign_in` issued while one is
/// pending waits for the first to finish. While an operation is suspended the
/// previous session stays visible to readers.
pub struct SessionStore {
    storage: SharedStorage,
    clock: Arc<dyn Clock>,
    provider: Arc<dyn AuthProvider>,
    resolver: Arc<dyn RoleResolver>,
    auth_timeout: Option<Duration>,
    current: RwLock<Option<Session>>,
    listeners: SharedRegistry,
    // Held across persist+publish and subscribe+replay so a new subscriber
    // never sees its replay after a newer transition.
    dispatch: ReentrantMutex<()>,
    // Transitions raised by a listener while another is being delivered wait
    // here until the current round reaches every listener.
    outbox: Mutex<VecDeque<(AuthEvent, Option<Session>)>>,
    delivering: AtomicBool,
    op_gate: tokio::sync::Mutex<()>,
    pending: AtomicBool,
}

pub struct SessionStoreBuilder {
    storage: SharedStorage,
    clock: Arc<dyn Clock>,
    provider: Arc<dyn AuthProvider>,
    resolver: Arc<dyn RoleResolver>,
    auth_timeout: Option<Duration>,
}

impl SessionStoreBuilder {
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self { self.clock = clock; self }
    pub fn provider(mut self, provider: Arc<dyn AuthProvider>) -> Self { self.provider = provider; self }
    pub fn resolver(mut self, resolver: Arc<dyn RoleResolver>) -> Self { self.resolver = resolver; self }
    /// Upper bound on a provider round trip; exceeding it fails the operation
    /// with `AuthError::NetworkUnavailable` and leaves the session unchanged.
    pub fn auth_timeout(mut self, timeout: Option<Duration>) -> Self { self.auth_timeout = timeout; self }

    /// Build the store and rehydrate any persisted session.
    pub fn build(self) -> SessionStore {
        let restored = rehydrate(&self.storage, self.clock.as_ref());
        SessionStore {
            storage: self.storage,
            clock: self.clock,
            provider: self.provider,
            resolver: self.resolver,
            auth_timeout: self.auth_timeout,
            current: RwLock::new(restored),
            listeners: Arc::new(Mutex::new(Registry::default())),
            dispatch: ReentrantMutex::new(()),
            outbox: Mutex::new(VecDeque::new()),
            delivering: AtomicBool::new(false),
            op_gate: tokio::sync::Mutex::new(()),
            pending: AtomicBool::new(false),
        }
    }
}

/// Clears the pending flag however the operation ends, including when the
/// caller drops the future mid-flight.
struct PendingGuard<'a>(&'a AtomicBool);

impl<'a> PendingGuard<'a> {
    fn set(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) { self.0.store(false, Ordering::SeqCst); }
}

struct DeliveringGuard<'a>(&'a AtomicBool);

impl Drop for DeliveringGuard<'_> {
    fn drop(&mut self) { self.0.store(false, Ordering::SeqCst); }
}

fn rehydrate(storage: &SharedStorage, clock: &dyn Clock) -> Option<Session> {
    let raw = match storage.get(SESSION_KEY) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(e) => {
            warn!(target: "fatecraft::storage", code = e.code(), "reading persisted session failed: {}", e);
            return None;
        }
    };
    match session::decode(&raw, clock.now()) {
        Ok(Decoded::Current(s)) => {
            debug!(target: "fatecraft::session", "restored session for {}", s.user().email());
            Some(s)
        }
        Ok(Decoded::Migrated(s)) => {
            info!(target: "fatecraft::session", "migrated legacy session record for {}", s.user().email());
            match session::encode(&s) {
                Ok(rec) => {
                    if let Err(e) = storage.set(SESSION_KEY, &rec) {
                        warn!(target: "fatecraft::storage", code = e.code(), "rewriting migrated session failed: {}", e);
                    }
                }
                Err(e) => warn!(target: "fatecraft::storage", "encoding migrated session failed: {}", e),
            }
            Some(s)
        }
        Err(e) => {
            warn!(target: "fatecraft::storage", code = e.code(), "ignoring persisted session: {}", e);
            None
        }
    }
}

impl SessionStore {
    /// Builder over the given storage with the system clock, the mock provider
    /// (default latency) and the demo role table.
    pub fn builder(storage: SharedStorage) -> SessionStoreBuilder {
        SessionStoreBuilder {
            storage,
            clock: Arc::new(SystemClock),
            provider: Arc::new(MockAuthProvider::default()),
            resolver: Arc::new(DemoRoleTable::default()),
            auth_timeout: None,
        }
    }

    /// Ephemeral store with no latency; nothing survives the process.
    pub fn in_memory() -> Self {
        Self::builder(Arc::new(MemoryStorage::new()))
            .provider(Arc::new(MockAuthProvider::instant()))
            .build()
    }

    pub fn get_session(&self) -> Option<Session> { self.current.read().clone() }

    /// True while a credential operation is in flight.
    pub fn is_pending(&self) -> bool { self.pending.load(Ordering::SeqCst) }

    pub fn listener_count(&self) -> usize { self.listeners.lock().len() }

    /// Register a listener for session transitions. It is called once right
    /// away with the current state (`SignedIn` with the session, or
    /// `SignedOut` with none), then on every transition, in registration order.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(AuthEvent, Option<&Session>) + Send + Sync + 'static,
    {
        let listener: Listener = Arc::new(listener);
        let _dispatch = self.dispatch.lock();
        let id = self.listeners.lock().add(listener.clone());
        let current = self.get_session();
        let event = if current.is_some() { AuthEvent::SignedIn } else { AuthEvent::SignedOut };
        events::deliver(&listener, event, current.as_ref());
        Subscription::new(id, &self.listeners)
    }

    /// Sign in with email and password. Role and display name come from the
    /// role resolver.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let req = LoginRequest::new(email, password)?;
        let _gate = self.op_gate.lock().await;
        let _pending = PendingGuard::set(&self.pending);

        let grant = self.call_provider(self.provider.sign_in(&req)).await?;
        let assignment = self.resolver.resolve(req.email());
        let session = self.session_for(&req, grant, assignment.role, Some(assignment.display_name));
        self.publish(Some(session.clone()), AuthEvent::SignedIn);
        info!(target: "fatecraft::session", "sign-in user={} role={}", session.user().email(), session.role());
        Ok(session)
    }

    /// Create an account and sign it in with the requested role. There is no
    /// account database, so an address that signed up before is accepted again.
    pub async fn sign_up(&self, email: &str, password: &str, requested_role: Role) -> Result<Session, AuthError> {
        let req = LoginRequest::new(email, password)?;
        let _gate = self.op_gate.lock().await;
        let _pending = PendingGuard::set(&self.pending);

        let grant = self.call_provider(self.provider.sign_up(&req, requested_role)).await?;
        let display = default_display_name(req.email());
        let session = self.session_for(&req, grant, requested_role, Some(display));
        self.publish(Some(session.clone()), AuthEvent::SignedIn);
        info!(target: "fatecraft::session", "sign-up user={} role={}", session.user().email(), session.role());
        Ok(session)
    }

    /// Clear the session. Safe to call when signed out: subscribers are still
    /// notified. A provider failure is logged and the local session is cleared
    /// anyway.
    pub async fn sign_out(&self) {
        let _gate = self.op_gate.lock().await;
        let _pending = PendingGuard::set(&self.pending);

        let token = self.get_session().map(|s| s.token().to_string());
        if let Err(e) = self.call_provider(self.provider.sign_out(token.as_deref())).await {
            warn!(target: "fatecraft::session", code = e.code(), "provider sign-out failed, clearing locally: {}", e);
        }
        self.publish(None, AuthEvent::SignedOut);
        info!(target: "fatecraft::session", "sign-out");
    }

    /// Explicitly expire the current session. Returns false (and notifies no
    /// one) when there is nothing to expire.
    pub fn expire(&self) -> bool {
        let _dispatch = self.dispatch.lock();
        if self.current.read().is_none() {
            return false;
        }
        self.publish(None, AuthEvent::Expired);
        info!(target: "fatecraft::session", "session expired");
        true
    }

    fn session_for(&self, req: &LoginRequest, grant: Grant, role: Role, display_name: Option<String>) -> Session {
        let user = match grant.user_id {
            Some(id) => User::with_id(id, req.email().to_string(), role, display_name),
            None => User::new(req.email(), role, display_name),
        };
        Session::new(grant.token, user, self.clock.now())
    }

    async fn call_provider<T, F>(&self, call: F) -> Result<T, AuthError>
    where
        F: Future<Output = Result<T, AuthError>>,
    {
        match self.auth_timeout {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(res) => res,
                Err(_) => Err(AuthError::NetworkUnavailable(format!("no response within {}ms", limit.as_millis()))),
            },
            None => call.await,
        }
    }

    /// Persist, swap the in-memory session, then notify. Storage failures are
    /// logged and never leave memory out of step with what was published.
    ///
    /// A transition made from inside a listener is queued and delivered once
    /// the current event has reached every listener, so all listeners see
    /// transitions in the order they happened and the last event each one
    /// gets matches `get_session`.
    fn publish(&self, next: Option<Session>, event: AuthEvent) {
        let _dispatch = self.dispatch.lock();
        self.persist(next.as_ref());
        *self.current.write() = next.clone();
        self.outbox.lock().push_back((event, next));
        if self.delivering.swap(true, Ordering::SeqCst) {
            return;
        }
        let _delivering = DeliveringGuard(&self.delivering);
        loop {
            let Some((event, session)) = self.outbox.lock().pop_front() else { break };
            events::notify(&self.listeners, event, session.as_ref());
        }
    }

    fn persist(&self, session: Option<&Session>) {
        let res = match session {
            Some(s) => session::encode(s).and_then(|rec| self.storage.set(SESSION_KEY, &rec)),
            None => self.storage.remove(SESSION_KEY),
        };
        if let Err(e) = res {
            warn!(target: "fatecraft::storage", code = e.code(), "persisting session failed: {}", e);
        }
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("session", &self.current.read().as_ref().map(|s| s.user().email().to_string()))
            .field("listeners", &self.listener_count())
            .field("pending", &self.is_pending())
            .finish()
    }
}
