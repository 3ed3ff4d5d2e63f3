use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info};

use super::authorizer::{can_access, select_visible_views, View};
use super::events::{AuthEvent, Subscription};
use super::principal::Role;
use super::session::Session;
use super::store::SessionStore;
use crate::error::ViewError;

/// Swipe direction across the canonical view order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Next,
    Previous,
}

/// Blocking, dismissible message raised by a refused view change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub error: ViewError,
}

impl Notice {
    pub fn title(&self) -> &'static str {
        match self.error {
            ViewError::AccessDenied { .. } => "Access denied",
            ViewError::NotSignedIn(_) => "Sign in required",
        }
    }

    pub fn message(&self) -> String { self.error.to_string() }
}

/// Everything a view component receives: which views it may link to and which
/// one is showing. Switching goes back through `Navigator::set_view`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewContext {
    pub role: Role,
    pub visible: Vec<View>,
    pub current: View,
}

#[derive(Debug, Clone, Copy)]
struct NavState {
    role: Role,
    active: View,
}

/// Active-view state machine.
///
/// Every new session starts on the citizen view so an account never inherits a
/// higher-privilege view left open by the previous one; signing out discards
/// the active view. Each change is checked against the access table first and
/// a refusal leaves the active view alone.
#[derive(Debug, Default)]
pub struct Navigator {
    state: Mutex<Option<NavState>>,
    notice: Mutex<Option<Notice>>,
}

impl Navigator {
    pub fn new() -> Self { Self::default() }

    /// Create a navigator driven by the store's notifications. The initial
    /// replay puts it in step with the store straight away.
    pub fn attach(store: &SessionStore) -> (Arc<Navigator>, Subscription) {
        let nav = Arc::new(Navigator::new());
        let weak = Arc::downgrade(&nav);
        let sub = store.subscribe(move |event, session| {
            if let Some(nav) = weak.upgrade() {
                nav.observe(event, session);
            }
        });
        (nav, sub)
    }

    /// Apply a session transition.
    pub fn observe(&self, event: AuthEvent, session: Option<&Session>) {
        let next = match (event, session) {
            (AuthEvent::SignedIn, Some(s)) => Some(NavState { role: s.role(), active: View::Citizen }),
            _ => None,
        };
        debug!(target: "fatecraft::nav", event = %event, "active view reset to {:?}", next.map(|n| n.active));
        *self.state.lock() = next;
        *self.notice.lock() = None;
    }

    pub fn active_view(&self) -> Option<View> { self.state.lock().map(|s| s.active) }

    pub fn role(&self) -> Option<Role> { self.state.lock().map(|s| s.role) }

    /// Switch the active view if the session's role allows it. A refusal
    /// raises a notice and returns the error.
    pub fn set_view(&self, view: View) -> Result<(), ViewError> {
        let mut guard = self.state.lock();
        let res = match guard.as_mut() {
            None => Err(ViewError::NotSignedIn(view)),
            Some(st) if !can_access(st.role, view) => Err(ViewError::AccessDenied { role: st.role, view }),
            Some(st) => {
                st.active = view;
                Ok(())
            }
        };
        drop(guard);
        match &res {
            Ok(()) => debug!(target: "fatecraft::nav", "active view -> {}", view),
            Err(e) => {
                info!(target: "fatecraft::nav", code = e.code(), "view change refused: {}", e);
                *self.notice.lock() = Some(Notice { error: e.clone() });
            }
        }
        res
    }

    /// Move to the neighbouring view. At either end of the order this is a
    /// no-op; otherwise it is gated exactly like `set_view`. Returns the view
    /// that is active afterwards.
    pub fn step(&self, direction: Direction) -> Result<View, ViewError> {
        let current = match self.active_view() {
            Some(v) => v,
            None => {
                let err = ViewError::NotSignedIn(View::Citizen);
                *self.notice.lock() = Some(Notice { error: err.clone() });
                return Err(err);
            }
        };
        let pos = current.position();
        let target = match direction {
            Direction::Next => View::ALL.get(pos + 1).copied(),
            Direction::Previous => pos.checked_sub(1).and_then(|p| View::ALL.get(p).copied()),
        };
        match target {
            Some(view) => self.set_view(view).map(|_| view),
            None => Ok(current),
        }
    }

    pub fn context(&self) -> Option<ViewContext> {
        self.state.lock().map(|s| ViewContext { role: s.role, visible: select_visible_views(s.role), current: s.active })
    }

    pub fn notice(&self) -> Option<Notice> { self.notice.lock().clone() }

    /// Returns true if a notice was showing.
    pub fn dismiss_notice(&self) -> bool { self.notice.lock().take().is_some() }
}
