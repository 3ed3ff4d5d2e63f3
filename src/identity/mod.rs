//! Central identity, session and view-gating for the dashboard.
//! Keep the public surface thin and split implementation across sub-modules.

mod principal;
mod session;
mod events;
mod store;
mod provider;
mod authorizer;
mod navigation;

pub use principal::{default_display_name, normalize_email, Role, User};
pub use session::{Clock, Session, SessionToken, SystemClock, RECORD_VERSION, SESSION_KEY};
pub use events::{AuthEvent, Subscription};
pub use store::{SessionStore, SessionStoreBuilder};
pub use provider::{
    AuthProvider, DemoRoleTable, Grant, LoginRequest, MockAuthProvider, RoleAssignment, RoleResolver,
};
pub use authorizer::{can_access, permitted_roles, select_visible_views, View};
pub use navigation::{Direction, Navigator, Notice, ViewContext};
