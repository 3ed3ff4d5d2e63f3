//! FateCraft identity core.
//!
//! The dashboard's only stateful subsystem: a mock session store with durable
//! persistence and change notifications, plus the role-based gating of the
//! citizen, industry and government views.

pub mod config;
pub mod content;
pub mod error;
pub mod identity;
pub mod storage;
pub mod cli;

pub use error::{AuthError, ParseError, StorageError, ViewError};
pub use identity::{
    can_access, select_visible_views, AuthEvent, Navigator, Role, Session, SessionStore,
    Subscription, User, View,
};
