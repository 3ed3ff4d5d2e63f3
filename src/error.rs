//! Error model for the identity core.
//! Every error carries a stable snake_case code so front-ends can map failures
//! without matching on message text.

use thiserror::Error;

use crate::identity::{Role, View};

/// Rejection of a credential operation. The session held by the store is left
/// untouched whenever one of these is returned.
///
/// The mock provider never produces the provider-side variants; they exist so a
/// real identity provider can be plugged in behind `AuthProvider`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("email and password are required")]
    MissingCredentials,
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("an account already exists for '{0}'")]
    AccountExists(String),
    #[error("identity provider unavailable: {0}")]
    NetworkUnavailable(String),
    #[error("too many attempts, try again later")]
    RateLimited,
}

impl AuthError {
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::MissingCredentials => "missing_credentials",
            AuthError::InvalidCredentials => "invalid_credentials",
            AuthError::AccountExists(_) => "account_exists",
            AuthError::NetworkUnavailable(_) => "network_unavailable",
            AuthError::RateLimited => "rate_limited",
        }
    }
}

/// Refused view transition. The active view never changes when this is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ViewError {
    #[error("the {role} role cannot open the {view} view")]
    AccessDenied { role: Role, view: View },
    #[error("sign in to open the {0} view")]
    NotSignedIn(View),
}

impl ViewError {
    pub fn code(&self) -> &'static str {
        match self {
            ViewError::AccessDenied { .. } => "access_denied",
            ViewError::NotSignedIn(_) => "not_signed_in",
        }
    }
}

/// Durable storage failure. Never surfaced to end users: the session store logs
/// these and falls back to an absent session.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed session record: {0}")]
    Codec(#[from] serde_json::Error),
    #[error("unsupported session record version {0}")]
    UnsupportedVersion(u64),
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StorageError {
    pub fn code(&self) -> &'static str {
        match self {
            StorageError::Io(_) => "storage_io",
            StorageError::Codec(_) => "storage_codec",
            StorageError::UnsupportedVersion(_) => "storage_version",
            StorageError::Backend(_) => "storage_backend",
        }
    }
}

/// Unknown name given for a role or view.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} '{value}'")]
pub struct ParseError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseError {
    pub(crate) fn new(kind: &'static str, value: &str) -> Self {
        Self { kind, value: value.to_string() }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
