use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::principal::{default_display_name, normalize_email, Role};
use super::session::{gen_token, SessionToken};
use crate::error::AuthError;

/// Credentials for sign-in and sign-up. Construction rejects blank fields.
#[derive(Clone)]
pub struct LoginRequest {
    email: String,
    password: String,
}

impl LoginRequest {
    pub fn new(email: &str, password: &str) -> Result<Self, AuthError> {
        let email = normalize_email(email);
        if email.is_empty() || password.trim().is_empty() {
            return Err(AuthError::MissingCredentials);
        }
        Ok(Self { email, password: password.to_string() })
    }

    pub fn email(&self) -> &str { &self.email }
    pub fn password(&self) -> &str { &self.password }
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest").field("email", &self.email).field("password", &"<redacted>").finish()
    }
}

/// What the identity provider hands back for accepted credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grant {
    pub token: SessionToken,
    /// Provider-issued user id; derived from the email when absent.
    pub user_id: Option<String>,
}

/// Remote identity provider seam. Errors are typed so the store can report
/// them without touching the current session.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn sign_in(&self, req: &LoginRequest) -> Result<Grant, AuthError>;
    async fn sign_up(&self, req: &LoginRequest, role: Role) -> Result<Grant, AuthError>;
    async fn sign_out(&self, token: Option<&str>) -> Result<(), AuthError>;
}

/// Demo-only provider: accepts any non-empty credentials after a simulated
/// round trip. Not an authentication system; never deploy it as one.
#[derive(Debug, Clone)]
pub struct MockAuthProvider {
    pub sign_in_delay: Duration,
    pub sign_out_delay: Duration,
}

impl Default for MockAuthProvider {
    fn default() -> Self {
        Self { sign_in_delay: Duration::from_millis(500), sign_out_delay: Duration::from_millis(200) }
    }
}

impl MockAuthProvider {
    pub fn with_latency(sign_in_delay: Duration, sign_out_delay: Duration) -> Self {
        Self { sign_in_delay, sign_out_delay }
    }

    /// No simulated latency; what tests use.
    pub fn instant() -> Self { Self::with_latency(Duration::ZERO, Duration::ZERO) }

    async fn round_trip(delay: Duration) {
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl AuthProvider for MockAuthProvider {
    async fn sign_in(&self, req: &LoginRequest) -> Result<Grant, AuthError> {
        Self::round_trip(self.sign_in_delay).await;
        debug!(target: "fatecraft::session", "mock provider accepted sign-in for {}", req.email());
        Ok(Grant { token: gen_token(), user_id: None })
    }

    async fn sign_up(&self, req: &LoginRequest, role: Role) -> Result<Grant, AuthError> {
        Self::round_trip(self.sign_in_delay).await;
        debug!(target: "fatecraft::session", "mock provider accepted sign-up for {} as {}", req.email(), role);
        Ok(Grant { token: gen_token(), user_id: None })
    }

    async fn sign_out(&self, _token: Option<&str>) -> Result<(), AuthError> {
        Self::round_trip(self.sign_out_delay).await;
        Ok(())
    }
}

/// Role and display name attached to a signed-in email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleAssignment {
    pub role: Role,
    pub display_name: String,
}

/// Strategy deciding the role of a signing-in user. The demo table stands in
/// for role claims a real identity provider would issue.
pub trait RoleResolver: Send + Sync {
    fn resolve(&self, email: &str) -> RoleAssignment;
}

/// Fixed table of demo accounts; every other address is a citizen.
#[derive(Debug, Clone)]
pub struct DemoRoleTable {
    entries: Vec<(String, RoleAssignment)>,
}

impl Default for DemoRoleTable {
    fn default() -> Self {
        Self {
            entries: vec![
                ("demo@industry.com".to_string(), RoleAssignment { role: Role::Industry, display_name: "Industry Demo".into() }),
                ("demo@gov.com".to_string(), RoleAssignment { role: Role::Government, display_name: "Government Demo".into() }),
            ],
        }
    }
}

impl DemoRoleTable {
    /// Add or replace an entry.
    pub fn with_entry(mut self, email: &str, role: Role, display_name: &str) -> Self {
        let email = normalize_email(email);
        self.entries.retain(|(e, _)| *e != email);
        self.entries.push((email, RoleAssignment { role, display_name: display_name.to_string() }));
        self
    }
}

impl RoleResolver for DemoRoleTable {
    fn resolve(&self, email: &str) -> RoleAssignment {
        let email = normalize_email(email);
        self.entries
            .iter()
            .find(|(e, _)| *e == email)
            .map(|(_, a)| a.clone())
            .unwrap_or_else(|| RoleAssignment { role: Role::Citizen, display_name: default_display_name(&email) })
    }
}
