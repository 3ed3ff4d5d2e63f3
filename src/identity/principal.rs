use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ParseError;

/// Closed set of user classes. Serialized in lowercase to match the values the
/// dashboard has always stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Citizen,
    Industry,
    Government,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Citizen, Role::Industry, Role::Government];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Citizen => "citizen",
            Role::Industry => "industry",
            Role::Government => "government",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "citizen" => Ok(Role::Citizen),
            "industry" => Ok(Role::Industry),
            "government" | "gov" => Ok(Role::Government),
            _ => Err(ParseError::new("role", s)),
        }
    }
}

/// Authenticated user attached to a session.
///
/// Fields are read-only once built: the role in particular cannot be changed on
/// an existing session, a different role needs a new session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    id: String,
    email: String,
    role: Role,
    display_name: String,
}

impl User {
    /// Build a user whose id is derived from the normalized email, so signing in
    /// again with the same address yields the same id.
    pub fn new(email: &str, role: Role, display_name: Option<String>) -> Self {
        let email = normalize_email(email);
        let id = user_id_for(&email);
        Self::with_id(id, email, role, display_name)
    }

    pub(crate) fn with_id(id: String, email: String, role: Role, display_name: Option<String>) -> Self {
        let display_name = match display_name {
            Some(name) if !name.trim().is_empty() => name.trim().to_string(),
            _ => default_display_name(&email),
        };
        Self { id, email, role, display_name }
    }

    pub fn id(&self) -> &str { &self.id }
    pub fn email(&self) -> &str { &self.email }
    pub fn role(&self) -> Role { self.role }
    pub fn display_name(&self) -> &str { &self.display_name }
}

/// Trimmed, lowercased form used as the sign-in key.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

/// Local part of the address, or "User" when there is none.
pub fn default_display_name(email: &str) -> String {
    let local = email.trim().split('@').next().unwrap_or_default();
    if local.is_empty() { "User".to_string() } else { local.to_string() }
}

fn user_id_for(normalized_email: &str) -> String {
    Uuid::new_v5(&Uuid::NAMESPACE_URL, format!("mailto:{}", normalized_email).as_bytes()).to_string()
}
