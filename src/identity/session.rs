use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::warn;
use uuid::Uuid;

use super::principal::{default_display_name, normalize_email, Role, User};
use crate::error::StorageError;

pub type SessionToken = String;

/// Storage key under which the session record is kept.
pub const SESSION_KEY: &str = "fatecraft.auth.session";

/// Current layout of the persisted session record.
pub const RECORD_VERSION: u64 = 1;

/// Who is signed in, and as what role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    token: SessionToken,
    user: User,
    issued_at: DateTime<Utc>,
}

impl Session {
    pub fn new(token: SessionToken, user: User, issued_at: DateTime<Utc>) -> Self {
        Self { token, user, issued_at }
    }

    pub fn token(&self) -> &str { &self.token }
    pub fn user(&self) -> &User { &self.user }
    pub fn role(&self) -> Role { self.user.role() }
    pub fn issued_at(&self) -> DateTime<Utc> { self.issued_at }
}

/// Time source for session timestamps; swapped out in tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> { Utc::now() }
}

/// Random 256-bit token, base64url without padding.
pub(crate) fn gen_token() -> SessionToken {
    let mut buf = [0u8; 32];
    if let Err(e) = getrandom::getrandom(&mut buf) {
        warn!(target: "fatecraft::session", "os rng unavailable ({}); using uuid entropy for token", e);
        buf[..16].copy_from_slice(Uuid::new_v4().as_bytes());
        buf[16..].copy_from_slice(Uuid::new_v4().as_bytes());
    }
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(buf)
}

#[derive(Serialize, Deserialize)]
struct Record {
    version: u64,
    #[serde(flatten)]
    session: Session,
}

// Shape written by the first demo build: no version, no role.
#[derive(Deserialize)]
struct LegacyRecord {
    access_token: String,
    user: LegacyUser,
}

#[derive(Deserialize)]
struct LegacyUser {
    id: String,
    email: String,
}

/// Outcome of reading a stored record.
#[derive(Debug)]
pub(crate) enum Decoded {
    Current(Session),
    /// Legacy record upgraded in memory; the caller should rewrite it.
    Migrated(Session),
}

pub(crate) fn encode(session: &Session) -> Result<String, StorageError> {
    let rec = Record { version: RECORD_VERSION, session: session.clone() };
    Ok(serde_json::to_string(&rec)?)
}

pub(crate) fn decode(raw: &str, now: DateTime<Utc>) -> Result<Decoded, StorageError> {
    let value: JsonValue = serde_json::from_str(raw)?;
    match value.get("version") {
        Some(v) => {
            let version = v.as_u64().ok_or(StorageError::UnsupportedVersion(0))?;
            if version != RECORD_VERSION {
                return Err(StorageError::UnsupportedVersion(version));
            }
            let rec: Record = serde_json::from_value(value)?;
            Ok(Decoded::Current(rec.session))
        }
        None => {
            let legacy: LegacyRecord = serde_json::from_value(value)?;
            let email = normalize_email(&legacy.user.email);
            let display = default_display_name(&email);
            let user = User::with_id(legacy.user.id, email, Role::Citizen, Some(display));
            Ok(Decoded::Migrated(Session::new(legacy.access_token, user, now)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at() -> DateTime<Utc> { Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).unwrap() }

    #[test]
    fn tokens_are_unique_and_url_safe() {
        let a = gen_token();
        let b = gen_token();
        assert_ne!(a, b);
        assert_eq!(a.len(), 43);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn record_carries_version() {
        let s = Session::new("tok".into(), User::new("demo@gov.com", Role::Government, None), at());
        let raw = encode(&s).unwrap();
        let v: JsonValue = serde_json::from_str(&raw).unwrap();
        assert_eq!(v["version"], 1);
        assert_eq!(v["token"], "tok");
        assert_eq!(v["user"]["role"], "government");
        assert_eq!(v["user"]["display_name"], "demo");
        match decode(&raw, Utc::now()).unwrap() {
            Decoded::Current(back) => assert_eq!(back, s),
            other => panic!("expected current record, got {:?}", other),
        }
    }

    #[test]
    fn legacy_record_migrates_to_citizen() {
        let raw = r#"{"access_token":"mock-token","user":{"id":"mock-user-id","email":"Ana@Example.com"}}"#;
        match decode(raw, at()).unwrap() {
            Decoded::Migrated(s) => {
                assert_eq!(s.token(), "mock-token");
                assert_eq!(s.user().id(), "mock-user-id");
                assert_eq!(s.user().email(), "ana@example.com");
                assert_eq!(s.role(), Role::Citizen);
                assert_eq!(s.user().display_name(), "ana");
                assert_eq!(s.issued_at(), at());
            }
            other => panic!("expected migration, got {:?}", other),
        }
    }

    #[test]
    fn future_version_is_rejected() {
        let raw = r#"{"version":7,"token":"t"}"#;
        assert!(matches!(decode(raw, at()), Err(StorageError::UnsupportedVersion(7))));
    }

    #[test]
    fn garbage_is_a_codec_error() {
        assert!(matches!(decode("not json", at()), Err(StorageError::Codec(_))));
        assert!(matches!(decode(r#"{"version":1}"#, at()), Err(StorageError::Codec(_))));
    }
}
