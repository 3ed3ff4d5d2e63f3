use super::*;

#[test]
fn auth_error_codes() {
    assert_eq!(AuthError::MissingCredentials.code(), "missing_credentials");
    assert_eq!(AuthError::InvalidCredentials.code(), "invalid_credentials");
    assert_eq!(AuthError::AccountExists("a@b.c".into()).code(), "account_exists");
    assert_eq!(AuthError::NetworkUnavailable("down".into()).code(), "network_unavailable");
    assert_eq!(AuthError::RateLimited.code(), "rate_limited");
}

#[test]
fn view_error_messages_name_role_and_view() {
    let denied = ViewError::AccessDenied { role: Role::Citizen, view: View::Government };
    assert_eq!(denied.code(), "access_denied");
    assert_eq!(denied.to_string(), "the citizen role cannot open the government view");

    let anon = ViewError::NotSignedIn(View::Industry);
    assert_eq!(anon.code(), "not_signed_in");
    assert_eq!(anon.to_string(), "sign in to open the industry view");
}

#[test]
fn storage_error_wraps_sources() {
    let io = StorageError::from(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "ro"));
    assert_eq!(io.code(), "storage_io");

    let codec = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
    assert_eq!(StorageError::from(codec).code(), "storage_codec");
    assert_eq!(StorageError::UnsupportedVersion(9).to_string(), "unsupported session record version 9");
}

#[test]
fn parse_error_display() {
    assert_eq!(ParseError::new("role", "admin").to_string(), "unknown role 'admin'");
}
