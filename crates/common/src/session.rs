//! Browser session cookie contract.
//!
//! The API sets this cookie on login and clears it on logout; the auth
//! middleware accepts it as an alternative to the `Authorization` header.

/// Name of the cookie carrying the session token.
pub const SESSION_COOKIE_NAME: &str = "token";

/// Session cookie lifetime in seconds (24 hours).
pub const SESSION_COOKIE_MAX_AGE_SECS: u64 = 86_400;

/// Build the `Set-Cookie` value that stores `token` for a browser session.
///
/// The cookie is `HttpOnly` and `SameSite=Lax`, scoped to `/`.
#[must_use]
pub fn session_cookie(token: &str) -> String {
    format!(
        "{SESSION_COOKIE_NAME}={token}; HttpOnly; SameSite=Lax; Path=/; Max-Age={SESSION_COOKIE_MAX_AGE_SECS}"
    )
}

/// Build the `Set-Cookie` value that removes the session cookie.
#[must_use]
pub fn expired_session_cookie() -> String {
    format!("{SESSION_COOKIE_NAME}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0")
}

/// Find the session token in a `Cookie` request header value.
///
/// Returns `None` if the cookie is absent or empty.
#[must_use]
pub fn token_from_cookie_header(header: &str) -> Option<&str> {
    header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE_NAME)
        .map(|(_, value)| value.trim())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_cookie_attributes() {
        let cookie = session_cookie("abc.def.ghi");

        assert!(cookie.starts_with("token=abc.def.ghi;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(cookie.contains("Max-Age=86400"));
    }

    #[test]
    fn test_expired_cookie_has_zero_max_age() {
        assert!(expired_session_cookie().contains("Max-Age=0"));
    }

    #[test]
    fn test_token_from_cookie_header() {
        assert_eq!(
            token_from_cookie_header("theme=dark; token=abc.def.ghi; lang=en"),
            Some("abc.def.ghi")
        );
        assert_eq!(token_from_cookie_header("token=abc"), Some("abc"));
        assert_eq!(token_from_cookie_header("theme=dark"), None);
        assert_eq!(token_from_cookie_header("token="), None);
        assert_eq!(token_from_cookie_header("mytoken=abc"), None);
    }
}
