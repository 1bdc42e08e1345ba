//! Access guard: token extraction at the request boundary.
//!
//! The HTTP surface itself is an external collaborator; this module gives it
//! everything identity-related: cookie/bearer extraction, session
//! validation, and Set-Cookie construction. Repository owner scoping makes
//! cross-owner rows invisible; this guard only establishes *who* is asking.

use anthology_common::{user::User, Error, Result};
use anthology_config::SessionConfig;
use anthology_store::Db;

use crate::session::SessionService;

/// Challenge value for 401 responses.
pub const WWW_AUTHENTICATE: &str = "Bearer";

#[derive(Debug, Clone)]
pub struct AccessGuard {
    cookie_name: String,
    cookie_secure: bool,
    max_age_secs: i64,
}

impl AccessGuard {
    pub fn new(config: &SessionConfig) -> Self {
        AccessGuard {
            cookie_name: config.cookie_name.clone(),
            cookie_secure: config.cookie_secure,
            max_age_secs: config.ttl_hours * 3600,
        }
    }

    /// Resolve the caller from the request's Cookie and Authorization
    /// headers. The session cookie wins over a bearer token when both are
    /// present. Failures are `Auth` errors; the boundary maps them to 401
    /// with `WWW-Authenticate: Bearer`.
    pub fn authenticate(
        &self,
        db: &mut Db,
        sessions: &SessionService,
        cookie_header: Option<&str>,
        authorization_header: Option<&str>,
    ) -> Result<User> {
        let token = cookie_header
            .and_then(|header| self.token_from_cookie(header))
            .or_else(|| authorization_header.and_then(token_from_bearer));
        let Some(token) = token else {
            return Err(Error::auth("missing session token"));
        };
        match sessions.validate(db, &token)? {
            Some(user) => Ok(user),
            None => Err(Error::auth("invalid or expired session")),
        }
    }

    /// Pull the session token out of a Cookie header value.
    fn token_from_cookie(&self, header: &str) -> Option<String> {
        header.split(';').find_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            if name == self.cookie_name && !value.is_empty() {
                Some(value.to_string())
            } else {
                None
            }
        })
    }

    /// Set-Cookie value carrying a freshly issued token.
    pub fn session_cookie(&self, token: &str) -> String {
        let mut cookie = format!(
            "{}={token}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax",
            self.cookie_name, self.max_age_secs
        );
        if self.cookie_secure {
            cookie.push_str("; Secure");
        }
        cookie
    }

    /// Set-Cookie value that clears the session on logout.
    pub fn clear_cookie(&self) -> String {
        let mut cookie = format!(
            "{}=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax",
            self.cookie_name
        );
        if self.cookie_secure {
            cookie.push_str("; Secure");
        }
        cookie
    }
}

fn token_from_bearer(header: &str) -> Option<String> {
    let rest = header.strip_prefix("Bearer ").or_else(|| header.strip_prefix("bearer "))?;
    let token = rest.trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}
