//! Session issuance, validation, revocation, and sweeping.
//!
//! Tokens are 32 CSPRNG bytes, URL-safe base64 without padding (43
//! characters). The store only ever sees the SHA-256 hex of a token; the
//! plaintext exists in this module's return value and nowhere else.

use anthology_common::{user::SessionRecord, user::User, Result, SessionId, UserId};
use anthology_config::SessionConfig;
use anthology_store::{sessions, Db};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{Duration, Utc};
use rand::RngCore;
use sha2::{Digest, Sha256};

const TOKEN_BYTES: usize = 32;
/// Unpadded base64 length of 32 bytes.
pub const TOKEN_CHARS: usize = 43;
const MAX_USER_AGENT: usize = 512;
const MAX_IP: usize = 45;

/// The one-time view of a freshly minted session. The token is returned to
/// the client once and never stored.
#[derive(Debug)]
pub struct IssuedSession {
    pub token: String,
    pub record: SessionRecord,
}

#[derive(Debug, Clone)]
pub struct SessionService {
    ttl: Duration,
}

impl SessionService {
    pub fn new(config: &SessionConfig) -> Self {
        SessionService {
            ttl: Duration::hours(config.ttl_hours),
        }
    }

    /// Explicit TTL, used by tests to exercise expiry.
    pub fn with_ttl(ttl: Duration) -> Self {
        SessionService { ttl }
    }

    /// Mint a session for `user_id` and persist its hash atomically.
    pub fn issue(
        &self,
        db: &mut Db,
        user_id: UserId,
        user_agent: &str,
        ip: &str,
    ) -> Result<IssuedSession> {
        let mut bytes = [0u8; TOKEN_BYTES];
        rand::rng().fill_bytes(&mut bytes);
        let token = URL_SAFE_NO_PAD.encode(bytes);

        let now = Utc::now();
        let record = SessionRecord {
            id: SessionId::new(),
            user_id,
            token_hash: hash_token(&token),
            expires_at: now + self.ttl,
            created_at: now,
            user_agent: truncate(user_agent, MAX_USER_AGENT),
            ip_address: truncate(ip, MAX_IP),
        };
        sessions::insert(db.conn(), &record)?;
        tracing::info!(user = %user_id, session = %record.id, "issued session");
        Ok(IssuedSession { token, record })
    }

    /// Resolve a presented token to its user, or `None` for anything that is
    /// not a live session. Expired rows are best-effort deleted on the way
    /// out.
    pub fn validate(&self, db: &mut Db, token: &str) -> Result<Option<User>> {
        if !is_well_formed(token) {
            return Ok(None);
        }
        let found = sessions::find_by_hash(db.conn(), &hash_token(token))?;
        let Some((record, user)) = found else {
            return Ok(None);
        };
        if record.is_expired(Utc::now()) {
            if let Err(err) = sessions::delete_by_id(db.conn(), record.id) {
                tracing::debug!(session = %record.id, %err, "failed to drop expired session");
            }
            return Ok(None);
        }
        Ok(Some(user))
    }

    /// Delete the session for `token`. Returns the number of rows removed.
    pub fn revoke(&self, db: &mut Db, token: &str) -> Result<u64> {
        if !is_well_formed(token) {
            return Ok(0);
        }
        sessions::delete_by_hash(db.conn(), &hash_token(token))
    }

    /// Periodic cleanup of expired rows. Not a correctness mechanism:
    /// `validate` rejects expired sessions whether or not the sweeper ran.
    pub fn sweep_expired(&self, db: &mut Db) -> Result<u64> {
        let swept = sessions::delete_expired(db.conn(), Utc::now())?;
        if swept > 0 {
            tracing::info!(swept, "swept expired sessions");
        }
        Ok(swept)
    }
}

pub(crate) fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Cheap shape check so obviously malformed cookie values are rejected
/// before hashing.
fn is_well_formed(token: &str) -> bool {
    token.len() == TOKEN_CHARS
        && token
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    s[..end].to_string()
}
