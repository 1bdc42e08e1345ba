//! User and session records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::{SessionId, UserId};

/// An authenticated owner. Identity is keyed by (provider, subject); the
/// pair never changes after creation, while profile fields refresh on each
/// login.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub display_name: String,
    pub avatar_url: String,
    pub oauth_provider: String,
    pub oauth_subject: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

/// A stored session row. The opaque token is held only by the client; this
/// record carries the SHA-256 hex of it, never the plaintext.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub id: SessionId,
    pub user_id: UserId,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    /// Truncated to 512 bytes on write.
    pub user_agent: String,
    /// Truncated to 45 bytes on write (fits IPv6 text form).
    pub ip_address: String,
}

impl SessionRecord {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_session_expiry_boundary() {
        let now = Utc::now();
        let rec = SessionRecord {
            id: SessionId::new(),
            user_id: UserId::new(),
            token_hash: "ab".repeat(32),
            expires_at: now,
            created_at: now - Duration::hours(12),
            user_agent: String::new(),
            ip_address: String::new(),
        };
        // expires_at == now counts as expired; tokens are binary valid/invalid.
        assert!(rec.is_expired(now));
        assert!(!rec.is_expired(now - Duration::seconds(1)));
    }
}
