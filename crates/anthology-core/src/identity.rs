//! OAuth claim ingestion.
//!
//! Accepts a verified claim set from the OAuth collaborator and turns it
//! into a user row. Identity is keyed by (provider, subject) only; there is
//! deliberately no link-by-email path, and an email collision across
//! providers is a conflict rather than a merge.

use std::collections::HashSet;

use anthology_common::{user::User, Error, Result, UserId};
use anthology_config::AuthConfig;
use anthology_store::{users, Db};
use chrono::Utc;

/// Verified claims delivered by the OAuth collaborator after code exchange.
#[derive(Debug, Clone)]
pub struct OAuthClaims {
    pub provider: String,
    pub subject: String,
    pub email: String,
    pub email_verified: bool,
    pub name: String,
    pub picture: String,
}

#[derive(Debug, Clone)]
pub struct IdentityService {
    allowed_emails: HashSet<String>,
    allowed_domains: HashSet<String>,
}

impl IdentityService {
    pub fn new(config: &AuthConfig) -> Self {
        IdentityService {
            allowed_emails: config
                .allowed_emails
                .iter()
                .map(|e| e.to_lowercase())
                .collect(),
            allowed_domains: config
                .allowed_domains
                .iter()
                .map(|d| d.to_lowercase())
                .collect(),
        }
    }

    /// Empty allowlists mean development mode: every verified email passes.
    fn email_allowed(&self, email: &str) -> bool {
        if self.allowed_emails.is_empty() && self.allowed_domains.is_empty() {
            return true;
        }
        let email = email.to_lowercase();
        if self.allowed_emails.contains(&email) {
            return true;
        }
        email
            .rsplit_once('@')
            .map(|(_, domain)| self.allowed_domains.contains(domain))
            .unwrap_or(false)
    }

    /// Lookup-or-create for a claim set. Existing users get their profile
    /// fields and last-login refreshed in a single update.
    pub fn login(&self, db: &mut Db, claims: &OAuthClaims) -> Result<User> {
        if !claims.email_verified {
            return Err(Error::auth("email is not verified"));
        }
        if !self.email_allowed(&claims.email) {
            return Err(Error::auth("email is not allowed to sign in"));
        }

        let now = Utc::now();
        if let Some(existing) =
            users::find_by_oauth(db.conn(), &claims.provider, &claims.subject)?
        {
            let refreshed =
                users::refresh_profile(db.conn(), existing.id, &claims.name, &claims.picture, now)?;
            tracing::info!(user = %refreshed.id, "login refreshed existing user");
            return Ok(refreshed);
        }

        if users::find_by_email(db.conn(), &claims.email)?.is_some() {
            return Err(Error::conflict(
                "an account with that email already exists under a different identity",
            ));
        }

        let user = User {
            id: UserId::new(),
            email: claims.email.clone(),
            display_name: claims.name.clone(),
            avatar_url: claims.picture.clone(),
            oauth_provider: claims.provider.clone(),
            oauth_subject: claims.subject.clone(),
            created_at: now,
            updated_at: now,
            last_login_at: Some(now),
        };
        users::insert(db.conn(), &user)?;
        tracing::info!(user = %user.id, "created user on first login");
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anthology_store::Db;

    fn claims(provider: &str, subject: &str, email: &str) -> OAuthClaims {
        OAuthClaims {
            provider: provider.to_string(),
            subject: subject.to_string(),
            email: email.to_string(),
            email_verified: true,
            name: "Someone".to_string(),
            picture: "https://img/x.png".to_string(),
        }
    }

    fn open_service(config: AuthConfig) -> (IdentityService, Db) {
        (IdentityService::new(&config), Db::open_in_memory().unwrap())
    }

    #[test]
    fn test_first_login_creates_user() {
        let (service, mut db) = open_service(AuthConfig::default());
        let user = service.login(&mut db, &claims("google", "sub1", "a@example.com")).unwrap();
        assert_eq!(user.email, "a@example.com");
        assert!(user.last_login_at.is_some());
    }

    #[test]
    fn test_repeat_login_refreshes_profile() {
        let (service, mut db) = open_service(AuthConfig::default());
        let first = service.login(&mut db, &claims("google", "sub1", "a@example.com")).unwrap();

        let mut updated = claims("google", "sub1", "a@example.com");
        updated.name = "Renamed".to_string();
        let second = service.login(&mut db, &updated).unwrap();
        assert_eq!(second.id, first.id);
        assert_eq!(second.display_name, "Renamed");
    }

    #[test]
    fn test_unverified_email_rejected() {
        let (service, mut db) = open_service(AuthConfig::default());
        let mut c = claims("google", "sub1", "a@example.com");
        c.email_verified = false;
        assert_eq!(service.login(&mut db, &c).unwrap_err().http_status(), 401);
    }

    #[test]
    fn test_allowlist_by_email_and_domain() {
        let config = AuthConfig {
            allowed_emails: vec!["vip@other.com".to_string()],
            allowed_domains: vec!["example.com".to_string()],
        };
        let (service, mut db) = open_service(config);

        assert!(service.login(&mut db, &claims("google", "s1", "any@example.com")).is_ok());
        assert!(service.login(&mut db, &claims("google", "s2", "VIP@other.com")).is_ok());
        let err = service
            .login(&mut db, &claims("google", "s3", "stranger@nope.com"))
            .unwrap_err();
        assert_eq!(err.http_status(), 401);
    }

    #[test]
    fn test_email_collision_across_providers_conflicts() {
        let (service, mut db) = open_service(AuthConfig::default());
        service.login(&mut db, &claims("google", "sub1", "a@example.com")).unwrap();
        let err = service
            .login(&mut db, &claims("github", "sub9", "a@example.com"))
            .unwrap_err();
        assert_eq!(err.http_status(), 409);
    }
}
