//! Typed configuration structs with defaults.
//!
//! Every section and field is optional in the TOML file; missing values fall
//! back to the defaults below, so an empty file (or no file at all) yields a
//! working development configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub session: SessionConfig,
    pub auth: AuthConfig,
    pub import: ImportConfig,
    pub metadata: MetadataConfig,
    pub layout: LayoutConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseConfig {
    /// SQLite database file path.
    pub path: PathBuf,
    /// How long a writer waits on a locked database before failing.
    pub busy_timeout_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("anthology.db"),
            busy_timeout_ms: 5_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// Session lifetime. Tokens are binary valid/invalid at `now`.
    pub ttl_hours: i64,
    pub cookie_name: String,
    /// Set the `Secure` cookie attribute (production deployments).
    pub cookie_secure: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_hours: 12,
            cookie_name: "anthology_session".to_string(),
            cookie_secure: false,
        }
    }
}

/// Login allowlist. Both sets empty = development mode, every verified
/// email is accepted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuthConfig {
    pub allowed_emails: Vec<String>,
    pub allowed_domains: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImportConfig {
    /// Data rows accepted per upload; exceeding fails the import whole.
    pub max_rows: u32,
    /// Upload byte cap, enforced before any row is processed.
    pub max_upload_bytes: u64,
    /// Cap on each of the skipped/failed report lists.
    pub max_report_entries: usize,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            max_rows: 1_000,
            max_upload_bytes: 5 * 1024 * 1024,
            max_report_entries: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MetadataConfig {
    /// Book metadata provider base URL.
    pub base_url: String,
    /// Per-call timeout for upstream lookups.
    pub timeout_secs: u64,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.googleapis.com/books/v1".to_string(),
            timeout_secs: 10,
        }
    }
}

/// Margins for the scaffold layout a new shelf starts with: one row spanning
/// `[margin_y, 1 - margin_y]`, one column spanning `[margin_x, 1 - margin_x]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LayoutConfig {
    pub margin_x: f64,
    pub margin_y: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            margin_x: 0.02,
            margin_y: 0.05,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.session.ttl_hours, 12);
        assert_eq!(cfg.session.cookie_name, "anthology_session");
        assert_eq!(cfg.import.max_rows, 1_000);
        assert_eq!(cfg.import.max_upload_bytes, 5 * 1024 * 1024);
        assert_eq!(cfg.metadata.timeout_secs, 10);
        assert!(cfg.auth.allowed_emails.is_empty());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let cfg: AppConfig = toml::from_str(
            r#"
            [session]
            ttl_hours = 24

            [auth]
            allowed_domains = ["example.com"]
            "#,
        )
        .unwrap();
        assert_eq!(cfg.session.ttl_hours, 24);
        assert_eq!(cfg.session.cookie_name, "anthology_session");
        assert_eq!(cfg.auth.allowed_domains, vec!["example.com"]);
        assert_eq!(cfg.import.max_rows, 1_000);
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let result = toml::from_str::<AppConfig>("[sesion]\nttl_hours = 1\n");
        assert!(result.is_err());
    }
}
