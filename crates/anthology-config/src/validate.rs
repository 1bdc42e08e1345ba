//! Semantic validation over a loaded configuration.
//!
//! Parsing catches shape errors; this pass catches values that parse fine
//! but cannot work, collecting every issue rather than stopping at the
//! first.

use crate::model::AppConfig;

/// Validate semantic constraints. Returns all issues found; an empty list
/// means the configuration is usable.
pub fn validate(cfg: &AppConfig) -> Vec<String> {
    let mut issues = Vec::new();

    if cfg.session.ttl_hours <= 0 {
        issues.push(format!(
            "session.ttl_hours must be positive, got {}",
            cfg.session.ttl_hours
        ));
    }
    if cfg.session.cookie_name.is_empty()
        || !cfg
            .session
            .cookie_name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        issues.push(format!(
            "session.cookie_name must be a non-empty cookie token, got {:?}",
            cfg.session.cookie_name
        ));
    }

    if cfg.import.max_rows == 0 {
        issues.push("import.max_rows must be positive".to_string());
    }
    if cfg.import.max_upload_bytes == 0 {
        issues.push("import.max_upload_bytes must be positive".to_string());
    }
    if cfg.import.max_report_entries == 0 {
        issues.push("import.max_report_entries must be positive".to_string());
    }

    if !cfg.metadata.base_url.starts_with("http://") && !cfg.metadata.base_url.starts_with("https://")
    {
        issues.push(format!(
            "metadata.base_url must be an http(s) URL, got {:?}",
            cfg.metadata.base_url
        ));
    }
    if cfg.metadata.timeout_secs == 0 {
        issues.push("metadata.timeout_secs must be positive".to_string());
    }

    for (name, margin) in [
        ("layout.margin_x", cfg.layout.margin_x),
        ("layout.margin_y", cfg.layout.margin_y),
    ] {
        if !(0.0..0.5).contains(&margin) {
            issues.push(format!(
                "{name} must lie in [0, 0.5) so the scaffold slot keeps positive area, got {margin}"
            ));
        }
    }

    for email in &cfg.auth.allowed_emails {
        if !email.contains('@') {
            issues.push(format!("auth.allowed_emails entry {email:?} is not an email"));
        }
    }
    for domain in &cfg.auth.allowed_domains {
        if domain.is_empty() || domain.contains('@') {
            issues.push(format!(
                "auth.allowed_domains entry {domain:?} is not a bare domain"
            ));
        }
    }

    if cfg.database.busy_timeout_ms == 0 {
        issues.push("database.busy_timeout_ms must be positive".to_string());
    }

    issues
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(validate(&AppConfig::default()).is_empty());
    }

    #[test]
    fn test_bad_ttl_flagged() {
        let mut cfg = AppConfig::default();
        cfg.session.ttl_hours = 0;
        let issues = validate(&cfg);
        assert_eq!(issues.len(), 1);
        assert!(issues[0].contains("ttl_hours"));
    }

    #[test]
    fn test_collects_multiple_issues() {
        let mut cfg = AppConfig::default();
        cfg.session.ttl_hours = -1;
        cfg.layout.margin_x = 0.7;
        cfg.metadata.base_url = "ftp://example".to_string();
        cfg.auth.allowed_domains = vec!["user@example.com".to_string()];
        let issues = validate(&cfg);
        assert_eq!(issues.len(), 4);
    }

    #[test]
    fn test_allowlist_shapes() {
        let mut cfg = AppConfig::default();
        cfg.auth.allowed_emails = vec!["owner@example.com".to_string()];
        cfg.auth.allowed_domains = vec!["example.com".to_string()];
        assert!(validate(&cfg).is_empty());
    }
}
