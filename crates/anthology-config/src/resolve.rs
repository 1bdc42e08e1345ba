//! Config file resolution.
//!
//! Precedence: explicit path → `ANTHOLOGY_CONFIG` env var → the default
//! location under the user config dir → built-in defaults. An explicitly
//! named file that is missing or malformed is an error; the default
//! location is only used when it exists.

use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::model::AppConfig;
use crate::ENV_CONFIG_PATH;

const CONFIG_DIR_NAME: &str = "anthology";
const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Default config file location (`<config dir>/anthology/config.toml`).
pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// Load configuration following the resolution order above.
pub fn load(explicit: Option<&Path>) -> Result<AppConfig, ConfigError> {
    if let Some(path) = explicit {
        return load_file(path);
    }
    if let Ok(env_path) = std::env::var(ENV_CONFIG_PATH) {
        if !env_path.is_empty() {
            return load_file(Path::new(&env_path));
        }
    }
    if let Some(path) = default_path() {
        if path.exists() {
            return load_file(&path);
        }
    }
    Ok(AppConfig::default())
}

fn load_file(path: &Path) -> Result<AppConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }
    let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    toml::from_str(&raw).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_explicit_path_loads() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[session]\nttl_hours = 6").unwrap();
        let cfg = load(Some(file.path())).unwrap();
        assert_eq!(cfg.session.ttl_hours, 6);
    }

    #[test]
    fn test_explicit_missing_path_errors() {
        let err = load(Some(Path::new("/nonexistent/anthology.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_malformed_file_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "this is not toml ][").unwrap();
        let err = load(Some(file.path())).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
