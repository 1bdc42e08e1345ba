//! Anthology configuration loading and validation.
//!
//! This crate provides:
//! - Typed structs for the TOML configuration file
//! - Config resolution (explicit path → env → default location → defaults)
//! - Semantic validation producing a list of human-readable issues

pub mod model;
pub mod resolve;
pub mod validate;

pub use model::{
    AppConfig, AuthConfig, DatabaseConfig, ImportConfig, LayoutConfig, MetadataConfig,
    SessionConfig,
};
pub use resolve::{load, ConfigError};
pub use validate::validate;

/// Env var naming an explicit config file path.
pub const ENV_CONFIG_PATH: &str = "ANTHOLOGY_CONFIG";
