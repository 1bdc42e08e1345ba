//! Metadata client errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MetadataError {
    /// Query too short or otherwise unusable; never retried.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// Lookup category the upstream cannot serve.
    #[error("unsupported category: {0}")]
    UnsupportedCategory(String),

    /// No match upstream, or a malformed barcode answered locally.
    #[error("no metadata found")]
    NotFound,

    /// Upstream answered with a non-success status.
    #[error("upstream status {0}")]
    UpstreamStatus(u16),

    /// Transport-level failure (timeout, DNS, connection).
    #[error("upstream request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Upstream payload did not decode.
    #[error("failed to decode upstream response: {0}")]
    Decode(String),
}

impl MetadataError {
    /// Per-row errors in the importer; everything else is transient.
    pub fn is_per_row(&self) -> bool {
        matches!(
            self,
            MetadataError::NotFound
                | MetadataError::InvalidQuery(_)
                | MetadataError::UnsupportedCategory(_)
        )
    }
}
