//! Unified error taxonomy.
//!
//! Every fallible operation in the workspace surfaces this error type. The
//! taxonomy is intentionally small: the HTTP boundary maps each kind onto a
//! status code, and services wrap repository errors with context without
//! changing the kind.
//!
//! Not-found and forbidden are deliberately unified: a row owned by another
//! user is reported exactly like a row that does not exist, so ids cannot be
//! enumerated across owners.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for anthology operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error kinds for grouping and boundary mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed input or a failed semantic invariant.
    Validation,
    /// Missing row, or a row owned by someone else.
    NotFound,
    /// Owner-scoped uniqueness violation.
    Conflict,
    /// Missing, invalid, or expired credentials.
    Auth,
    /// Transient failure of the metadata upstream.
    Upstream,
    /// Database failure.
    Storage,
    /// File or stream I/O failure.
    Io,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::Validation => write!(f, "validation"),
            ErrorKind::NotFound => write!(f, "not_found"),
            ErrorKind::Conflict => write!(f, "conflict"),
            ErrorKind::Auth => write!(f, "auth"),
            ErrorKind::Upstream => write!(f, "upstream"),
            ErrorKind::Storage => write!(f, "storage"),
            ErrorKind::Io => write!(f, "io"),
        }
    }
}

/// Unified error type for the anthology core.
#[derive(Error, Debug)]
pub enum Error {
    #[error("{0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Auth(String),

    #[error("upstream error: {0}")]
    Upstream(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation(message.into())
    }

    /// `what` names the entity, e.g. `Error::not_found("shelf")`.
    pub fn not_found(what: impl Into<String>) -> Self {
        Error::NotFound(what.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Error::Conflict(message.into())
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Error::Auth(message.into())
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        Error::Upstream(message.into())
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Error::Storage(message.into())
    }

    /// Returns the kind for grouping and boundary mapping.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Validation(_) => ErrorKind::Validation,
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::Conflict(_) => ErrorKind::Conflict,
            Error::Auth(_) => ErrorKind::Auth,
            Error::Upstream(_) => ErrorKind::Upstream,
            Error::Storage(_) => ErrorKind::Storage,
            Error::Io(_) => ErrorKind::Io,
        }
    }

    /// HTTP status the boundary responds with for this error.
    pub fn http_status(&self) -> u16 {
        match self.kind() {
            ErrorKind::Validation => 422,
            ErrorKind::NotFound => 404,
            ErrorKind::Conflict => 409,
            ErrorKind::Auth => 401,
            ErrorKind::Upstream => 502,
            ErrorKind::Storage | ErrorKind::Io => 500,
        }
    }

    /// Wrap the message with additional context, preserving the kind.
    pub fn context(self, ctx: &str) -> Self {
        match self {
            Error::Validation(m) => Error::Validation(format!("{ctx}: {m}")),
            Error::NotFound(m) => Error::NotFound(m),
            Error::Conflict(m) => Error::Conflict(format!("{ctx}: {m}")),
            Error::Auth(m) => Error::Auth(format!("{ctx}: {m}")),
            Error::Upstream(m) => Error::Upstream(format!("{ctx}: {m}")),
            Error::Storage(m) => Error::Storage(format!("{ctx}: {m}")),
            Error::Io(e) => Error::Storage(format!("{ctx}: {e}")),
        }
    }
}

/// The JSON error body shape served by the boundary: `{"error": "..."}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl From<&Error> for ErrorBody {
    fn from(err: &Error) -> Self {
        ErrorBody {
            error: err.to_string(),
        }
    }
}
