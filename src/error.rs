//! Error types for the vitrina catalog search core.
//!
//! All fallible operations return [`Result`], whose error type distinguishes
//! the outcomes that matter to callers: bad input (rejected before any query
//! is built), a missed point lookup (distinct from an empty search result),
//! a transport failure (retryable by the caller, never masked as an empty
//! result), and a malformed response from the document index.

use thiserror::Error;

/// The main error type for catalog search operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed filter/sort/paging parameter, named by field.
    #[error("invalid parameter `{field}`: {message}")]
    Validation { field: String, message: String },

    /// A point lookup (product/variant detail) missed.
    ///
    /// Empty search results are not errors; only direct id lookups produce
    /// this variant.
    #[error("not found: {0}")]
    NotFound(String),

    /// The document index was unreachable or timed out.
    ///
    /// Retryable by the caller; retry/backoff policy belongs to the
    /// transport, not this layer.
    #[error("search transport error: {message}")]
    Transport { message: String, retryable: bool },

    /// The document index answered with a shape this layer cannot interpret.
    #[error("unexpected search engine response: {0}")]
    Backend(String),

    /// JSON serialization/deserialization errors.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for operations that may fail with [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a new validation error naming the offending field.
    pub fn validation<F: Into<String>, M: Into<String>>(field: F, message: M) -> Self {
        Error::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a new not-found error.
    pub fn not_found<S: Into<String>>(what: S) -> Self {
        Error::NotFound(what.into())
    }

    /// Create a new retryable transport error.
    pub fn transport<S: Into<String>>(message: S) -> Self {
        Error::Transport {
            message: message.into(),
            retryable: true,
        }
    }

    /// Create a new backend-response error.
    pub fn backend<S: Into<String>>(message: S) -> Self {
        Error::Backend(message.into())
    }

    /// Whether the caller may safely retry the failed operation.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Transport { retryable: true, .. })
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Transport {
            message: err.to_string(),
            // Request-construction bugs are not worth retrying.
            retryable: !err.is_builder(),
        }
    }
}
