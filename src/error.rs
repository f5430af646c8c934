use std::path::PathBuf;

use thiserror::Error;

/// Convenient alias for fallible results returned throughout the crate.
pub type Result<T> = std::result::Result<T, ToolError>;

/// Error type covering the different failure cases that can occur while
/// authorizing against the accounting API or pulling data from it.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Wrapper for IO failures such as reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Raised when JSON parsing or serialization fails.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Errors bubbled up from the CSV writer implementation.
    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),

    /// Errors bubbled up from the HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Raised when an endpoint or redirect URL fails to parse.
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Raised when a required environment variable is absent.
    #[error("missing required environment variable {0}")]
    MissingConfig(&'static str),

    /// Raised when an environment variable carries an unusable value.
    #[error("invalid value for {name}: '{value}'")]
    InvalidConfig { name: &'static str, value: String },

    /// Raised when the Extractor runs before a token has been persisted.
    #[error("token file not found: {0} (run the authorize subcommand first)")]
    MissingToken(PathBuf),

    /// Raised when the authorization listener receives an unusable request.
    #[error("malformed HTTP request: {0}")]
    MalformedRequest(String),

    /// Raised when the provider callback lacks a required query parameter.
    #[error("callback request is missing the '{0}' parameter")]
    MissingCallbackParam(&'static str),

    /// Raised when the callback state does not match the pending session.
    #[error("authorization state mismatch")]
    StateMismatch,

    /// Raised when the code-for-token exchange is rejected or unreachable.
    #[error("token exchange failed: {0}")]
    TokenExchange(String),

    /// Raised when the tracing subscriber fails to initialise.
    #[error("failed to initialise logging: {0}")]
    Logging(String),
}
