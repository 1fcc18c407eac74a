//! Crate-wide error types.

use thiserror::Error;

/// Crate-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Crate-wide error type.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// The server answered with a non-success status.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Resource not found: {0}")]
    NotFound(String),

    /// The session is gone: refresh failed or a replay was rejected again.
    /// Never retried.
    #[error("Authentication failed: {0}")]
    AuthenticationFatal(String),

    #[error("Refresh endpoint rejected the request with status {status}")]
    RefreshRejected { status: u16 },

    #[error("Incorrect username or password")]
    InvalidLogin,

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    pub fn auth_fatal(reason: impl Into<String>) -> Self {
        Self::AuthenticationFatal(reason.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Build an error from a non-success status and its body.
    pub fn http(status: u16, body: impl Into<String>) -> Self {
        Self::Http {
            status,
            body: body.into(),
        }
    }

    /// Whether this error ends the authenticated session.
    pub fn is_auth_fatal(&self) -> bool {
        matches!(self, Self::AuthenticationFatal(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::Http { status: 404, .. })
    }
}
