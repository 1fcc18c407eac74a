//! Status fetching seam between the scheduler and the API.

use async_trait::async_trait;

use super::status::TaskProgress;
use crate::error::Error;

/// Classified failure of a status fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The task no longer exists; polling stops.
    NotFound,
    /// The session is gone; polling stops.
    Unauthorized(String),
    /// Anything else; polling continues on the next tick.
    Transient(String),
}

impl FetchError {
    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient(message.into())
    }

    /// Whether polling should stop for the entity.
    pub fn stops_polling(&self) -> bool {
        !matches!(self, Self::Transient(_))
    }
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound => write!(f, "entity not found"),
            Self::Unauthorized(msg) => write!(f, "unauthorized: {}", msg),
            Self::Transient(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for FetchError {}

impl From<Error> for FetchError {
    fn from(err: Error) -> Self {
        if err.is_not_found() {
            FetchError::NotFound
        } else if err.is_auth_fatal() {
            FetchError::Unauthorized(err.to_string())
        } else {
            FetchError::transient(err.to_string())
        }
    }
}

/// Fetches the current status of a tracked task.
#[async_trait]
pub trait StatusFetcher: Send + Sync + 'static {
    async fn fetch_status(&self, id: i64) -> Result<TaskProgress, FetchError>;
}
