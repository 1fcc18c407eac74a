//! Core credential types.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Access/refresh credential pair representing an authenticated session.
///
/// Token validity is never decoded locally; it is inferred from request outcomes.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialPair {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

impl CredentialPair {
    pub fn new(access_token: impl Into<String>, refresh_token: Option<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token,
        }
    }
}

impl fmt::Debug for CredentialPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialPair")
            .field("access_token", &"<redacted>")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

/// Result of a successful refresh call.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct RefreshedTokens {
    pub access_token: String,
    /// Rotated refresh token, if the server issued one.
    #[serde(default)]
    pub refresh_token: Option<String>,
}

impl fmt::Debug for RefreshedTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshedTokens")
            .field("rotated", &self.refresh_token.is_some())
            .finish_non_exhaustive()
    }
}

/// Coordinator state. There is no terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshState {
    Idle,
    Refreshing,
}

/// Why a session ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignOutReason {
    /// The refresh endpoint rejected the refresh credential or was unreachable.
    RefreshFailed,
    /// No refresh credential was available when one was needed.
    MissingRefreshToken,
    /// A request replayed with a fresh credential was rejected again.
    ReplayRejected,
    /// The user signed out explicitly.
    UserRequested,
}

/// Session lifecycle events published by the coordinator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SessionEvent {
    SignedIn {
        timestamp: DateTime<Utc>,
    },
    Refreshed {
        /// Number of waiters replayed with the new credential.
        waiters: usize,
        timestamp: DateTime<Utc>,
    },
    /// Global sign-out signal for the session/view layer.
    SignedOut {
        reason: SignOutReason,
        timestamp: DateTime<Utc>,
    },
}

impl SessionEvent {
    pub fn is_sign_out(&self) -> bool {
        matches!(self, Self::SignedOut { .. })
    }

    /// Get a human-readable description of the event.
    pub fn description(&self) -> String {
        match self {
            Self::SignedIn { .. } => "Signed in".to_string(),
            Self::Refreshed { waiters, .. } => {
                format!("Access token refreshed ({} waiting requests replayed)", waiters)
            }
            Self::SignedOut { reason, .. } => format!("Signed out: {:?}", reason),
        }
    }
}
