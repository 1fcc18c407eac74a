//! Session credential management.
//!
//! Holds the access/refresh pair for the signed-in operator and serializes
//! re-authentication when the API starts rejecting the access token.
//!
//! # Architecture
//!
//! - [`CredentialStore`]: Current credential pair, readable by everyone
//! - [`TokenRefresher`]: Exchanges a refresh token for a new access token
//! - [`RefreshCoordinator`]: Single-flight refresh with a queue of waiting requests
//! - [`SessionEvent`]: Lifecycle notifications, including the global sign-out

mod coordinator;
mod refresher;
mod store;
mod types;

pub use coordinator::RefreshCoordinator;
pub use refresher::{HttpTokenRefresher, REFRESH_PATH, TokenRefresher};
pub use store::CredentialStore;
pub use types::{CredentialPair, RefreshState, RefreshedTokens, SessionEvent, SignOutReason};
