//! In-memory credential store.
//!
//! Readable by every component; written only by the refresh coordinator,
//! which is why the mutators are crate-private.

use parking_lot::RwLock;

use super::types::{CredentialPair, RefreshedTokens};

#[derive(Debug, Default)]
pub struct CredentialStore {
    inner: RwLock<Option<CredentialPair>>,
}

impl CredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credentials(pair: CredentialPair) -> Self {
        Self {
            inner: RwLock::new(Some(pair)),
        }
    }

    /// Current access token, if signed in.
    pub fn access_token(&self) -> Option<String> {
        self.inner.read().as_ref().map(|p| p.access_token.clone())
    }

    /// Current refresh token, if any.
    pub fn refresh_token(&self) -> Option<String> {
        self.inner
            .read()
            .as_ref()
            .and_then(|p| p.refresh_token.clone())
    }

    pub fn snapshot(&self) -> Option<CredentialPair> {
        self.inner.read().clone()
    }

    pub fn is_signed_in(&self) -> bool {
        self.inner.read().is_some()
    }

    pub(crate) fn set(&self, pair: CredentialPair) {
        *self.inner.write() = Some(pair);
    }

    /// Store a refreshed access token, keeping the old refresh token unless
    /// the server rotated it.
    pub(crate) fn apply_refresh(&self, tokens: RefreshedTokens) {
        let mut guard = self.inner.write();
        let refresh_token = tokens
            .refresh_token
            .or_else(|| guard.as_ref().and_then(|p| p.refresh_token.clone()));
        *guard = Some(CredentialPair {
            access_token: tokens.access_token,
            refresh_token,
        });
    }

    pub(crate) fn clear(&self) {
        *self.inner.write() = None;
    }
}
