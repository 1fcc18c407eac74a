//! Refresh endpoint client.

use async_trait::async_trait;
use tracing::{debug, instrument, warn};
use url::Url;

use super::types::RefreshedTokens;
use crate::error::{Error, Result};

/// Path of the refresh endpoint relative to the API base URL.
pub const REFRESH_PATH: &str = "auth/refresh";

/// Exchanges a refresh credential for a new access credential.
///
/// Implementations must not route through the request client: the call
/// carries no access credential and must never trigger another refresh.
#[async_trait]
pub trait TokenRefresher: Send + Sync + 'static {
    async fn refresh(&self, refresh_token: &str) -> Result<RefreshedTokens>;
}

/// Refresher that POSTs `{"refresh_token": ...}` to the refresh endpoint.
#[derive(Debug, Clone)]
pub struct HttpTokenRefresher {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpTokenRefresher {
    pub fn new(client: reqwest::Client, base_url: &Url) -> Result<Self> {
        Ok(Self {
            client,
            endpoint: base_url.join(REFRESH_PATH)?,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl TokenRefresher for HttpTokenRefresher {
    #[instrument(skip_all, fields(endpoint = %self.endpoint))]
    async fn refresh(&self, refresh_token: &str) -> Result<RefreshedTokens> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&serde_json::json!({ "refresh_token": refresh_token }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "Refresh endpoint rejected refresh token");
            return Err(Error::RefreshRejected {
                status: status.as_u16(),
            });
        }

        let tokens: RefreshedTokens = response.json().await?;
        debug!(rotated = tokens.refresh_token.is_some(), "Refresh succeeded");
        Ok(tokens)
    }
}
