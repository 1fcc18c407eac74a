//! Request client: the single path every authenticated API call goes through.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::config::ConsoleConfig;
use crate::credentials::{
    CredentialPair, CredentialStore, HttpTokenRefresher, RefreshCoordinator, TokenRefresher,
};
use crate::error::{Error, Result};
use crate::http;
use crate::transport::{ApiResponse, ReqwestTransport, RequestDescriptor, Transport};

/// Login endpoint, relative to the API base URL.
pub const LOGIN_PATH: &str = "auth/token";

#[derive(Debug, Deserialize)]
struct LoginResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
}

/// Sends requests with the current access token and routes authentication
/// failures through the [`RefreshCoordinator`].
///
/// Clones share the transport, store and coordinator.
#[derive(Clone)]
pub struct RequestClient {
    transport: Arc<dyn Transport>,
    coordinator: RefreshCoordinator,
}

impl RequestClient {
    /// Assemble a client from its parts.
    pub fn new(
        transport: Arc<dyn Transport>,
        refresher: Arc<dyn TokenRefresher>,
        store: Arc<CredentialStore>,
    ) -> Self {
        let coordinator = RefreshCoordinator::new(store, refresher, transport.clone());
        Self {
            transport,
            coordinator,
        }
    }

    /// Build a `reqwest`-backed client from configuration.
    pub fn from_config(config: &ConsoleConfig) -> Result<Self> {
        config.validate()?;
        let client = http::build_client(config)?;
        let refresher = HttpTokenRefresher::new(client.clone(), &config.base_url)?;
        let transport = ReqwestTransport::new(client, config.base_url.clone());

        Ok(Self::new(
            Arc::new(transport),
            Arc::new(refresher),
            Arc::new(CredentialStore::new()),
        ))
    }

    pub fn coordinator(&self) -> &RefreshCoordinator {
        &self.coordinator
    }

    pub fn store(&self) -> &Arc<CredentialStore> {
        self.coordinator.store()
    }

    /// Send a request with the current access token.
    ///
    /// A 401 hands the request to the coordinator; the caller sees the replayed
    /// response or a fatal authentication error. Every other status is returned
    /// unchanged.
    #[instrument(skip(self, request), fields(request = %request.label()))]
    pub async fn send(&self, request: RequestDescriptor) -> Result<ApiResponse> {
        let token = self.store().access_token();
        let response = self.transport.send(&request, token.as_deref()).await?;

        if response.is_unauthorized() {
            debug!("Access token rejected");
            return self
                .coordinator
                .on_auth_failure(request, token.as_deref())
                .await;
        }

        Ok(response)
    }

    /// Like [`send`](Self::send), but non-success statuses become errors.
    pub async fn send_checked(&self, request: RequestDescriptor) -> Result<ApiResponse> {
        self.send(request).await?.error_for_status()
    }

    /// Send a request and decode its JSON body.
    pub async fn request_json<T: DeserializeOwned>(&self, request: RequestDescriptor) -> Result<T> {
        self.send_checked(request).await?.json()
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.request_json(RequestDescriptor::get(path)).await
    }

    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.request_json(RequestDescriptor::post(path).json(body)?)
            .await
    }

    pub async fn put_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.request_json(RequestDescriptor::put(path).json(body)?)
            .await
    }

    /// Send a DELETE, discarding any response body.
    pub async fn delete(&self, path: &str) -> Result<()> {
        self.send_checked(RequestDescriptor::delete(path)).await?;
        Ok(())
    }

    /// Exchange a username and password for a session.
    ///
    /// The login call never carries an access token and a 401 from it means
    /// bad credentials, so it bypasses the refresh path entirely.
    #[instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> Result<()> {
        let request = RequestDescriptor::post(LOGIN_PATH)
            .form([("username", username), ("password", password)]);

        let response = self.transport.send(&request, None).await?;
        if response.is_unauthorized() {
            return Err(Error::InvalidLogin);
        }

        let login: LoginResponse = response.error_for_status()?.json()?;
        self.coordinator
            .sign_in(CredentialPair::new(login.access_token, login.refresh_token));
        info!("Logged in");
        Ok(())
    }

    /// Install an externally obtained credential pair.
    pub fn sign_in(&self, pair: CredentialPair) {
        self.coordinator.sign_in(pair);
    }

    pub fn sign_out(&self) {
        self.coordinator.sign_out();
    }
}
