//! Wiring of the request client, typed API and polling scheduler.

use std::sync::Arc;

use tokio::sync::broadcast;

use crate::api::ConsoleApi;
use crate::client::RequestClient;
use crate::config::ConsoleConfig;
use crate::credentials::{CredentialPair, SessionEvent};
use crate::error::Result;
use crate::polling::{EntityStateStore, PollingScheduler};

/// One operator session against a console API.
pub struct Console {
    api: ConsoleApi,
    scheduler: PollingScheduler,
}

impl Console {
    pub fn new(config: &ConsoleConfig) -> Result<Self> {
        let client = RequestClient::from_config(config)?;
        Ok(Self::with_client(client, config))
    }

    /// Build around an existing client.
    pub fn with_client(client: RequestClient, config: &ConsoleConfig) -> Self {
        let api = ConsoleApi::new(client);
        let scheduler = PollingScheduler::new(
            Arc::new(api.clone()),
            Arc::new(EntityStateStore::new()),
            config.polling_policy(),
        );
        Self { api, scheduler }
    }

    pub fn api(&self) -> &ConsoleApi {
        &self.api
    }

    pub fn client(&self) -> &RequestClient {
        self.api.client()
    }

    pub fn scheduler(&self) -> &PollingScheduler {
        &self.scheduler
    }

    pub fn entities(&self) -> &Arc<EntityStateStore> {
        self.scheduler.store()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.client().coordinator().subscribe()
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<()> {
        self.client().login(username, password).await
    }

    pub fn sign_in(&self, pair: CredentialPair) {
        self.client().sign_in(pair);
    }

    /// Sign out and stop every poll; nothing can succeed without a session.
    pub fn sign_out(&self) {
        self.scheduler.stop_all();
        self.client().sign_out();
    }
}
