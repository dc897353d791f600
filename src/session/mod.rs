//! User-agent side of a dashboard session.
//!
//! A [`Session`] owns the [`ClientStore`] holding the signed-in user's token
//! pair and sends every authenticated call through an [`AuthorizedClient`]
//! over that store, so concurrent calls share one refresh.

mod auth;
mod subscriptions;

use reqwest::{Method, RequestBuilder};
use serde_json::Value;

use crate::core::client::{self, Client};
use crate::core::config::ClientConfig;
use crate::core::error::{ConfigError, Error};
use crate::token::{AuthorizedClient, ClientStore, CredentialStore};

#[derive(Clone, Debug)]
pub struct Session {
    client: Client,
    authorized: AuthorizedClient<ClientStore>,
}

impl Session {
    pub fn new(client: Client, store: ClientStore) -> Self {
        let authorized = AuthorizedClient::new(client.clone(), store);
        Self { client, authorized }
    }

    /// Builds a session from configuration, resuming any pair persisted at
    /// the configured session path.
    pub fn open(config: &ClientConfig) -> Result<Self, ConfigError> {
        let client = Client::new(&config.api_base_url, config.request_timeout())?;

        let store = match config.session_path() {
            Some(path) => ClientStore::open(path),
            None => {
                tracing::warn!("No session path available, tokens will not be persisted");
                ClientStore::in_memory()
            }
        };

        Ok(Self::new(client, store))
    }

    pub fn store(&self) -> &ClientStore {
        self.authorized.store()
    }

    pub fn is_authenticated(&self) -> bool {
        self.store().read().is_some()
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.authorized.request(method, path)
    }

    /// Sends an authenticated call and reads its JSON body. A call that ends
    /// the session clears the store.
    async fn send(&self, request: RequestBuilder, fallback: &str) -> Result<Value, Error> {
        let response = match self.authorized.send(request.build()?).await {
            Ok(response) => response,
            Err(e) => {
                if e.is_terminal() {
                    tracing::info!("Session expired, signing out");
                    self.store().clear();
                }
                return Err(e);
            }
        };

        client::json_response(response, fallback).await
    }
}
