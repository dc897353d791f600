use tracing::instrument;

use crate::core::client::Client;
use crate::core::error::RefreshError;
use crate::token::store::{CredentialStore, TokenPair};

/// Exchanges refresh tokens for new pairs and installs them in the store.
#[derive(Clone, Debug)]
pub struct TokenRefresher<S> {
    client: Client,
    store: S,
}

impl<S: CredentialStore> TokenRefresher<S> {
    pub fn new(client: Client, store: S) -> Self {
        Self { client, store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Makes exactly one backend call. On success the returned pair has
    /// already replaced the store's pair; on failure the store is untouched.
    ///
    /// A pair that changed during the call (sign-out or a new sign-in) is
    /// never overwritten. The exchange then settles on the store's current
    /// pair, or on [`RefreshError::Abandoned`] when the store is empty.
    #[instrument(skip_all)]
    pub async fn exchange(&self, refresh_token: &str) -> Result<TokenPair, RefreshError> {
        let refreshed = self.client.refresh(refresh_token).await?;

        let pair = TokenPair::new(
            refreshed.access,
            refreshed
                .refresh
                .unwrap_or_else(|| refresh_token.to_string()),
        );

        if self.store.replace_if(refresh_token, pair.clone()) {
            tracing::debug!("Token pair renewed");
            return Ok(pair);
        }

        match self.store.read() {
            Some(current) if current.bearer().is_some() => {
                tracing::debug!("Session replaced during refresh, keeping current pair");
                Ok(current)
            }
            _ => {
                tracing::debug!("Session ended during refresh, discarding renewed pair");
                Err(RefreshError::Abandoned)
            }
        }
    }
}
