use reqwest::Method;
use tracing::instrument;

use crate::core::error::Error;
use crate::session::Session;
use crate::token::{CredentialStore, TokenPair};
use crate::types::User;
use crate::types::request::{LoginData, RegisterData};

impl Session {
    /// Signs in and stores the issued pair.
    #[instrument(skip_all)]
    pub async fn login(&self, username: &str, password: &str) -> Result<User, Error> {
        let login = self
            .client
            .login(&LoginData {
                username: username.to_string(),
                password: password.to_string(),
            })
            .await?;

        self.store().write(TokenPair::new(login.access, login.refresh));
        tracing::info!(user = login.user.username, "Signed in");

        Ok(login.user)
    }

    /// Creates an account. The store is left as it was.
    #[instrument(skip_all)]
    pub async fn register(&self, data: &RegisterData) -> Result<User, Error> {
        self.client.register(data).await
    }

    pub async fn register_and_login(&self, data: &RegisterData) -> Result<User, Error> {
        self.register(data).await?;
        self.login(&data.username, &data.password).await
    }

    pub fn logout(&self) {
        self.store().clear();
        tracing::info!("Signed out");
    }

    #[instrument(skip_all)]
    pub async fn current_user(&self) -> Result<User, Error> {
        let user = self
            .send(self.request(Method::GET, "auth/me"), "Unauthorized")
            .await?;

        Ok(serde_json::from_value(user)?)
    }
}
