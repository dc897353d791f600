use reqwest::Method;
use serde_json::Value;
use tracing::instrument;

use crate::core::error::Error;
use crate::session::Session;
use crate::types::request::{SubscriptionFilter, subscription_path};

impl Session {
    #[instrument(skip_all)]
    pub async fn subscriptions(&self, filter: &SubscriptionFilter) -> Result<Value, Error> {
        let path = format!("subscriptions/?{}", filter.to_query()?);

        self.send(self.request(Method::GET, &path), "Failed to fetch subscriptions")
            .await
    }

    #[instrument(skip(self))]
    pub async fn subscription(&self, id: &str) -> Result<Value, Error> {
        let path = subscription_path(id)?;

        self.send(self.request(Method::GET, &path), "Failed to fetch subscription")
            .await
    }

    #[instrument(skip_all)]
    pub async fn create_subscription(&self, subscription: &Value) -> Result<Value, Error> {
        self.send(
            self.request(Method::POST, "subscriptions/").json(subscription),
            "Failed to create subscription",
        )
        .await
    }

    #[instrument(skip(self, changes))]
    pub async fn update_subscription(&self, id: &str, changes: &Value) -> Result<Value, Error> {
        let path = subscription_path(id)?;

        self.send(
            self.request(Method::PATCH, &path).json(changes),
            "Failed to update subscription",
        )
        .await
    }

    #[instrument(skip(self))]
    pub async fn delete_subscription(&self, id: &str) -> Result<(), Error> {
        let path = subscription_path(id)?;

        self.send(self.request(Method::DELETE, &path), "Failed to delete subscription")
            .await?;

        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn price_histories(&self, id: &str) -> Result<Value, Error> {
        let path = format!("{}price_histories/", subscription_path(id)?);

        self.send(self.request(Method::GET, &path), "Failed to fetch price histories")
            .await
    }
}
