use reqwest::header::{AUTHORIZATION, HeaderValue};
use reqwest::{Method, RequestBuilder, StatusCode};
use tracing::instrument;

use crate::core::client::Client;
use crate::core::error::Error;
use crate::token::coordinator::RefreshCoordinator;
use crate::token::refresh::TokenRefresher;
use crate::token::store::CredentialStore;

/// Sends backend requests with the scope's access token, renewing it once
/// when the backend answers 401.
///
/// The replayed request is returned whatever its status; there is no
/// second refresh. Requests with side effects may therefore reach the
/// backend twice.
#[derive(Clone, Debug)]
pub struct AuthorizedClient<S> {
    client: Client,
    coordinator: RefreshCoordinator<S>,
}

impl<S: CredentialStore> AuthorizedClient<S> {
    /// Composes a client with a fresh coordinator over `store`.
    pub fn new(client: Client, store: S) -> Self {
        let coordinator = RefreshCoordinator::new(TokenRefresher::new(client.clone(), store));
        Self::with_coordinator(client, coordinator)
    }

    /// Shares an existing coordinator, and with it the coordinator's scope.
    pub fn with_coordinator(client: Client, coordinator: RefreshCoordinator<S>) -> Self {
        Self {
            client,
            coordinator,
        }
    }

    pub fn store(&self) -> &S {
        self.coordinator.store()
    }

    pub fn coordinator(&self) -> &RefreshCoordinator<S> {
        &self.coordinator
    }

    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client.request(method, path)
    }

    #[instrument(skip_all, fields(method = %request.method(), path = request.url().path()))]
    pub async fn send(&self, request: reqwest::Request) -> Result<reqwest::Response, Error> {
        let replay = request.try_clone().ok_or(Error::UnreplayableRequest)?;

        let token = self.store().read().and_then(|pair| pair.bearer().map(str::to_string));
        let response = self.execute(request, token.as_deref()).await?;

        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        tracing::debug!("Access token rejected");

        let renewed = self
            .coordinator
            .refresh_rejected(token.as_deref())
            .await
            .map_err(Error::Unauthenticated)?;

        self.execute(replay, Some(&renewed)).await
    }

    async fn execute(
        &self,
        mut request: reqwest::Request,
        token: Option<&str>,
    ) -> Result<reqwest::Response, Error> {
        let headers = request.headers_mut();
        headers.remove(AUTHORIZATION);

        if let Some(token) = token {
            let mut value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|e| {
                tracing::warn!("Access token is not a valid header value, {:?}", e);
                Error::MalformedToken
            })?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        self.client.execute(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::RefreshError;
    use crate::token::{ClientStore, TokenPair};
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{header, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn authorized(server: &MockServer, store: ClientStore) -> AuthorizedClient<ClientStore> {
        let client = Client::new(&server.uri(), Duration::from_secs(5)).unwrap();
        AuthorizedClient::new(client, store)
    }

    fn signed_in(access: &str, refresh: &str) -> ClientStore {
        let store = ClientStore::in_memory();
        store.write(TokenPair::new(access, refresh));
        store
    }

    #[tokio::test]
    async fn attaches_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/auth/me"))
            .and(header("Authorization", "Bearer a1"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = authorized(&server, signed_in("a1", "r1"));
        let request = client.request(Method::GET, "auth/me").build().unwrap();

        assert_eq!(client.send(request).await.unwrap().status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn renews_and_replays_once() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/subscriptions/"))
            .and(header("Authorization", "Bearer a1"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/subscriptions/"))
            .and(header("Authorization", "Bearer a2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "results": [] })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/auth/token/refresh"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "access": "a2", "refresh": "r2" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let store = signed_in("a1", "r1");
        let client = authorized(&server, store.clone());
        let request = client.request(Method::GET, "subscriptions/").build().unwrap();

        let response = client.send(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(store.read(), Some(TokenPair::new("a2", "r2")));
    }

    #[tokio::test]
    async fn replay_response_is_returned_as_is() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/auth/me"))
            .respond_with(ResponseTemplate::new(401))
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/auth/token/refresh"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "access": "a2" })))
            .expect(1)
            .mount(&server)
            .await;

        let client = authorized(&server, signed_in("a1", "r1"));
        let request = client.request(Method::GET, "auth/me").build().unwrap();

        let response = client.send(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn refresh_failure_is_unauthenticated() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/subscriptions/4/"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/auth/token/refresh"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;

        let store = signed_in("a1", "r1");
        let client = authorized(&server, store.clone());
        let request = client.request(Method::DELETE, "subscriptions/4/").build().unwrap();

        let err = client.send(request).await.unwrap_err();

        assert!(matches!(
            err,
            Error::Unauthenticated(RefreshError::Rejected(StatusCode::UNAUTHORIZED))
        ));
        assert_eq!(store.read(), Some(TokenPair::new("a1", "r1")));
    }

    #[tokio::test]
    async fn lapsed_access_token_sends_no_header() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/auth/me"))
            .and(header_exists("Authorization"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/auth/me"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/auth/token/refresh"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "access": "a2" })))
            .expect(1)
            .mount(&server)
            .await;

        let store = signed_in("", "r1");
        let client = authorized(&server, store.clone());
        let request = client.request(Method::GET, "auth/me").build().unwrap();

        assert_eq!(client.send(request).await.unwrap().status(), StatusCode::OK);
        assert_eq!(store.read(), Some(TokenPair::new("a2", "r1")));
    }

    #[tokio::test]
    async fn other_failures_are_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/subscriptions/"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/auth/token/refresh"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = authorized(&server, signed_in("a1", "r1"));
        let request = client.request(Method::GET, "subscriptions/").build().unwrap();

        let response = client.send(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn malformed_token_fails_without_sending() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/auth/token/refresh"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = authorized(&server, signed_in("a1\nInjected: x", "r1"));
        let request = client.request(Method::GET, "auth/me").build().unwrap();

        assert!(matches!(client.send(request).await, Err(Error::MalformedToken)));
    }
}
