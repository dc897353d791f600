use std::time::Duration;

use reqwest::{Method, StatusCode};
use serde_json::json;
use subdash::token::{AuthorizedClient, ClientStore, CredentialStore, TokenPair};
use subdash::{Client, Error, RefreshError};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn authorized(server: &MockServer, store: &ClientStore) -> AuthorizedClient<ClientStore> {
    let client = Client::new(&server.uri(), Duration::from_secs(5)).unwrap();
    AuthorizedClient::new(client, store.clone())
}

async fn get(client: &AuthorizedClient<ClientStore>, path: &str) -> Result<reqwest::Response, Error> {
    client
        .send(client.request(Method::GET, path).build().unwrap())
        .await
}

#[tokio::test]
async fn rejected_request_is_replayed_with_renewed_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/auth/me"))
        .and(header("Authorization", "Bearer a1"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/auth/me"))
        .and(header("Authorization", "Bearer a2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": 1 })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/token/refresh"))
        .and(body_json(json!({ "refresh": "r1" })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "access": "a2", "refresh": "r2" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let store = ClientStore::in_memory();
    store.write(TokenPair::new("a1", "r1"));

    let response = get(&authorized(&server, &store), "auth/me").await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(store.read(), Some(TokenPair::new("a2", "r2")));
}

#[tokio::test]
async fn simultaneous_rejections_share_one_refresh() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(header("Authorization", "Bearer a1"))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(header("Authorization", "Bearer a2"))
        .respond_with(ResponseTemplate::new(200))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/token/refresh"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "access": "a2", "refresh": "r2" }))
                .set_delay(Duration::from_millis(100)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let store = ClientStore::in_memory();
    store.write(TokenPair::new("a1", "r1"));
    let client = authorized(&server, &store);

    let (first, second) = tokio::join!(get(&client, "auth/me"), get(&client, "subscriptions/"));

    assert_eq!(first.unwrap().status(), StatusCode::OK);
    assert_eq!(second.unwrap().status(), StatusCode::OK);
    assert!(!client.coordinator().is_refreshing());
}

#[tokio::test]
async fn failed_refresh_keeps_stale_pair_and_allows_retry() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/auth/me"))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/token/refresh"))
        .and(body_json(json!({ "refresh": "r1" })))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&server)
        .await;

    let store = ClientStore::in_memory();
    store.write(TokenPair::new("a1", "r1"));
    let client = authorized(&server, &store);

    for _ in 0..2 {
        let err = get(&client, "auth/me").await.unwrap_err();

        assert!(matches!(
            err,
            Error::Unauthenticated(RefreshError::Rejected(StatusCode::UNAUTHORIZED))
        ));
        assert_eq!(store.read(), Some(TokenPair::new("a1", "r1")));
    }
}

#[test]
fn clearing_an_empty_store_is_harmless() {
    let dir = tempfile::tempdir().unwrap();
    let store = ClientStore::open(dir.path().join("session.json"));

    store.clear();
    store.clear();

    assert_eq!(store.read(), None);
    assert_eq!(ClientStore::open(dir.path().join("session.json")).read(), None);
}

async fn mount_rejection_then_slow_refresh(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/auth/me"))
        .and(header("Authorization", "Bearer a1"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/token/refresh"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "access": "a2", "refresh": "r2" }))
                .set_delay(Duration::from_millis(200)),
        )
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn sign_out_during_refresh_stays_signed_out() {
    let server = MockServer::start().await;
    mount_rejection_then_slow_refresh(&server).await;

    let store = ClientStore::in_memory();
    store.write(TokenPair::new("a1", "r1"));
    let client = authorized(&server, &store);

    let request = tokio::spawn({
        let client = client.clone();
        async move { get(&client, "auth/me").await }
    });
    tokio::time::sleep(Duration::from_millis(80)).await;
    store.clear();

    let err = request.await.unwrap().unwrap_err();

    assert!(matches!(err, Error::Unauthenticated(RefreshError::Abandoned)));
    assert_eq!(store.read(), None);
    assert!(!client.coordinator().is_refreshing());
}

#[tokio::test]
async fn sign_in_during_refresh_is_not_overwritten() {
    let server = MockServer::start().await;
    mount_rejection_then_slow_refresh(&server).await;
    Mock::given(method("GET"))
        .and(path("/auth/me"))
        .and(header("Authorization", "Bearer bob-access"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let store = ClientStore::in_memory();
    store.write(TokenPair::new("a1", "r1"));
    let client = authorized(&server, &store);

    let request = tokio::spawn({
        let client = client.clone();
        async move { get(&client, "auth/me").await }
    });
    tokio::time::sleep(Duration::from_millis(80)).await;
    store.write(TokenPair::new("bob-access", "bob-refresh"));

    let response = request.await.unwrap().unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(store.read(), Some(TokenPair::new("bob-access", "bob-refresh")));
}
