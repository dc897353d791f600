use axum::Json;
use axum::extract::{Query, State};
use reqwest::{Method, RequestBuilder};
use serde_json::{Value, json};

use crate::core::client;
use crate::core::error::Error;
use crate::core::state::AppState;
use crate::routes::settle;
use crate::token::CookieStore;
use crate::types::request::{IdQuery, SubscriptionFilter, subscription_path};

async fn forward(
    state: &AppState,
    cookies: &CookieStore,
    request: RequestBuilder,
    fallback: &str,
) -> Result<Value, Error> {
    let response = state
        .authorized(cookies.clone())
        .send(request.build()?)
        .await;

    client::json_response(settle(cookies, response)?, fallback).await
}

pub(crate) async fn list(
    State(state): State<AppState>,
    cookies: CookieStore,
    Query(filter): Query<SubscriptionFilter>,
) -> (CookieStore, Result<Json<Value>, Error>) {
    let result = fetch_page(&state, &cookies, &filter).await.map(Json);

    (cookies, result)
}

async fn fetch_page(
    state: &AppState,
    cookies: &CookieStore,
    filter: &SubscriptionFilter,
) -> Result<Value, Error> {
    let path = format!("subscriptions/?{}", filter.to_query()?);
    let request = state.client.request(Method::GET, &path);

    forward(state, cookies, request, "Failed to fetch subscriptions").await
}

pub(crate) async fn create(
    State(state): State<AppState>,
    cookies: CookieStore,
    Json(subscription): Json<Value>,
) -> (CookieStore, Result<Json<Value>, Error>) {
    let request = state
        .client
        .request(Method::POST, "subscriptions/")
        .json(&subscription);

    let result = forward(&state, &cookies, request, "Failed to create subscription")
        .await
        .map(Json);

    (cookies, result)
}

pub(crate) async fn update(
    State(state): State<AppState>,
    cookies: CookieStore,
    Query(query): Query<IdQuery>,
    Json(changes): Json<Value>,
) -> (CookieStore, Result<Json<Value>, Error>) {
    let result = match query.require().and_then(|id| subscription_path(&id)) {
        Ok(path) => {
            let request = state.client.request(Method::PATCH, &path).json(&changes);

            forward(&state, &cookies, request, "Failed to update subscription")
                .await
                .map(Json)
        }
        Err(e) => Err(e),
    };

    (cookies, result)
}

pub(crate) async fn delete(
    State(state): State<AppState>,
    cookies: CookieStore,
    Query(query): Query<IdQuery>,
) -> (CookieStore, Result<Json<Value>, Error>) {
    let result = match query.require().and_then(|id| subscription_path(&id)) {
        Ok(path) => {
            let request = state.client.request(Method::DELETE, &path);

            forward(&state, &cookies, request, "Failed to delete subscription")
                .await
                .map(|_| Json(json!({ "success": true })))
        }
        Err(e) => Err(e),
    };

    (cookies, result)
}
