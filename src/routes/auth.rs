use axum::Json;
use axum::extract::State;
use reqwest::Method;
use serde_json::{Value, json};

use crate::core::error::Error;
use crate::core::state::AppState;
use crate::routes::settle;
use crate::token::{CookieStore, CredentialStore, TokenPair};
use crate::types::request::{LoginData, RegisterData};

pub(crate) async fn login(
    State(state): State<AppState>,
    cookies: CookieStore,
    Json(data): Json<LoginData>,
) -> (CookieStore, Result<Json<Value>, Error>) {
    let result = match state.client.login(&data).await {
        Ok(login) => {
            cookies.write(TokenPair::new(login.access, login.refresh));
            Ok(Json(json!({ "user": login.user })))
        }
        Err(e) => Err(e),
    };

    (cookies, result)
}

pub(crate) async fn register(
    State(state): State<AppState>,
    Json(data): Json<RegisterData>,
) -> Result<Json<Value>, Error> {
    let user = state.client.register(&data).await?;

    Ok(Json(json!({ "user": user })))
}

pub(crate) async fn logout(cookies: CookieStore) -> (CookieStore, Json<Value>) {
    cookies.clear();

    (cookies, Json(json!({ "message": "Logged out" })))
}

pub(crate) async fn me(
    State(state): State<AppState>,
    cookies: CookieStore,
) -> (CookieStore, Result<Json<Value>, Error>) {
    let result = current_user(&state, &cookies).await;

    let result = settle(&cookies, result);
    (cookies, result)
}

async fn current_user(state: &AppState, cookies: &CookieStore) -> Result<Json<Value>, Error> {
    if cookies.read().is_none() {
        return Err(Error::NoCredentials);
    }

    let authorized = state.authorized(cookies.clone());
    let response = authorized
        .send(authorized.request(Method::GET, "auth/me").build()?)
        .await?;

    if !response.status().is_success() {
        return Err(Error::Unauthorized);
    }

    let user = response.json::<Value>().await?;

    Ok(Json(json!({ "user": user })))
}

pub(crate) async fn refresh(
    State(state): State<AppState>,
    cookies: CookieStore,
) -> (CookieStore, Result<Json<Value>, Error>) {
    let result = state
        .authorized(cookies.clone())
        .coordinator()
        .refresh()
        .await
        .map(|_| Json(json!({ "success": true })))
        .map_err(Error::RefreshFailed);

    let result = settle(&cookies, result);
    (cookies, result)
}
