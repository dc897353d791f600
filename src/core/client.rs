use std::time::Duration;

use reqwest::{Method, RequestBuilder, StatusCode};
use serde_json::Value;
use tracing::instrument;

use crate::core::error::{ConfigError, Error, RefreshError};
use crate::types::request::{LoginData, RefreshRequest, RegisterData};
use crate::types::response;
use crate::types::User;

/// Binding to the subscription backend.
///
/// Cheap to clone; clones share one connection pool.
#[derive(Clone, Debug)]
pub struct Client {
    client: reqwest::Client,
    base_url: String,
}

impl Client {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ConfigError> {
        reqwest::Url::parse(base_url)
            .map_err(|e| ConfigError::InvalidBaseUrl(format!("{base_url}: {e}")))?;

        let client = reqwest::ClientBuilder::new().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client.request(method, self.url(path))
    }

    pub(crate) async fn execute(&self, request: reqwest::Request) -> Result<reqwest::Response, Error> {
        Ok(self.client.execute(request).await?)
    }

    #[instrument(skip_all)]
    pub(crate) async fn login(&self, data: &LoginData) -> Result<response::Login, Error> {
        let resp = self.request(Method::POST, "auth/login").json(data).send().await?;

        match resp.status() {
            StatusCode::UNAUTHORIZED => Err(Error::InvalidCredentials(detail(resp).await)),
            StatusCode::BAD_REQUEST => Err(Error::Validation(body(resp).await)),
            status if !status.is_success() => Err(Error::Backend {
                status,
                detail: detail(resp).await,
            }),
            _ => Ok(resp.json().await?),
        }
    }

    #[instrument(skip_all)]
    pub(crate) async fn register(&self, data: &RegisterData) -> Result<User, Error> {
        let resp = self
            .request(Method::POST, "auth/register")
            .json(data)
            .send()
            .await?;

        match resp.status() {
            StatusCode::UNAUTHORIZED => Err(Error::InvalidCredentials(detail(resp).await)),
            StatusCode::BAD_REQUEST => Err(Error::Validation(body(resp).await)),
            status if !status.is_success() => Err(Error::Backend {
                status,
                detail: detail(resp).await,
            }),
            _ => Ok(resp.json().await?),
        }
    }

    /// One network call exchanging `refresh_token`, no retry.
    #[instrument(skip_all)]
    pub(crate) async fn refresh(&self, refresh_token: &str) -> Result<response::Refresh, RefreshError> {
        let resp = self
            .request(Method::POST, "auth/token/refresh")
            .json(&RefreshRequest {
                refresh: refresh_token,
            })
            .send()
            .await
            .map_err(|e| RefreshError::Transport(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(RefreshError::Rejected(resp.status()));
        }

        resp.json::<response::Refresh>()
            .await
            .map_err(|e| RefreshError::Malformed(e.to_string()))
    }
}

/// Reads a response body as JSON, falling back to `null`.
pub(crate) async fn body(resp: reqwest::Response) -> Value {
    resp.json::<Value>().await.unwrap_or(Value::Null)
}

/// Picks the `detail` field the backend uses for error messages, or the
/// whole body when there is none.
pub(crate) async fn detail(resp: reqwest::Response) -> Value {
    match body(resp).await {
        Value::Object(mut map) if map.contains_key("detail") => {
            map.remove("detail").unwrap_or(Value::Null)
        }
        other => other,
    }
}

/// Reads a forwarded backend response. Non-2xx statuses become
/// [`Error::Backend`] carrying the backend's detail, or `fallback` when the
/// body has none.
pub(crate) async fn json_response(resp: reqwest::Response, fallback: &str) -> Result<Value, Error> {
    let status = resp.status();

    if status.is_success() {
        return Ok(body(resp).await);
    }

    let detail = match detail(resp).await {
        Value::Null => Value::String(fallback.to_string()),
        detail => detail,
    };

    Err(Error::Backend { status, detail })
}
