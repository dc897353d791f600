use axum::BoxError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::{Value, json};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("IO error: {0}")]
    IO(#[from] std::io::Error),
    #[error("Reqwest error: {0}")]
    HTTPClient(#[from] reqwest::Error),
    #[error("Invalid API base URL: {0}")]
    InvalidBaseUrl(String),
}

/// Why a token exchange did not produce a new pair.
///
/// Cloned to every caller waiting on the same refresh.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RefreshError {
    #[error("No refresh token available")]
    MissingToken,
    #[error("Refresh token rejected with status {0}")]
    Rejected(StatusCode),
    #[error("Refresh request failed: {0}")]
    Transport(String),
    #[error("Malformed refresh response: {0}")]
    Malformed(String),
    #[error("Refresh abandoned before completion")]
    Abandoned,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
    #[error("Token refresh failed: {0}")]
    RefreshFailed(#[from] RefreshError),
    #[error("Unauthenticated: {0}")]
    Unauthenticated(RefreshError),
    #[error("Not authenticated")]
    NoCredentials,
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(Value),
    #[error("Validation failed: {0}")]
    Validation(Value),
    #[error("Backend returned {status}: {detail}")]
    Backend { status: StatusCode, detail: Value },
    #[error("Request body cannot be replayed")]
    UnreplayableRequest,
    #[error("Subscription ID required")]
    MissingId,
    #[error("Invalid subscription ID: {0}")]
    InvalidId(String),
    #[error("Stored access token is not a valid header value")]
    MalformedToken,
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("URL encoding error: {0}")]
    URLEncode(#[from] serde_urlencoded::ser::Error),
}

impl Error {
    /// True when the session can no longer be used and must be discarded.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Error::Unauthenticated(_) | Error::RefreshFailed(_) | Error::MalformedToken
        )
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match &self {
            Error::Backend { status, .. } if status.is_client_error() => {
                tracing::debug!("{:?}", self)
            }
            Error::InvalidCredentials(_)
            | Error::Validation(_)
            | Error::NoCredentials
            | Error::MissingId
            | Error::InvalidId(_) => {
                tracing::debug!("{:?}", self)
            }
            Error::Unauthenticated(_)
            | Error::RefreshFailed(_)
            | Error::Unauthorized
            | Error::MalformedToken => {
                tracing::warn!("{}", self)
            }
            _ => tracing::error!("{:?}", self),
        }

        let (status, message) = match self {
            Error::RequestFailed(_) => (StatusCode::INTERNAL_SERVER_ERROR, json!("Request failed")),
            Error::RefreshFailed(_) => (StatusCode::UNAUTHORIZED, json!("Token refresh failed")),
            Error::Unauthenticated(_) => (StatusCode::UNAUTHORIZED, json!("Unable to refresh token")),
            Error::NoCredentials => (StatusCode::UNAUTHORIZED, json!("Not authenticated")),
            Error::Unauthorized => (StatusCode::UNAUTHORIZED, json!("Unauthorized")),
            Error::InvalidCredentials(detail) => (StatusCode::UNAUTHORIZED, detail),
            Error::Validation(body) => (StatusCode::BAD_REQUEST, body),
            Error::Backend { status, detail } => (status, detail),
            Error::UnreplayableRequest => {
                (StatusCode::INTERNAL_SERVER_ERROR, json!("Request cannot be replayed"))
            }
            Error::MissingId => (StatusCode::BAD_REQUEST, json!("Subscription ID required")),
            Error::InvalidId(_) => (StatusCode::BAD_REQUEST, json!("Invalid subscription ID")),
            Error::MalformedToken => (StatusCode::UNAUTHORIZED, json!("Invalid access token")),
            Error::Serialize(_) => (StatusCode::INTERNAL_SERVER_ERROR, json!("Serialization error")),
            Error::URLEncode(_) => (StatusCode::INTERNAL_SERVER_ERROR, json!("URL encoding error")),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

pub(crate) async fn handle_middleware_errors(err: BoxError) -> (StatusCode, &'static str) {
    tracing::error!("Unhandled error: {:?}", err);
    (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
}
