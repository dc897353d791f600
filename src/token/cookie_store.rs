use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::{Arc, Mutex, PoisonError};

use axum::extract::FromRequestParts;
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderValue};
use axum::response::{IntoResponseParts, ResponseParts};

use crate::core::state::AppState;
use crate::token::store::{CredentialStore, TokenPair, holds_refresh};
use crate::utils::encode::{decode_cookie_value, encode_cookie_value};

pub const ACCESS_COOKIE: &str = "accessToken";
pub const REFRESH_COOKIE: &str = "refreshToken";

const ACCESS_MAX_AGE: u64 = 60 * 60;
const REFRESH_MAX_AGE: u64 = 60 * 60 * 24 * 30;

#[derive(Debug)]
enum Change {
    Write(TokenPair),
    Clear,
}

#[derive(Debug)]
struct Jar {
    pair: Option<TokenPair>,
    change: Option<Change>,
}

/// Token storage scoped to one inbound request.
///
/// Starts from the request's `Cookie` header. Writes and clears are visible
/// to later reads within the same request and are sent back to the browser
/// as `Set-Cookie` headers when the store is part of the response.
#[derive(Clone, Debug)]
pub struct CookieStore {
    secure: bool,
    jar: Arc<Mutex<Jar>>,
}

impl CookieStore {
    pub fn from_headers(headers: &HeaderMap, secure: bool) -> Self {
        let mut cookies = request_cookies(headers);

        let pair = match (cookies.remove(ACCESS_COOKIE), cookies.remove(REFRESH_COOKIE)) {
            (access, Some(refresh)) if !refresh.is_empty() => {
                Some(TokenPair::new(access.unwrap_or_default(), refresh))
            }
            _ => None,
        };

        Self {
            secure,
            jar: Arc::new(Mutex::new(Jar { pair, change: None })),
        }
    }

    fn jar(&self) -> std::sync::MutexGuard<'_, Jar> {
        self.jar.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// `Set-Cookie` values describing what changed during the request.
    pub fn set_cookies(&self) -> Vec<String> {
        match &self.jar().change {
            None => Vec::new(),
            Some(Change::Write(pair)) => vec![
                self.cookie(ACCESS_COOKIE, &pair.access_token, ACCESS_MAX_AGE),
                self.cookie(REFRESH_COOKIE, &pair.refresh_token, REFRESH_MAX_AGE),
            ],
            Some(Change::Clear) => vec![
                self.cookie(ACCESS_COOKIE, "", 0),
                self.cookie(REFRESH_COOKIE, "", 0),
            ],
        }
    }

    fn cookie(&self, name: &str, value: &str, max_age: u64) -> String {
        let mut cookie = format!(
            "{}={}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax",
            name,
            encode_cookie_value(value),
            max_age
        );

        if self.secure {
            cookie.push_str("; Secure");
        }

        cookie
    }
}

impl CredentialStore for CookieStore {
    fn read(&self) -> Option<TokenPair> {
        self.jar().pair.clone()
    }

    fn write(&self, pair: TokenPair) {
        let mut jar = self.jar();
        jar.pair = Some(pair.clone());
        jar.change = Some(Change::Write(pair));
    }

    fn clear(&self) {
        let mut jar = self.jar();
        jar.pair = None;
        jar.change = Some(Change::Clear);
    }

    fn replace_if(&self, expected_refresh: &str, pair: TokenPair) -> bool {
        let mut jar = self.jar();
        if !holds_refresh(jar.pair.as_ref(), expected_refresh) {
            return false;
        }

        jar.pair = Some(pair.clone());
        jar.change = Some(Change::Write(pair));
        true
    }
}

impl FromRequestParts<AppState> for CookieStore {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        Ok(Self::from_headers(&parts.headers, state.production))
    }
}

impl IntoResponseParts for CookieStore {
    type Error = Infallible;

    fn into_response_parts(self, mut res: ResponseParts) -> Result<ResponseParts, Self::Error> {
        for cookie in self.set_cookies() {
            match HeaderValue::from_str(&cookie) {
                Ok(value) => {
                    res.headers_mut().append(SET_COOKIE, value);
                }
                Err(e) => tracing::error!("Error building session cookie, {:?}", e),
            }
        }

        Ok(res)
    }
}

/// Name/value pairs from every `Cookie` header. The first occurrence of a
/// name wins.
pub(crate) fn request_cookies(headers: &HeaderMap) -> HashMap<String, String> {
    let mut cookies = HashMap::new();

    for header in headers.get_all(COOKIE) {
        let Ok(header) = header.to_str() else {
            continue;
        };

        for (name, value) in header.split(';').filter_map(|pair| pair.split_once('=')) {
            cookies
                .entry(name.trim().to_string())
                .or_insert_with(|| decode_cookie_value(value.trim()));
        }
    }

    cookies
}
