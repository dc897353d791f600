use std::fmt;

use serde::{Deserialize, Serialize};

/// Access and refresh token issued together by the backend.
///
/// Both values are opaque. An empty access token marks one that has lapsed
/// while its refresh token is still held.
#[derive(Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TokenPair {
    #[serde(rename = "accessToken")]
    pub access_token: String,
    #[serde(rename = "refreshToken")]
    pub refresh_token: String,
}

impl TokenPair {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
        }
    }

    /// The access token to present as a bearer credential, if any.
    pub fn bearer(&self) -> Option<&str> {
        (!self.access_token.is_empty()).then_some(self.access_token.as_str())
    }
}

impl fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenPair")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .finish()
    }
}

/// Holder of the current [`TokenPair`] for one scope.
///
/// Writes replace the whole pair; a reader never sees one token from an old
/// pair next to one from a new pair. None of the operations fail: absence is
/// reported as `None` and `clear` on an empty store does nothing.
pub trait CredentialStore: Clone + Send + Sync + 'static {
    fn read(&self) -> Option<TokenPair>;

    fn write(&self, pair: TokenPair);

    fn clear(&self);

    /// Installs `pair` only while the store still holds `expected_refresh`,
    /// checked and written under one lock. Returns whether it was installed.
    fn replace_if(&self, expected_refresh: &str, pair: TokenPair) -> bool;
}

/// Whether `current` still carries the refresh token an exchange started
/// from.
pub(crate) fn holds_refresh(current: Option<&TokenPair>, expected_refresh: &str) -> bool {
    current.is_some_and(|pair| pair.refresh_token == expected_refresh)
}
