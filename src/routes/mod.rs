pub(crate) mod auth;
pub(crate) mod router;
pub(crate) mod subscriptions;

use crate::core::error::Error;
use crate::token::{CookieStore, CredentialStore};

/// Signs the browser out when `result` ends its session.
pub(crate) fn settle<T>(cookies: &CookieStore, result: Result<T, Error>) -> Result<T, Error> {
    if let Err(e) = &result {
        if e.is_terminal() {
            cookies.clear();
        }
    }

    result
}
