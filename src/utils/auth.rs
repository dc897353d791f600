use axum::extract::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};

use crate::token::cookie_store::{ACCESS_COOKIE, REFRESH_COOKIE, request_cookies};

/// Sends signed-out visitors of the dashboard to the login page, and
/// signed-in visitors of the login page to the dashboard.
pub(crate) async fn guard(request: Request, next: Next) -> Response {
    let cookies = request_cookies(request.headers());
    let holds = |name: &str| cookies.get(name).is_some_and(|value| !value.is_empty());

    let (access, refresh) = (holds(ACCESS_COOKIE), holds(REFRESH_COOKIE));
    let path = request.uri().path();

    if path.starts_with("/dashboard") && !access && !refresh {
        tracing::debug!(path, "No session, redirecting to login");
        return Redirect::temporary("/login").into_response();
    }

    if path.starts_with("/login") && access && refresh {
        tracing::debug!(path, "Session present, redirecting to dashboard");
        return Redirect::temporary("/dashboard").into_response();
    }

    next.run(request).await
}
