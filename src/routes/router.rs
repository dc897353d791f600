use std::time::Duration;

use axum::error_handling::HandleErrorLayer;
use axum::{
    Router,
    extract::{MatchedPath, Request},
    middleware,
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::info_span;

use crate::core::error;
use crate::core::state::AppState;
use crate::routes::{auth, subscriptions};
use crate::utils;

pub(crate) fn routes(state: AppState, rate_limit: u64) -> Router {
    // /api/auth/...
    let auth_router = Router::new()
        .route("/login", post(auth::login))
        .route("/register", post(auth::register))
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me))
        .route("/token/refresh", post(auth::refresh));

    Router::new()
        .nest("/api/auth", auth_router)
        .route(
            "/api/subscriptions",
            get(subscriptions::list)
                .post(subscriptions::create)
                .patch(subscriptions::update)
                .delete(subscriptions::delete),
        )
        .with_state(state)
        .layer(middleware::from_fn(utils::auth::guard))
        .layer(
            ServiceBuilder::new()
                .layer(
                    TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
                        let matched_path = request
                            .extensions()
                            .get::<MatchedPath>()
                            .map(MatchedPath::as_str);

                        info_span!(
                            "request",
                            method = ?request.method(),
                            matched_path,
                        )
                    }),
                )
                .layer(HandleErrorLayer::new(error::handle_middleware_errors))
                .buffer(128)
                .rate_limit(rate_limit, Duration::from_secs(1)),
        )
}
