pub mod core;
pub(crate) mod routes;
pub mod session;
pub mod token;
pub mod types;
pub(crate) mod utils;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

pub use crate::core::client::Client;
pub use crate::core::config::ClientConfig;
pub use crate::core::error::{ConfigError, Error, RefreshError};
pub use crate::session::Session;

use crate::core::{config::Args, state::AppState};

pub async fn run() -> Result<(), ConfigError> {
    let args = Args::load()?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_new(&args.log_level).unwrap_or_default())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let state = AppState::new(&args)?;

    let app = routes::router::routes(state, args.rate_limit);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", args.port))
        .await
        .map_err(ConfigError::IO)?;

    tracing::info!("listening on port {}", args.port);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(ConfigError::IO)?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Error listening for shutdown signal, {:?}", e);
    }

    tracing::info!("Shutting down");
}
