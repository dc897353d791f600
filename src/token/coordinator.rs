use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::oneshot;
use tracing::instrument;

use crate::core::error::RefreshError;
use crate::token::refresh::TokenRefresher;
use crate::token::store::CredentialStore;

type Outcome = Result<String, RefreshError>;

/// The refresh in flight and the callers waiting on it, in arrival order.
#[derive(Debug)]
struct PendingRefresh {
    waiters: Vec<oneshot::Sender<Outcome>>,
}

enum Trigger<'a> {
    Explicit,
    Rejected(Option<&'a str>),
}

/// Collapses concurrent refresh requests within one credential scope into a
/// single [`TokenRefresher::exchange`].
///
/// The first caller starts the exchange on a spawned task; callers arriving
/// while it runs queue behind it. When the exchange settles every queued
/// caller receives the same outcome and the coordinator is idle again, so a
/// failed refresh never blocks a later attempt. Dropping a waiting caller
/// does not cancel the exchange.
#[derive(Clone, Debug)]
pub struct RefreshCoordinator<S> {
    refresher: TokenRefresher<S>,
    pending: Arc<Mutex<Option<PendingRefresh>>>,
}

impl<S: CredentialStore> RefreshCoordinator<S> {
    pub fn new(refresher: TokenRefresher<S>) -> Self {
        Self {
            refresher,
            pending: Arc::new(Mutex::new(None)),
        }
    }

    pub fn store(&self) -> &S {
        self.refresher.store()
    }

    pub fn is_refreshing(&self) -> bool {
        self.lock().is_some()
    }

    /// Renews the access token, joining the refresh already in flight if
    /// there is one.
    #[instrument(skip_all)]
    pub async fn refresh(&self) -> Result<String, RefreshError> {
        self.join(Trigger::Explicit).await
    }

    /// Renews after the backend rejected `rejected`. When no refresh is in
    /// flight and the store already holds a different access token, that
    /// token is returned without another exchange.
    #[instrument(skip_all)]
    pub async fn refresh_rejected(&self, rejected: Option<&str>) -> Result<String, RefreshError> {
        self.join(Trigger::Rejected(rejected)).await
    }

    fn lock(&self) -> MutexGuard<'_, Option<PendingRefresh>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn join(&self, trigger: Trigger<'_>) -> Outcome {
        let rx = {
            let mut pending = self.lock();
            let (tx, rx) = oneshot::channel();

            match pending.as_mut() {
                Some(refresh) => {
                    refresh.waiters.push(tx);
                    tracing::debug!(waiters = refresh.waiters.len(), "Joining in-flight refresh");
                }
                None => {
                    if let Trigger::Rejected(rejected) = trigger {
                        if let Some(current) = self.renewed_since(rejected) {
                            tracing::debug!("Access token already renewed");
                            return Ok(current);
                        }
                    }

                    *pending = Some(PendingRefresh { waiters: vec![tx] });
                    tracing::debug!("Starting refresh");
                    tokio::spawn(self.clone().run());
                }
            }

            rx
        };

        rx.await.unwrap_or(Err(RefreshError::Abandoned))
    }

    fn renewed_since(&self, rejected: Option<&str>) -> Option<String> {
        let pair = self.store().read()?;
        let current = pair.bearer()?;

        (Some(current) != rejected).then(|| current.to_string())
    }

    async fn run(self) {
        let refresher = self.refresher.clone();

        let exchange = tokio::spawn(async move {
            match refresher.store().read() {
                Some(pair) => refresher
                    .exchange(&pair.refresh_token)
                    .await
                    .map(|pair| pair.access_token),
                None => Err(RefreshError::MissingToken),
            }
        });

        let outcome = exchange.await.unwrap_or_else(|e| {
            tracing::error!("Refresh task failed, {:?}", e);
            Err(RefreshError::Abandoned)
        });

        self.resolve(outcome);
    }

    fn resolve(&self, outcome: Outcome) {
        let Some(refresh) = self.lock().take() else {
            return;
        };

        match &outcome {
            Ok(_) => tracing::debug!(waiters = refresh.waiters.len(), "Refresh succeeded"),
            Err(e) => tracing::warn!(waiters = refresh.waiters.len(), "Refresh failed, {}", e),
        }

        for waiter in refresh.waiters {
            let _ = waiter.send(outcome.clone());
        }
    }
}
