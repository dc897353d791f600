use crate::core::client::Client;
use crate::core::config::Args;
use crate::core::error::ConfigError;
use crate::token::{AuthorizedClient, CookieStore};

#[derive(Clone, Debug)]
pub(crate) struct AppState {
    pub(crate) client: Client,
    pub(crate) production: bool,
}

impl AppState {
    pub(crate) fn new(args: &Args) -> Result<Self, ConfigError> {
        Ok(AppState {
            client: Client::new(&args.api_base_url, args.request_timeout())?,
            production: args.production,
        })
    }

    /// Backend access for one inbound request, refreshing through that
    /// request's own cookies.
    pub(crate) fn authorized(&self, cookies: CookieStore) -> AuthorizedClient<CookieStore> {
        AuthorizedClient::new(self.client.clone(), cookies)
    }
}
