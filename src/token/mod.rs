//! Session credentials and the machinery that keeps them fresh.
//!
//! A [`CredentialStore`] holds the current [`TokenPair`] for one scope: a
//! user-agent session ([`ClientStore`]) or a single inbound request
//! ([`CookieStore`]). [`AuthorizedClient`] sends requests with the stored
//! access token and, on a 401, asks the scope's [`RefreshCoordinator`] for a
//! renewed one, which collapses concurrent refreshes into a single
//! [`TokenRefresher`] exchange.

pub mod authorized;
pub mod client_store;
pub mod cookie_store;
pub mod coordinator;
pub mod refresh;
pub mod store;

pub use authorized::AuthorizedClient;
pub use client_store::ClientStore;
pub use cookie_store::CookieStore;
pub use coordinator::RefreshCoordinator;
pub use refresh::TokenRefresher;
pub use store::{CredentialStore, TokenPair};
