pub mod client;
pub mod config;
pub mod error;
pub(crate) mod state;
