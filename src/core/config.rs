use std::path::PathBuf;
use std::time::Duration;

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File};
use serde::Deserialize;

use crate::core::error::ConfigError;

const CONFIG_FILE: &str = "subdash";

/// Optional `subdash.toml`, then `SUBDASH_*`, then `NEXT_PUBLIC_*`.
fn sources() -> ConfigBuilder<DefaultState> {
    Config::builder()
        .add_source(File::with_name(CONFIG_FILE).required(false))
        .add_source(Environment::with_prefix("SUBDASH").try_parsing(true))
        .add_source(Environment::with_prefix("NEXT_PUBLIC"))
}

#[derive(Debug, Deserialize, Clone)]
pub(crate) struct Args {
    pub(crate) api_base_url: String,
    pub(crate) log_level: String,
    pub(crate) port: u16,
    /// Marks session cookies `Secure`.
    pub(crate) production: bool,
    pub(crate) request_timeout_secs: u64,
    /// Inbound requests per second.
    pub(crate) rate_limit: u64,
}

impl Args {
    pub(crate) fn load() -> Result<Self, ConfigError> {
        Self::from_builder(sources())
    }

    pub(crate) fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        let args = builder
            .set_default("log_level", "info")?
            .set_default("port", 3000)?
            .set_default("production", false)?
            .set_default("request_timeout_secs", 30)?
            .set_default("rate_limit", 100)?
            .build()?
            .try_deserialize::<Args>()?;

        Ok(args)
    }

    pub(crate) fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Settings for the user-agent side of a session.
#[derive(Debug, Deserialize, Clone)]
pub struct ClientConfig {
    pub api_base_url: String,
    #[serde(default)]
    pub session_path: Option<PathBuf>,
    pub request_timeout_secs: u64,
}

impl ClientConfig {
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_builder(sources())
    }

    pub fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        let config = builder
            .set_default("request_timeout_secs", 30)?
            .build()?
            .try_deserialize::<ClientConfig>()?;

        Ok(config)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Location of the persisted token pair, falling back to the platform
    /// config directory.
    pub fn session_path(&self) -> Option<PathBuf> {
        self.session_path
            .clone()
            .or_else(|| Self::config_dir().map(|dir| dir.join("session.json")))
    }

    fn config_dir() -> Option<PathBuf> {
        #[cfg(target_os = "windows")]
        {
            std::env::var("APPDATA")
                .ok()
                .map(|p| PathBuf::from(p).join("subdash"))
        }

        #[cfg(not(target_os = "windows"))]
        {
            std::env::var("XDG_CONFIG_HOME")
                .ok()
                .map(PathBuf::from)
                .or_else(|| std::env::var("HOME").ok().map(|p| PathBuf::from(p).join(".config")))
                .map(|p| p.join("subdash"))
        }
    }
}
