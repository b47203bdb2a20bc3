//! Application configuration management.
//!
//! This module handles loading and saving the application configuration:
//! the sign-in and GraphQL endpoints, where the session token is kept,
//! and the last username used to log in.
//!
//! Configuration is stored at `~/.config/xpboard/config.json`. Endpoint and
//! storage settings can be overridden through `XPBOARD_*` environment
//! variables for a single run; overrides are never written back.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::auth::{FileStorage, KeyringStorage, TokenStorage, TOKEN_KEY};

/// Application name used for config/cache directory paths
pub const APP_NAME: &str = "xpboard";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Identity endpoint that exchanges Basic credentials for a token
pub const DEFAULT_SIGNIN_URL: &str = "https://learn.reboot01.com/api/auth/signin";

/// GraphQL endpoint queried with the bearer token
pub const DEFAULT_GRAPHQL_URL: &str = "https://learn.reboot01.com/api/graphql-engine/v1/graphql";

/// HTTP request timeout in seconds.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

const ENV_SIGNIN_URL: &str = "XPBOARD_SIGNIN_URL";
const ENV_GRAPHQL_URL: &str = "XPBOARD_GRAPHQL_URL";
const ENV_STORAGE: &str = "XPBOARD_STORAGE";

/// Where the session token is persisted between runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    File,
    Keyring,
}

impl StorageBackend {
    fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "file" => Some(Self::File),
            "keyring" => Some(Self::Keyring),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub signin_url: String,
    pub graphql_url: String,
    pub storage: StorageBackend,
    pub request_timeout_secs: u64,
    pub last_username: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            signin_url: DEFAULT_SIGNIN_URL.to_string(),
            graphql_url: DEFAULT_GRAPHQL_URL.to_string(),
            storage: StorageBackend::default(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            last_username: None,
        }
    }
}

impl Config {
    /// Load the config file (defaults if absent), then apply env overrides
    pub fn load() -> Result<Self> {
        let mut config = Self::load_file()?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// The config file alone, without env overrides
    pub fn load_file() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Persist the username used for the last successful login.
    ///
    /// Only that field is changed in the file, so overrides in effect for
    /// this run are not saved with it.
    pub fn remember_username(username: &str) -> Result<()> {
        Self::remember_username_at(&Self::config_path()?, username)
    }

    fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn remember_username_at(path: &Path, username: &str) -> Result<()> {
        let mut stored = Self::load_from(path)?;
        stored.last_username = Some(username.to_string());
        stored.save_to(path)
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_SIGNIN_URL).filter(|v| !v.is_empty()) {
            self.signin_url = url;
        }
        if let Some(url) = lookup(ENV_GRAPHQL_URL).filter(|v| !v.is_empty()) {
            self.graphql_url = url;
        }
        if let Some(name) = lookup(ENV_STORAGE) {
            match StorageBackend::from_name(&name) {
                Some(backend) => self.storage = backend,
                None => warn!(value = %name, "Ignoring unknown storage backend"),
            }
        }
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Build the configured durable storage backend
    pub fn token_storage(&self) -> Result<Box<dyn TokenStorage>> {
        Ok(match self.storage {
            StorageBackend::File => Box::new(FileStorage::new(self.cache_dir()?)),
            StorageBackend::Keyring => Box::new(KeyringStorage::new(APP_NAME, &[TOKEN_KEY])),
        })
    }
}
