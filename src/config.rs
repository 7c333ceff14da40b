//! Configuration loading from TOML with environment variable resolution.
//!
//! Reads `tradervue.toml` and deserializes into strongly-typed structs.
//! Credentials are referenced by env-var name in the config and resolved at
//! runtime, so the file itself never holds a password.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::client::DEFAULT_BASE_URL;
use crate::imports::ImportOptions;
use crate::types::Credentials;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub client: ClientConfig,
    pub import: ImportConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ClientConfig {
    pub base_url: String,
    pub user_agent: String,
    pub username_env: String,
    pub password_env: String,
    /// Act on behalf of this user id on every request.
    pub target_user: Option<String>,
    /// Dump full requests and responses at DEBUG.
    pub verbose_http: bool,
    pub timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: format!("tradervue-rs/{}", env!("CARGO_PKG_VERSION")),
            username_env: "TRADERVUE_USERNAME".to_string(),
            password_env: "TRADERVUE_PASSWORD".to_string(),
            target_user: None,
            verbose_http: false,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ImportConfig {
    pub retries: u32,
    pub wait_retries: u32,
    pub secs_per_wait_retry: u64,
}

impl Default for ImportConfig {
    fn default() -> Self {
        let opts = ImportOptions::default();
        Self {
            retries: opts.import_retries,
            wait_retries: opts.wait_retries,
            secs_per_wait_retry: opts.poll_interval.as_secs(),
        }
    }
}

impl ImportConfig {
    pub fn options(&self, wait_for_completion: bool) -> ImportOptions {
        ImportOptions {
            import_retries: self.retries,
            wait_for_completion,
            wait_retries: self.wait_retries,
            poll_interval: Duration::from_secs(self.secs_per_wait_retry),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        Self::parse(&contents).with_context(|| format!("Failed to parse config file: {path}"))
    }

    /// Load `path` if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &str) -> Result<Self> {
        if Path::new(path).exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn parse(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Resolve an environment variable name to its value.
    pub fn resolve_env(env_name: &str) -> Result<String> {
        std::env::var(env_name)
            .with_context(|| format!("Environment variable not set: {env_name}"))
    }

    /// Build credentials from the env vars named in `[client]`.
    pub fn credentials(&self) -> Result<Credentials> {
        let username = Self::resolve_env(&self.client.username_env)?;
        let password = Self::resolve_env(&self.client.password_env)?;
        let mut creds = Credentials::new(username, password, self.client.user_agent.clone());
        creds.target_user = self.client.target_user.clone();
        Ok(creds)
    }
}
