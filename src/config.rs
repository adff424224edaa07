//! # Bot Configuration Module
//!
//! Process-wide settings loaded once at startup from the environment
//! (optionally seeded from a `.env` file). Immutable afterwards.

use anyhow::{anyhow, Context, Result};
use std::fmt;
use std::time::Duration;

/// Default timeout applied to every backend request
pub const DEFAULT_BACKEND_TIMEOUT_SECS: u64 = 5;

pub const ENV_BACKEND_URL: &str = "STRAPI_URL";
pub const ENV_BACKEND_TOKEN: &str = "STRAPI_API_TOKEN";
pub const ENV_TELEGRAM_TOKEN: &str = "TG_TOKEN";
pub const ENV_BACKEND_TIMEOUT: &str = "BACKEND_TIMEOUT_SECS";

#[derive(Clone)]
pub struct BotConfig {
    /// Backend base address, without a trailing slash
    pub backend_url: String,
    pub backend_token: String,
    pub telegram_token: String,
    pub backend_timeout: Duration,
}

impl BotConfig {
    /// Load the configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load the configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .ok_or_else(|| anyhow!("{key} must be set"))
        };

        let backend_url = required(ENV_BACKEND_URL)?.trim_end_matches('/').to_string();
        let backend_token = required(ENV_BACKEND_TOKEN)?;
        let telegram_token = required(ENV_TELEGRAM_TOKEN)?;

        let timeout_secs = match lookup(ENV_BACKEND_TIMEOUT) {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .with_context(|| format!("Invalid {ENV_BACKEND_TIMEOUT}: {raw}"))?,
            None => DEFAULT_BACKEND_TIMEOUT_SECS,
        };
        if timeout_secs == 0 {
            return Err(anyhow!("{ENV_BACKEND_TIMEOUT} must be greater than zero"));
        }

        Ok(Self {
            backend_url,
            backend_token,
            telegram_token,
            backend_timeout: Duration::from_secs(timeout_secs),
        })
    }
}

impl fmt::Debug for BotConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BotConfig")
            .field("backend_url", &self.backend_url)
            .field("backend_token", &"<redacted>")
            .field("telegram_token", &"<redacted>")
            .field("backend_timeout", &self.backend_timeout)
            .finish()
    }
}
