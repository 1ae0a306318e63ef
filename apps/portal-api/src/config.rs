use std::time::Duration;

use anyhow::{Context, Result};

use crate::backend_client::Timeouts;
use crate::filtering::orchestrator::OrchestratorSettings;

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub backend_url: String,
    pub backend_api_key: String,
    pub port: u16,
    pub rust_log: String,
    pub poll_interval: Duration,
    pub status_timeout: Duration,
    pub listing_timeout: Duration,
    /// Zero disables periodic refresh.
    pub auto_refresh: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let require = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .with_context(|| format!("Required environment variable '{key}' is not set"))
        };
        let number = |key: &str, default: u64| -> Result<u64> {
            match lookup(key) {
                Some(v) => v
                    .trim()
                    .parse::<u64>()
                    .with_context(|| format!("{key} must be a non-negative integer")),
                None => Ok(default),
            }
        };

        let poll_ms = number("FILTERING_POLL_INTERVAL_MS", 2000)?;
        if poll_ms == 0 {
            anyhow::bail!("FILTERING_POLL_INTERVAL_MS must be greater than zero");
        }

        Ok(Config {
            backend_url: require("BACKEND_URL")?,
            backend_api_key: require("BACKEND_API_KEY")?,
            port: lookup("PORT")
                .unwrap_or_else(|| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            poll_interval: Duration::from_millis(poll_ms),
            status_timeout: Duration::from_secs(number("STATUS_TIMEOUT_SECS", 15)?),
            listing_timeout: Duration::from_secs(number("LISTING_TIMEOUT_SECS", 30)?),
            auto_refresh: Duration::from_secs(number("AUTO_REFRESH_SECS", 60)?),
        })
    }

    pub fn timeouts(&self) -> Timeouts {
        Timeouts {
            standard: self.status_timeout,
            listing: self.listing_timeout,
        }
    }

    pub fn orchestrator_settings(&self) -> OrchestratorSettings {
        OrchestratorSettings {
            poll_interval: self.poll_interval,
            auto_refresh: Some(self.auto_refresh).filter(|d| !d.is_zero()),
        }
    }
}
