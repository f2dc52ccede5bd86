//! Configuration loading from TOML with environment variable resolution.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! The gateway API key is referenced by env-var name in the config and
//! resolved at runtime via `std::env::var`.

use anyhow::{Context, Result};
use secrecy::SecretString;
use serde::Deserialize;
use std::fs;
use std::time::Duration;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub backend: BackendConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BackendConfig {
    pub base_url: String,
    pub api_key_env: String,
    #[serde(default = "default_predictions_table")]
    pub predictions_table: String,
    #[serde(default = "default_inference_function")]
    pub inference_function: String,
    #[serde(default = "default_market_data_function")]
    pub market_data_function: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// How many of the newest predictions the dashboard shows.
    pub recent_limit: usize,
    pub repository_timeout_secs: u64,
    /// Inference runs a model per request; give it room.
    pub inference_timeout_secs: u64,
    pub market_data_timeout_secs: u64,
    /// Send a quote request even when there are no symbols to price.
    pub request_quotes_for_empty_set: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            recent_limit: 10,
            repository_timeout_secs: 10,
            inference_timeout_secs: 90,
            market_data_timeout_secs: 10,
            request_quotes_for_empty_set: false,
        }
    }
}

impl OrchestratorConfig {
    /// Reject values that would make every operation fail or show nothing.
    pub fn validate(&self) -> Result<()> {
        if self.recent_limit == 0 {
            anyhow::bail!("orchestrator.recent_limit must be at least 1");
        }
        for (name, secs) in [
            ("repository_timeout_secs", self.repository_timeout_secs),
            ("inference_timeout_secs", self.inference_timeout_secs),
            ("market_data_timeout_secs", self.market_data_timeout_secs),
        ] {
            if secs == 0 {
                anyhow::bail!("orchestrator.{name} must be at least 1");
            }
        }
        Ok(())
    }

    pub fn repository_timeout(&self) -> Duration {
        Duration::from_secs(self.repository_timeout_secs)
    }

    pub fn inference_timeout(&self) -> Duration {
        Duration::from_secs(self.inference_timeout_secs)
    }

    pub fn market_data_timeout(&self) -> Duration {
        Duration::from_secs(self.market_data_timeout_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DashboardConfig {
    pub enabled: bool,
    pub port: u16,
    /// Run `initialize` once at startup so the first page load is warm.
    pub warm_on_start: bool,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 8080,
            warm_on_start: true,
        }
    }
}

fn default_predictions_table() -> String {
    "predictions".to_string()
}

fn default_inference_function() -> String {
    "ai-stock-analysis".to_string()
}

fn default_market_data_function() -> String {
    "market-data".to_string()
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        Self::parse(&contents).with_context(|| format!("Failed to parse config file: {path}"))
    }

    /// Parse configuration from TOML text.
    pub fn parse(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        config.orchestrator.validate()?;
        Ok(config)
    }

    /// Resolve an environment variable name to its value.
    pub fn resolve_env(env_name: &str) -> Result<String> {
        std::env::var(env_name)
            .with_context(|| format!("Environment variable not set: {env_name}"))
    }

    /// The gateway API key, wrapped so it never lands in logs.
    pub fn backend_api_key(&self) -> Result<SecretString> {
        Self::resolve_env(&self.backend.api_key_env).map(SecretString::new)
    }
}
