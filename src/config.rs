// Configuration File Support
//
// Configuration for the registry client: logging, rate limit and registry
// endpoint. Loaded from a TOML file when one exists, then overridden by
// REGISTRY_CLIENT_* environment variables, then validated.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::rate_limit::RateLimitConfig;
use crate::registry::transport::DEFAULT_ENDPOINT;

/// Default configuration file name, looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "registry-client.toml";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Logging configuration
    pub logging: LoggingConfig,

    /// Rate limit configuration
    pub rate_limit: RateLimitConfig,

    /// Registry endpoint configuration
    pub registry: RegistryConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (json, pretty, compact)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "compact".to_string(),
        }
    }
}

/// Registry endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RegistryConfig {
    /// Document-creation URL
    pub endpoint: String,

    /// Timeout in seconds for one HTTP request
    pub timeout_secs: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout_secs: 30,
        }
    }
}

impl RegistryConfig {
    /// Get request timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    /// Load configuration from `registry-client.toml` in the working directory
    pub fn load() -> Result<Self> {
        Self::load_from_path(DEFAULT_CONFIG_FILE)
    }

    /// Load configuration from a specific path
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed, or
    /// if the resulting configuration is invalid. A missing file yields the
    /// defaults (plus environment overrides).
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let config = if path.exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file from {:?}", path))?;
            let config: Config = toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file from {:?}", path))?;
            tracing::info!("Loaded configuration from {:?}", path);
            config
        } else {
            tracing::debug!("Config file not found at {:?}, using defaults", path);
            Self::default()
        };

        let config = config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration
    ///
    /// Environment variables take precedence over config file values:
    /// - REGISTRY_CLIENT_LOG_LEVEL
    /// - REGISTRY_CLIENT_LOG_FORMAT
    /// - REGISTRY_CLIENT_WINDOW_UNIT
    /// - REGISTRY_CLIENT_REQUEST_LIMIT
    /// - REGISTRY_CLIENT_WINDOW_POLICY
    /// - REGISTRY_CLIENT_ENDPOINT
    /// - REGISTRY_CLIENT_TIMEOUT_SECS
    pub fn apply_env_overrides(self) -> Self {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    fn apply_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        // Logging overrides
        if let Some(level) = lookup("REGISTRY_CLIENT_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("REGISTRY_CLIENT_LOG_FORMAT") {
            self.logging.format = format;
        }

        // Registry overrides
        if let Some(endpoint) = lookup("REGISTRY_CLIENT_ENDPOINT") {
            self.registry.endpoint = endpoint;
        }
        if let Some(timeout) = lookup("REGISTRY_CLIENT_TIMEOUT_SECS") {
            if let Ok(timeout) = timeout.parse::<u64>() {
                if timeout > 0 {
                    self.registry.timeout_secs = timeout;
                }
            }
        }

        self.rate_limit = self.rate_limit.apply_overrides(&lookup);
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "Invalid log level: {}. Must be one of: trace, debug, info, warn, error",
                self.logging.level
            ),
        }

        match self.logging.format.to_lowercase().as_str() {
            "json" | "pretty" | "compact" => {}
            _ => anyhow::bail!(
                "Invalid log format: {}. Must be one of: json, pretty, compact",
                self.logging.format
            ),
        }

        self.rate_limit.validate()?;

        if self.registry.endpoint.is_empty() {
            anyhow::bail!("Registry endpoint must not be empty");
        }
        if !self.registry.endpoint.starts_with("http://") && !self.registry.endpoint.starts_with("https://") {
            anyhow::bail!("Registry endpoint must be an http(s) URL: {}", self.registry.endpoint);
        }
        if self.registry.timeout_secs == 0 {
            anyhow::bail!("Registry timeout must be > 0");
        }

        Ok(())
    }

    /// Convert log level string to tracing::Level
    pub fn log_level(&self) -> Result<tracing::Level> {
        self.logging
            .level
            .to_lowercase()
            .parse()
            .map_err(|e| anyhow::anyhow!("Failed to parse log level: {}", e))
    }
}
