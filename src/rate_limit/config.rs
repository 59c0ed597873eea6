//! Rate Limit Configuration
//!
//! Quota and window settings for the submission rate limiter.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use super::error::RateLimitError;

/// Default admissions per window
pub const DEFAULT_REQUEST_LIMIT: u32 = 5;

/// Granularity of one quota period
///
/// One window lasts exactly one of the chosen unit, so
/// `(WindowUnit::Minutes, 5)` means "at most 5 submissions per minute".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowUnit {
    Nanoseconds,
    Microseconds,
    Milliseconds,
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl WindowUnit {
    /// Length of one window of this unit
    pub fn duration(&self) -> Duration {
        match self {
            WindowUnit::Nanoseconds => Duration::from_nanos(1),
            WindowUnit::Microseconds => Duration::from_micros(1),
            WindowUnit::Milliseconds => Duration::from_millis(1),
            WindowUnit::Seconds => Duration::from_secs(1),
            WindowUnit::Minutes => Duration::from_secs(60),
            WindowUnit::Hours => Duration::from_secs(3600),
            WindowUnit::Days => Duration::from_secs(86_400),
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            WindowUnit::Nanoseconds => "nanoseconds",
            WindowUnit::Microseconds => "microseconds",
            WindowUnit::Milliseconds => "milliseconds",
            WindowUnit::Seconds => "seconds",
            WindowUnit::Minutes => "minutes",
            WindowUnit::Hours => "hours",
            WindowUnit::Days => "days",
        }
    }
}

impl fmt::Display for WindowUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WindowUnit {
    type Err = RateLimitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "nanoseconds" | "ns" => Ok(WindowUnit::Nanoseconds),
            "microseconds" | "us" => Ok(WindowUnit::Microseconds),
            "milliseconds" | "ms" => Ok(WindowUnit::Milliseconds),
            "seconds" | "s" => Ok(WindowUnit::Seconds),
            "minutes" | "m" => Ok(WindowUnit::Minutes),
            "hours" | "h" => Ok(WindowUnit::Hours),
            "days" | "d" => Ok(WindowUnit::Days),
            other => Err(RateLimitError::InvalidConfiguration(format!(
                "unknown window unit: {}",
                other
            ))),
        }
    }
}

/// How admissions are counted against the window
///
/// `Fixed` resets the count at every window boundary. Up to `2 * capacity`
/// grants can land in a short span straddling a boundary.
///
/// `Sliding` keeps the timestamp of every grant and admits only while fewer
/// than `capacity` grants fall inside the trailing window, so any interval
/// of window length holds at most `capacity` grants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowPolicy {
    #[default]
    Fixed,
    Sliding,
}

impl FromStr for WindowPolicy {
    type Err = RateLimitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fixed" => Ok(WindowPolicy::Fixed),
            "sliding" => Ok(WindowPolicy::Sliding),
            other => Err(RateLimitError::InvalidConfiguration(format!(
                "unknown window policy: {}",
                other
            ))),
        }
    }
}

/// Rate limit configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Length of one quota period
    pub window_unit: WindowUnit,

    /// Maximum submissions per period
    pub request_limit: u32,

    /// Window counting policy
    pub policy: WindowPolicy,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_unit: WindowUnit::Minutes,
            request_limit: DEFAULT_REQUEST_LIMIT,
            policy: WindowPolicy::Fixed,
        }
    }
}

impl RateLimitConfig {
    /// Create a configuration for `request_limit` submissions per `window_unit`
    pub fn new(window_unit: WindowUnit, request_limit: u32) -> Self {
        Self {
            window_unit,
            request_limit,
            ..Self::default()
        }
    }

    /// Use the given window policy
    pub fn with_policy(mut self, policy: WindowPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Load configuration from environment variables
    ///
    /// Unparseable values are ignored and the default kept.
    pub fn from_env() -> Self {
        Self::default().apply_env_overrides()
    }

    /// Apply `REGISTRY_CLIENT_*` environment overrides on top of `self`
    pub fn apply_env_overrides(self) -> Self {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides read through `lookup`
    pub(crate) fn apply_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(val) = lookup("REGISTRY_CLIENT_WINDOW_UNIT") {
            if let Ok(unit) = val.parse() {
                self.window_unit = unit;
            }
        }

        if let Some(val) = lookup("REGISTRY_CLIENT_REQUEST_LIMIT") {
            if let Ok(limit) = val.trim().parse() {
                self.request_limit = limit;
            }
        }

        if let Some(val) = lookup("REGISTRY_CLIENT_WINDOW_POLICY") {
            if let Ok(policy) = val.parse() {
                self.policy = policy;
            }
        }

        self
    }

    /// Get window duration
    pub fn window(&self) -> Duration {
        self.window_unit.duration()
    }

    /// Reject a zero request limit
    pub fn validate(&self) -> Result<(), RateLimitError> {
        if self.request_limit == 0 {
            return Err(RateLimitError::InvalidConfiguration(
                "request limit must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RateLimitConfig::default();
        assert_eq!(config.request_limit, DEFAULT_REQUEST_LIMIT);
        assert_eq!(config.window_unit, WindowUnit::Minutes);
        assert_eq!(config.policy, WindowPolicy::Fixed);
    }

    #[test]
    fn test_window_duration() {
        let config = RateLimitConfig::new(WindowUnit::Seconds, 10);
        assert_eq!(config.window(), Duration::from_secs(1));
        assert_eq!(WindowUnit::Hours.duration(), Duration::from_secs(3600));
        assert_eq!(WindowUnit::Milliseconds.duration(), Duration::from_millis(1));
    }

    #[test]
    fn test_window_unit_parse() {
        assert_eq!("MINUTES".parse::<WindowUnit>().unwrap(), WindowUnit::Minutes);
        assert_eq!(" ms ".parse::<WindowUnit>().unwrap(), WindowUnit::Milliseconds);
        assert!("fortnights".parse::<WindowUnit>().is_err());
    }

    #[test]
    fn test_window_policy_parse() {
        assert_eq!("sliding".parse::<WindowPolicy>().unwrap(), WindowPolicy::Sliding);
        assert!("leaky".parse::<WindowPolicy>().is_err());
    }

    #[test]
    fn test_overrides() {
        let config = RateLimitConfig::default().apply_overrides(|key| match key {
            "REGISTRY_CLIENT_WINDOW_UNIT" => Some("hours".to_string()),
            "REGISTRY_CLIENT_REQUEST_LIMIT" => Some("100".to_string()),
            "REGISTRY_CLIENT_WINDOW_POLICY" => Some("bogus".to_string()),
            _ => None,
        });
        assert_eq!(config.window_unit, WindowUnit::Hours);
        assert_eq!(config.request_limit, 100);
        assert_eq!(config.policy, WindowPolicy::Fixed);
    }

    #[test]
    fn test_validate_rejects_zero_limit() {
        let config = RateLimitConfig::new(WindowUnit::Minutes, 0);
        assert!(matches!(
            config.validate(),
            Err(RateLimitError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_config_serialization() {
        let config = RateLimitConfig::new(WindowUnit::Hours, 42).with_policy(WindowPolicy::Sliding);
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"hours\""));
        assert!(json.contains("\"sliding\""));
        let parsed: RateLimitConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, parsed);
    }
}
