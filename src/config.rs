//! Environment-driven configuration.
//!
//! Every key is read from `PERF_`-prefixed variables with `__` between
//! levels, e.g. `PERF_TRACKER__SLOW_QUERY_THRESHOLD_MS=750` or
//! `PERF_AUTH__DEV_ADMIN_IDS=alice,bob`. Missing keys fall back to defaults.
//! Keys are lowercased on load, so `PERF_AUTH__USER_ROLES__Root-User=admin`
//! lands as `root-user`; the permission gate compares ids case-insensitively.

use std::collections::HashMap;

use serde::Deserialize;
use thiserror::Error;

use crate::auth::Role;
use crate::metrics::HealthThresholds;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub tracker: TrackerConfig,
    pub health: HealthThresholds,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 3000,
        }
    }
}

/// Sizing and thresholds for the in-memory tracker.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Requests slower than this (strictly) go to the slow-query log
    pub slow_query_threshold_ms: f64,
    /// Per-endpoint window feeding the percentiles
    pub recent_window: usize,
    pub slow_log_capacity: usize,
    /// SSE push period
    pub stream_interval_ms: u64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            slow_query_threshold_ms: 1000.0,
            recent_window: 100,
            slow_log_capacity: 50,
            stream_interval_ms: 500,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Grant admin to development identities without the role store
    pub dev_bypass: bool,
    /// Identities granted admin by the bypass; empty means everyone
    pub dev_admin_ids: Vec<String>,
    /// Role store: user id → role
    pub user_roles: HashMap<String, Role>,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let cfg = config::Config::builder()
            .add_source(
                config::Environment::with_prefix("PERF")
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("auth.dev_admin_ids")
                    .try_parsing(true),
            )
            .build()?;
        let parsed: Self = cfg.try_deserialize()?;
        parsed.validate()?;
        Ok(parsed)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = &self.tracker;
        if !t.slow_query_threshold_ms.is_finite() || t.slow_query_threshold_ms < 0.0 {
            return Err(invalid("tracker.slow_query_threshold_ms must be a non-negative number"));
        }
        if t.recent_window == 0 {
            return Err(invalid("tracker.recent_window must be at least 1"));
        }
        if t.slow_log_capacity == 0 {
            return Err(invalid("tracker.slow_log_capacity must be at least 1"));
        }
        if t.stream_interval_ms == 0 {
            return Err(invalid("tracker.stream_interval_ms must be at least 1"));
        }

        let h = &self.health;
        for rate in [h.error_rate_warning, h.error_rate_critical] {
            if !(0.0..=1.0).contains(&rate) {
                return Err(invalid("health error rates must lie within 0..=1"));
            }
        }
        if h.error_rate_warning > h.error_rate_critical {
            return Err(invalid("health.error_rate_warning exceeds error_rate_critical"));
        }
        if !h.latency_warning_ms.is_finite() || !h.latency_critical_ms.is_finite() {
            return Err(invalid("health latency thresholds must be finite numbers"));
        }
        if h.latency_warning_ms < 0.0 || h.latency_warning_ms > h.latency_critical_ms {
            return Err(invalid(
                "health.latency_warning_ms must be non-negative and not exceed latency_critical_ms",
            ));
        }

        if self.environment == Environment::Production && self.auth.dev_bypass {
            return Err(invalid("auth.dev_bypass must be disabled in production"));
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn invalid(msg: &str) -> ConfigError {
    ConfigError::Invalid(msg.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = AppConfig::default();
        cfg.validate().unwrap();
        assert_eq!(cfg.environment, Environment::Development);
        assert_eq!(cfg.tracker.recent_window, 100);
        assert_eq!(cfg.tracker.slow_log_capacity, 50);
        assert_eq!(cfg.tracker.slow_query_threshold_ms, 1000.0);
        assert_eq!(cfg.bind_addr(), "0.0.0.0:3000");
    }

    #[test]
    fn production_rejects_dev_bypass() {
        let mut cfg = AppConfig::default();
        cfg.environment = Environment::Production;
        cfg.auth.dev_bypass = true;
        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid(_))));

        cfg.auth.dev_bypass = false;
        cfg.validate().unwrap();
    }

    #[test]
    fn zero_capacities_rejected() {
        let mut cfg = AppConfig::default();
        cfg.tracker.slow_log_capacity = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = AppConfig::default();
        cfg.tracker.recent_window = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn inverted_thresholds_rejected() {
        let mut cfg = AppConfig::default();
        cfg.health.error_rate_warning = 0.5;
        cfg.health.error_rate_critical = 0.2;
        assert!(cfg.validate().is_err());

        let mut cfg = AppConfig::default();
        cfg.health.latency_warning_ms = 5000.0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn non_finite_latency_thresholds_rejected() {
        let mut cfg = AppConfig::default();
        cfg.health.latency_warning_ms = f64::NAN;
        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid(_))));

        let mut cfg = AppConfig::default();
        cfg.health.latency_critical_ms = f64::NAN;
        assert!(cfg.validate().is_err());

        let mut cfg = AppConfig::default();
        cfg.health.latency_critical_ms = f64::INFINITY;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn deserializes_from_nested_source() {
        let cfg: AppConfig = config::Config::builder()
            .set_override("environment", "production")
            .unwrap()
            .set_override("tracker.slow_query_threshold_ms", 250.0)
            .unwrap()
            .set_override("auth.user_roles.alice", "admin")
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(cfg.environment, Environment::Production);
        assert_eq!(cfg.tracker.slow_query_threshold_ms, 250.0);
        assert_eq!(cfg.tracker.slow_log_capacity, 50);
        assert_eq!(cfg.auth.user_roles.get("alice"), Some(&Role::Admin));
    }
}
