// src/config/models.rs
use crate::health::ProbeHints;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue {
        field: &'static str,
        reason: &'static str,
    },
}

/// Retry policy for one startup validation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Total attempts, including the first.
    pub retry_count: u32,
    /// Fixed wait between failed attempts.
    pub delay_secs: u64,
    /// Advisory bound on one whole aggregate probe.
    pub timeout_secs: u64,
    /// Advisory bound on checks running at once.
    pub max_parallelism: usize,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            retry_count: 3,
            delay_secs: 5,
            timeout_secs: 10,
            max_parallelism: 4,
        }
    }
}

impl RunnerConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_secs(self.delay_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn hints(&self) -> ProbeHints {
        ProbeHints {
            timeout: self.timeout(),
            max_parallelism: self.max_parallelism,
        }
    }

    /// Apply caller overrides on top of this config; unset fields keep
    /// their current value.
    pub fn merged(self, overrides: &RunnerOverrides) -> Self {
        Self {
            retry_count: overrides.retry_count.unwrap_or(self.retry_count),
            delay_secs: overrides.delay_secs.unwrap_or(self.delay_secs),
            timeout_secs: overrides.timeout_secs.unwrap_or(self.timeout_secs),
            max_parallelism: overrides.max_parallelism.unwrap_or(self.max_parallelism),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.retry_count == 0 {
            return Err(ConfigError::InvalidValue {
                field: "retry_count",
                reason: "must be at least 1",
            });
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "timeout_secs",
                reason: "must be greater than 0",
            });
        }
        if self.max_parallelism == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_parallelism",
                reason: "must be at least 1",
            });
        }
        Ok(())
    }
}

/// Partially specified [`RunnerConfig`], as read from a file or the
/// environment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerOverrides {
    pub retry_count: Option<u32>,
    pub delay_secs: Option<u64>,
    pub timeout_secs: Option<u64>,
    pub max_parallelism: Option<usize>,
}

impl RunnerOverrides {
    /// Layer `upper` over `self`; fields set in `upper` win.
    pub fn overlay(self, upper: RunnerOverrides) -> Self {
        Self {
            retry_count: upper.retry_count.or(self.retry_count),
            delay_secs: upper.delay_secs.or(self.delay_secs),
            timeout_secs: upper.timeout_secs.or(self.timeout_secs),
            max_parallelism: upper.max_parallelism.or(self.max_parallelism),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CheckConfig {
    Http {
        name: String,
        url: Url,
        #[serde(default)]
        timeout_secs: Option<u64>,
    },
    Tcp {
        name: String,
        address: String,
    },
}

impl CheckConfig {
    pub fn name(&self) -> &str {
        match self {
            CheckConfig::Http { name, .. } | CheckConfig::Tcp { name, .. } => name,
        }
    }
}

/// On-disk layout: runner overrides plus the checks to register.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    pub runner: RunnerOverrides,
    pub checks: Vec<CheckConfig>,
}

impl GateConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        RunnerConfig::default().merged(&self.runner).validate()?;

        for check in &self.checks {
            if let CheckConfig::Http {
                timeout_secs: Some(0),
                ..
            } = check
            {
                return Err(ConfigError::InvalidValue {
                    field: "checks.timeout_secs",
                    reason: "must be greater than 0",
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RunnerConfig::default();
        assert_eq!(config.retry_count, 3);
        assert_eq!(config.delay(), Duration::from_secs(5));
        assert_eq!(config.timeout(), Duration::from_secs(10));
        assert_eq!(config.max_parallelism, 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_overrides_win_over_defaults() {
        let overrides = RunnerOverrides {
            retry_count: Some(1),
            delay_secs: Some(0),
            ..Default::default()
        };
        let config = RunnerConfig::default().merged(&overrides);
        assert_eq!(config.retry_count, 1);
        assert_eq!(config.delay_secs, 0);
        assert_eq!(config.timeout_secs, 10);
        assert_eq!(config.max_parallelism, 4);
    }

    #[test]
    fn test_overlay_prefers_upper_layer() {
        let file = RunnerOverrides {
            retry_count: Some(5),
            delay_secs: Some(2),
            ..Default::default()
        };
        let env = RunnerOverrides {
            retry_count: Some(7),
            ..Default::default()
        };
        let layered = file.overlay(env);
        assert_eq!(layered.retry_count, Some(7));
        assert_eq!(layered.delay_secs, Some(2));
        assert_eq!(layered.timeout_secs, None);
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        let config = RunnerConfig {
            retry_count: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { field: "retry_count", .. })
        ));

        let config = RunnerConfig {
            max_parallelism: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        // zero delay is allowed
        let config = RunnerConfig {
            delay_secs: 0,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }
}
