// src/health/status.rs
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

/// Tri-state readiness of a single check or of the whole aggregate.
///
/// Variants are ordered from best to worst so the aggregate status is the
/// maximum over all entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        *self == HealthStatus::Healthy
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Healthy => "Healthy",
            HealthStatus::Degraded => "Degraded",
            HealthStatus::Unhealthy => "Unhealthy",
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a check failed: the error message plus a rendered trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureCause {
    pub message: String,
    pub trace: String,
}

impl FailureCause {
    pub fn new(message: impl Into<String>, trace: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            trace: trace.into(),
        }
    }

    /// Capture an `anyhow` error; the trace is the debug rendering, which
    /// includes the source chain (and a backtrace when one was captured).
    pub fn from_error(err: &anyhow::Error) -> Self {
        Self {
            message: err.to_string(),
            trace: format!("{:?}", err),
        }
    }
}

/// What a single check reports about itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckResult {
    pub status: HealthStatus,
    pub description: String,
}

impl CheckResult {
    pub fn healthy(description: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Healthy,
            description: description.into(),
        }
    }

    pub fn unhealthy(description: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Unhealthy,
            description: description.into(),
        }
    }
}

/// Outcome of one named check within one attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckOutcome {
    pub name: String,
    pub status: HealthStatus,
    pub description: String,
    pub failure: Option<FailureCause>,
    pub duration: Duration,
}

impl CheckOutcome {
    pub fn new(name: impl Into<String>, status: HealthStatus, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status,
            description: description.into(),
            failure: None,
            duration: Duration::ZERO,
        }
    }

    pub fn with_failure(mut self, failure: FailureCause) -> Self {
        self.failure = Some(failure);
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub fn failure_message(&self) -> &str {
        self.failure.as_ref().map(|f| f.message.as_str()).unwrap_or("")
    }

    pub fn failure_trace(&self) -> &str {
        self.failure.as_ref().map(|f| f.trace.as_str()).unwrap_or("")
    }
}

/// Composite result of probing every registered check once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregateResult {
    pub status: HealthStatus,
    pub entries: HashMap<String, CheckOutcome>,
    pub total_duration: Duration,
    pub checked_at: DateTime<Utc>,
}

impl AggregateResult {
    /// Build a result whose overall status is the worst entry status.
    /// No entries at all counts as healthy.
    pub fn from_outcomes(outcomes: impl IntoIterator<Item = CheckOutcome>) -> Self {
        let entries: HashMap<String, CheckOutcome> = outcomes
            .into_iter()
            .map(|outcome| (outcome.name.clone(), outcome))
            .collect();

        let status = entries
            .values()
            .map(|outcome| outcome.status)
            .max()
            .unwrap_or(HealthStatus::Healthy);

        Self {
            status,
            entries,
            total_duration: Duration::ZERO,
            checked_at: Utc::now(),
        }
    }

    /// Build a result with an explicit overall status, for probers that
    /// apply their own aggregation rule.
    pub fn with_status(status: HealthStatus, outcomes: impl IntoIterator<Item = CheckOutcome>) -> Self {
        Self {
            status,
            ..Self::from_outcomes(outcomes)
        }
    }

    pub fn with_total_duration(mut self, duration: Duration) -> Self {
        self.total_duration = duration;
        self
    }

    pub fn is_healthy(&self) -> bool {
        self.status.is_healthy()
    }

    /// Entries that are not exactly healthy, sorted by name.
    pub fn failing(&self) -> Vec<&CheckOutcome> {
        let mut failing: Vec<_> = self
            .entries
            .values()
            .filter(|outcome| !outcome.status.is_healthy())
            .collect();
        failing.sort_by(|a, b| a.name.cmp(&b.name));
        failing
    }
}
