// src/health/checker.rs
use crate::health::{
    AggregateProber, AggregateResult, CheckOutcome, CheckResult, FailureCause, FnCheck,
    HealthCheck, HealthStatus, ProbeError, ProbeHints,
};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use futures::FutureExt;
use std::any::Any;
use std::collections::HashSet;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::time::{timeout_at, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RegistrationError {
    #[error("Health check name must not be empty")]
    EmptyName,

    #[error("Health check '{0}' is registered more than once")]
    DuplicateName(String),
}

struct Registration {
    name: String,
    check: Arc<dyn HealthCheck>,
}

impl Registration {
    /// Run the check until it finishes or `deadline` passes. `None` means
    /// the deadline is too far out to represent and the check runs
    /// unbounded. A panicking check is reported as unhealthy.
    async fn run(&self, deadline: Option<Instant>) -> CheckOutcome {
        let start = Instant::now();
        let check = AssertUnwindSafe(self.check.check()).catch_unwind();

        let finished = match deadline {
            Some(deadline) => timeout_at(deadline, check).await,
            None => Ok(check.await),
        };

        let outcome = match finished {
            Ok(Ok(Ok(CheckResult { status, description }))) => {
                CheckOutcome::new(&self.name, status, description)
            }
            Ok(Ok(Err(e))) => {
                warn!(check = %self.name, error = %e, "Health check raised an error");
                CheckOutcome::new(&self.name, HealthStatus::Unhealthy, e.to_string())
                    .with_failure(FailureCause::from_error(&e))
            }
            Ok(Err(panic)) => {
                let message = panic_message(panic.as_ref());
                error!(check = %self.name, panic = %message, "Health check panicked");
                CheckOutcome::new(&self.name, HealthStatus::Unhealthy, "Health check panicked")
                    .with_failure(FailureCause::new(message, ""))
            }
            Err(_) => {
                warn!(check = %self.name, "Health check timed out");
                CheckOutcome::new(&self.name, HealthStatus::Unhealthy, "Health check timed out")
                    .with_failure(FailureCause::new(
                        "health check did not complete before the aggregate deadline",
                        "",
                    ))
            }
        };

        outcome.with_duration(start.elapsed())
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "health check panicked with a non-string payload".to_string()
    }
}

/// Collects named checks before the registry is frozen.
#[derive(Default)]
pub struct HealthChecksBuilder {
    registrations: Vec<Registration>,
}

impl HealthChecksBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, name: impl Into<String>, check: impl HealthCheck + 'static) -> &mut Self {
        self.add_shared(name, Arc::new(check))
    }

    pub fn add_shared(&mut self, name: impl Into<String>, check: Arc<dyn HealthCheck>) -> &mut Self {
        self.registrations.push(Registration {
            name: name.into(),
            check,
        });
        self
    }

    /// Register an async closure as a check.
    pub fn add_fn<F, Fut>(&mut self, name: impl Into<String>, f: F) -> &mut Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<CheckResult>> + Send + 'static,
    {
        self.add(name, FnCheck::new(f))
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    pub fn build(self) -> Result<HealthCheckRegistry, RegistrationError> {
        let mut seen = HashSet::new();
        for registration in &self.registrations {
            if registration.name.trim().is_empty() {
                return Err(RegistrationError::EmptyName);
            }
            if !seen.insert(registration.name.as_str()) {
                return Err(RegistrationError::DuplicateName(registration.name.clone()));
            }
        }

        Ok(HealthCheckRegistry {
            registrations: self.registrations,
        })
    }
}

/// The built-in aggregate prober: runs every registered check, at most
/// `max_parallelism` at a time, all bounded by one shared deadline.
pub struct HealthCheckRegistry {
    registrations: Vec<Registration>,
}

impl HealthCheckRegistry {
    pub fn builder() -> HealthChecksBuilder {
        HealthChecksBuilder::new()
    }

    pub fn names(&self) -> Vec<&str> {
        self.registrations.iter().map(|r| r.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }
}

#[async_trait]
impl AggregateProber for HealthCheckRegistry {
    async fn check_all(
        &self,
        cancel: &CancellationToken,
        hints: ProbeHints,
    ) -> Result<AggregateResult, ProbeError> {
        if hints.max_parallelism == 0 {
            return Err(ProbeError::InvalidHint(
                "max_parallelism must be at least 1".to_string(),
            ));
        }

        let start = Instant::now();
        let deadline = start.checked_add(hints.timeout);

        debug!(
            checks = self.registrations.len(),
            max_parallelism = hints.max_parallelism,
            timeout = ?hints.timeout,
            "Running health checks"
        );

        let runs: Vec<_> = self
            .registrations
            .iter()
            .map(|registration| registration.run(deadline))
            .collect();
        let probes = stream::iter(runs)
            .buffer_unordered(hints.max_parallelism)
            .collect::<Vec<_>>();

        let outcomes = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ProbeError::Cancelled),
            outcomes = probes => outcomes,
        };

        let healthy_count = outcomes.iter().filter(|o| o.status.is_healthy()).count();
        info!(
            "Health check complete: {} healthy, {} not healthy",
            healthy_count,
            outcomes.len() - healthy_count
        );

        Ok(AggregateResult::from_outcomes(outcomes).with_total_duration(start.elapsed()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn hints(timeout_secs: u64, max_parallelism: usize) -> ProbeHints {
        ProbeHints {
            timeout: Duration::from_secs(timeout_secs),
            max_parallelism,
        }
    }

    #[tokio::test]
    async fn test_all_healthy_checks_aggregate_healthy() {
        let mut builder = HealthCheckRegistry::builder();
        builder
            .add_fn("SQL:MainDb", || async { Ok(CheckResult::healthy("connected")) })
            .add_fn("Redis:Cache", || async { Ok(CheckResult::healthy("PONG")) });
        let registry = builder.build().unwrap();

        let result = registry
            .check_all(&CancellationToken::new(), hints(10, 4))
            .await
            .unwrap();

        assert_eq!(result.status, HealthStatus::Healthy);
        assert_eq!(result.entries.len(), 2);
        assert_eq!(result.entries["Redis:Cache"].description, "PONG");
    }

    #[tokio::test]
    async fn test_check_error_becomes_unhealthy_entry() {
        let mut builder = HealthCheckRegistry::builder();
        builder
            .add_fn("SQL:MainDb", || async { Ok(CheckResult::healthy("")) })
            .add_fn("Mongo:Logs", || async {
                Err::<CheckResult, _>(anyhow::anyhow!("connection refused"))
            });
        let registry = builder.build().unwrap();

        let result = registry
            .check_all(&CancellationToken::new(), hints(10, 4))
            .await
            .unwrap();

        assert_eq!(result.status, HealthStatus::Unhealthy);
        let mongo = &result.entries["Mongo:Logs"];
        assert_eq!(mongo.status, HealthStatus::Unhealthy);
        assert_eq!(mongo.failure_message(), "connection refused");
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_check_times_out_at_deadline() {
        let mut builder = HealthCheckRegistry::builder();
        builder
            .add_fn("Fast", || async { Ok(CheckResult::healthy("")) })
            .add_fn("Slow", || async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(CheckResult::healthy(""))
            });
        let registry = builder.build().unwrap();

        let start = Instant::now();
        let result = registry
            .check_all(&CancellationToken::new(), hints(2, 4))
            .await
            .unwrap();

        assert!(start.elapsed() >= Duration::from_secs(2));
        assert!(start.elapsed() < Duration::from_secs(30));
        assert_eq!(result.entries["Fast"].status, HealthStatus::Healthy);
        assert_eq!(result.entries["Slow"].status, HealthStatus::Unhealthy);
        assert_eq!(result.entries["Slow"].description, "Health check timed out");
    }

    #[tokio::test(start_paused = true)]
    async fn test_parallelism_is_bounded() {
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut builder = HealthCheckRegistry::builder();
        for i in 0..6 {
            let running = running.clone();
            let peak = peak.clone();
            builder.add_fn(format!("check-{}", i), move || {
                let running = running.clone();
                let peak = peak.clone();
                async move {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    running.fetch_sub(1, Ordering::SeqCst);
                    Ok(CheckResult::healthy(""))
                }
            });
        }
        let registry = builder.build().unwrap();

        let result = registry
            .check_all(&CancellationToken::new(), hints(10, 2))
            .await
            .unwrap();

        assert_eq!(result.entries.len(), 6);
        assert_eq!(peak.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_cancelled_probe_returns_cancelled() {
        let mut builder = HealthCheckRegistry::builder();
        builder.add_fn("Hanging", || async {
            futures::future::pending::<()>().await;
            Ok(CheckResult::healthy(""))
        });
        let registry = builder.build().unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = registry.check_all(&cancel, hints(10, 4)).await.unwrap_err();
        assert!(matches!(err, ProbeError::Cancelled));
    }

    #[tokio::test]
    async fn test_zero_parallelism_is_rejected() {
        let registry = HealthCheckRegistry::builder().build().unwrap();
        let err = registry
            .check_all(&CancellationToken::new(), hints(10, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, ProbeError::InvalidHint(_)));
    }

    #[tokio::test]
    async fn test_panicking_check_is_reported_unhealthy() {
        let mut builder = HealthCheckRegistry::builder();
        builder
            .add_fn("SQL:MainDb", || async { Ok(CheckResult::healthy("connected")) })
            .add_fn("Redis:Cache", || async {
                if true {
                    panic!("driver bug");
                }
                Ok(CheckResult::healthy(""))
            });
        let registry = builder.build().unwrap();

        let result = registry
            .check_all(&CancellationToken::new(), hints(10, 4))
            .await
            .unwrap();

        assert_eq!(result.status, HealthStatus::Unhealthy);
        assert_eq!(result.entries["SQL:MainDb"].status, HealthStatus::Healthy);
        let redis = &result.entries["Redis:Cache"];
        assert_eq!(redis.status, HealthStatus::Unhealthy);
        assert_eq!(redis.description, "Health check panicked");
        assert_eq!(redis.failure_message(), "driver bug");
    }

    #[tokio::test]
    async fn test_huge_timeout_runs_checks_unbounded() {
        let mut builder = HealthCheckRegistry::builder();
        builder.add_fn("SQL:MainDb", || async { Ok(CheckResult::healthy("connected")) });
        let registry = builder.build().unwrap();

        let result = registry
            .check_all(&CancellationToken::new(), hints(u64::MAX, 4))
            .await
            .unwrap();

        assert_eq!(result.status, HealthStatus::Healthy);
        assert_eq!(result.entries["SQL:MainDb"].description, "connected");
    }

    #[test]
    fn test_builder_rejects_duplicate_and_empty_names() {
        let mut builder = HealthCheckRegistry::builder();
        builder
            .add_fn("SQL:MainDb", || async { Ok(CheckResult::healthy("")) })
            .add_fn("SQL:MainDb", || async { Ok(CheckResult::healthy("")) });
        assert_eq!(
            builder.build().err(),
            Some(RegistrationError::DuplicateName("SQL:MainDb".to_string()))
        );

        let mut builder = HealthCheckRegistry::builder();
        builder.add_fn("  ", || async { Ok(CheckResult::healthy("")) });
        assert_eq!(builder.build().err(), Some(RegistrationError::EmptyName));
    }
}
