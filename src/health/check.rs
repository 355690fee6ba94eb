// src/health/check.rs
use crate::health::CheckResult;
use async_trait::async_trait;
use std::future::Future;

/// A single named dependency probe.
///
/// Returning `Err` means the check itself could not run (connection refused,
/// bad credentials); the registry reports it as unhealthy and keeps the error
/// as the failure cause.
#[async_trait]
pub trait HealthCheck: Send + Sync {
    async fn check(&self) -> anyhow::Result<CheckResult>;
}

/// Adapts an async closure into a [`HealthCheck`].
pub struct FnCheck<F> {
    f: F,
}

impl<F> FnCheck<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F, Fut> HealthCheck for FnCheck<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<CheckResult>> + Send,
{
    async fn check(&self) -> anyhow::Result<CheckResult> {
        (self.f)().await
    }
}
