// src/health/prober.rs
use crate::health::AggregateResult;
use async_trait::async_trait;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Advisory bounds handed to a prober on every attempt. A prober may ignore
/// hints it cannot honor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeHints {
    pub timeout: Duration,
    pub max_parallelism: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("Health probe cancelled")]
    Cancelled,

    #[error("Invalid probe hint: {0}")]
    InvalidHint(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Runs every registered check and folds the outcomes into one result.
///
/// An `Err` is a fault of the prober itself, not an unhealthy dependency;
/// unhealthy dependencies are reported through the returned result.
#[async_trait]
pub trait AggregateProber: Send + Sync {
    async fn check_all(
        &self,
        cancel: &CancellationToken,
        hints: ProbeHints,
    ) -> Result<AggregateResult, ProbeError>;
}
