// src/notice/sink.rs
use crate::health::{CheckOutcome, HealthStatus};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tracing::{error, info};

/// Progress events emitted by the startup runner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    AllHealthy {
        attempt: u32,
    },
    Retrying {
        attempt: u32,
        retry_count: u32,
        delay: Duration,
        status: HealthStatus,
    },
    Exhausted {
        retry_count: u32,
    },
    ProbeFault {
        attempt: u32,
        error: String,
    },
}

/// One line of the failure report: the state of a single check on the
/// final attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticRecord {
    pub name: String,
    pub status: HealthStatus,
    pub description: String,
    pub failure_message: String,
    pub failure_trace: String,
}

impl From<&CheckOutcome> for DiagnosticRecord {
    fn from(outcome: &CheckOutcome) -> Self {
        Self {
            name: outcome.name.clone(),
            status: outcome.status,
            description: outcome.description.clone(),
            failure_message: outcome.failure_message().to_string(),
            failure_trace: outcome.failure_trace().to_string(),
        }
    }
}

/// Where the runner reports progress. Implementations must not panic; the
/// runner's terminal outcome does not depend on them.
pub trait NoticeSink: Send + Sync {
    fn notice(&self, notice: &Notice);

    fn diagnostic(&self, record: &DiagnosticRecord);
}

/// Default sink: structured `tracing` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl NoticeSink for TracingSink {
    fn notice(&self, notice: &Notice) {
        match notice {
            Notice::AllHealthy { attempt } => {
                info!(attempt, "All dependencies are healthy");
            }
            Notice::Retrying {
                attempt,
                retry_count,
                delay,
                status,
            } => {
                info!(
                    attempt,
                    retry_count,
                    status = %status,
                    "Attempt {}/{} failed. Retrying in {}s...",
                    attempt,
                    retry_count,
                    delay.as_secs()
                );
            }
            Notice::Exhausted { retry_count } => {
                error!(
                    retry_count,
                    "Startup health check failed after {} attempts. Application cannot start.",
                    retry_count
                );
            }
            Notice::ProbeFault { attempt, error } => {
                error!(attempt, error = %error, "Health prober failed");
            }
        }
    }

    fn diagnostic(&self, record: &DiagnosticRecord) {
        error!(
            check = %record.name,
            status = %record.status,
            description = %record.description,
            failure_message = %record.failure_message,
            failure_trace = %record.failure_trace,
            "Dependency not ready"
        );
    }
}

/// Keeps every notice and diagnostic in memory, in emission order.
#[derive(Debug, Default)]
pub struct MemorySink {
    notices: Mutex<Vec<Notice>>,
    diagnostics: Mutex<Vec<DiagnosticRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> Vec<Notice> {
        lock(&self.notices).clone()
    }

    pub fn diagnostics(&self) -> Vec<DiagnosticRecord> {
        lock(&self.diagnostics).clone()
    }

    pub fn retrying_count(&self) -> usize {
        lock(&self.notices)
            .iter()
            .filter(|n| matches!(n, Notice::Retrying { .. }))
            .count()
    }
}

impl NoticeSink for MemorySink {
    fn notice(&self, notice: &Notice) {
        lock(&self.notices).push(notice.clone());
    }

    fn diagnostic(&self, record: &DiagnosticRecord) {
        lock(&self.diagnostics).push(record.clone());
    }
}

// A poisoned lock still holds valid records.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
