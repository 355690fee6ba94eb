// src/lib.rs
//! Gate application startup on the readiness of external dependencies.
//!
//! Register named checks, then run [`StartupGate::validate_startup`] before
//! serving traffic: every registered check is probed, the whole set is
//! retried with a fixed delay up to the configured attempt budget, and a
//! per-check diagnostic report is emitted when the budget runs out.

pub mod config;
pub mod health;
pub mod notice;
pub mod retry;
pub mod startup;

pub use config::{RunnerConfig, RunnerOverrides};
pub use health::{AggregateProber, AggregateResult, CheckOutcome, CheckResult, HealthCheck, HealthStatus};
pub use notice::{MemorySink, NoticeSink, TracingSink};
pub use retry::{StartupError, StartupRunner};
pub use startup::StartupGate;
pub use tokio_util::sync::CancellationToken;
