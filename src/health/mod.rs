// src/health/mod.rs
mod check;
mod checker;
mod prober;
mod probes;
mod status;

pub use check::{FnCheck, HealthCheck};
pub use checker::{HealthCheckRegistry, HealthChecksBuilder, RegistrationError};
pub use prober::{AggregateProber, ProbeError, ProbeHints};
pub use probes::{build_check, HttpCheck, TcpCheck};
pub use status::{AggregateResult, CheckOutcome, CheckResult, FailureCause, HealthStatus};
