// src/startup/gate.rs
use crate::config::RunnerConfig;
use crate::health::{HealthCheckRegistry, HealthChecksBuilder, RegistrationError};
use crate::notice::NoticeSink;
use crate::retry::{StartupError, StartupRunner};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Registered startup checks plus the runner that validates them.
///
/// Build it once during bootstrap, call [`StartupGate::validate_startup`]
/// before accepting traffic, and abort startup on `Err`.
pub struct StartupGate {
    registry: Arc<HealthCheckRegistry>,
    runner: StartupRunner,
}

impl StartupGate {
    /// Register checks through a configuration callback.
    pub fn with_checks<F>(configure: F) -> Result<Self, RegistrationError>
    where
        F: FnOnce(&mut HealthChecksBuilder),
    {
        let mut builder = HealthCheckRegistry::builder();
        configure(&mut builder);
        let registry = Arc::new(builder.build()?);

        info!(checks = ?registry.names(), "Registered startup health checks");

        Ok(Self {
            runner: StartupRunner::new(registry.clone()),
            registry,
        })
    }

    /// Route notices to `sink` instead of `tracing`.
    pub fn with_sink(mut self, sink: Arc<dyn NoticeSink>) -> Self {
        self.runner = self.runner.with_sink(sink);
        self
    }

    pub fn registry(&self) -> &HealthCheckRegistry {
        &self.registry
    }

    /// Run the retry loop once. `Ok` means every dependency is ready.
    pub async fn validate_startup(
        &self,
        config: Option<RunnerConfig>,
        cancel: Option<CancellationToken>,
    ) -> Result<(), StartupError> {
        let cancel = cancel.unwrap_or_default();
        self.runner.run(config, &cancel).await
    }
}
