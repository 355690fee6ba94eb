// src/retry/runner.rs

use crate::config::{ConfigError, RunnerConfig};
use crate::health::{AggregateProber, AggregateResult, ProbeError};
use crate::notice::{DiagnosticRecord, Notice, NoticeSink, TracingSink};
use std::sync::Arc;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info_span, Instrument};
use uuid::Uuid;

/// Terminal failure of one startup validation run. Every variant means the
/// host must not start serving.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("Startup health check failed after {attempts} attempts. Application cannot start.")]
    Unhealthy {
        attempts: u32,
        report: Box<AggregateResult>,
    },

    #[error("Health prober failed on attempt {attempt}")]
    ProbeFault {
        attempt: u32,
        #[source]
        source: ProbeError,
    },

    #[error("Startup validation cancelled during attempt {attempt}")]
    Cancelled { attempt: u32 },

    #[error("Invalid runner configuration: {0}")]
    InvalidConfig(#[from] ConfigError),
}

impl StartupError {
    /// The last aggregate result, when the run ended because the budget
    /// was exhausted.
    pub fn report(&self) -> Option<&AggregateResult> {
        match self {
            StartupError::Unhealthy { report, .. } => Some(report.as_ref()),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, StartupError::Cancelled { .. })
    }
}

/// Drives the aggregate prober through a bounded, fixed-delay retry loop.
///
/// Holds no per-run state, so one runner can serve concurrent or repeated
/// runs.
#[derive(Clone)]
pub struct StartupRunner {
    prober: Arc<dyn AggregateProber>,
    sink: Arc<dyn NoticeSink>,
}

impl StartupRunner {
    pub fn new(prober: Arc<dyn AggregateProber>) -> Self {
        Self {
            prober,
            sink: Arc::new(TracingSink),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn NoticeSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Probe until every dependency is healthy or the attempt budget runs
    /// out. `None` runs with [`RunnerConfig::default`].
    pub async fn run(
        &self,
        config: Option<RunnerConfig>,
        cancel: &CancellationToken,
    ) -> Result<(), StartupError> {
        let config = config.unwrap_or_default();
        config.validate()?;

        let span = info_span!(
            "startup_validation",
            run_id = %Uuid::new_v4(),
            retry_count = config.retry_count,
        );

        self.run_attempts(&config, cancel).instrument(span).await
    }

    async fn run_attempts(
        &self,
        config: &RunnerConfig,
        cancel: &CancellationToken,
    ) -> Result<(), StartupError> {
        let hints = config.hints();
        let mut attempt = 0;

        loop {
            attempt += 1;
            debug!(attempt, "Probing dependencies");

            let probed = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(StartupError::Cancelled { attempt }),
                probed = self.prober.check_all(cancel, hints) => probed,
            };

            let result = match probed {
                Ok(result) => result,
                Err(ProbeError::Cancelled) => return Err(StartupError::Cancelled { attempt }),
                Err(source) => {
                    self.sink.notice(&Notice::ProbeFault {
                        attempt,
                        error: source.to_string(),
                    });
                    return Err(StartupError::ProbeFault { attempt, source });
                }
            };

            if result.is_healthy() {
                self.sink.notice(&Notice::AllHealthy { attempt });
                return Ok(());
            }

            if attempt < config.retry_count {
                self.sink.notice(&Notice::Retrying {
                    attempt,
                    retry_count: config.retry_count,
                    delay: config.delay(),
                    status: result.status,
                });

                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(StartupError::Cancelled { attempt }),
                    _ = sleep(config.delay()) => {}
                }
            } else {
                self.sink.notice(&Notice::Exhausted {
                    retry_count: config.retry_count,
                });

                let mut names: Vec<&String> = result.entries.keys().collect();
                names.sort();
                for name in names {
                    self.sink.diagnostic(&DiagnosticRecord::from(&result.entries[name]));
                }

                return Err(StartupError::Unhealthy {
                    attempts: attempt,
                    report: Box::new(result),
                });
            }
        }
    }
}
