// src/main.rs
use anyhow::{Context, Result};
use startup_gate::{
    config::{self, RunnerConfig},
    health::build_check,
    CancellationToken, StartupError, StartupGate,
};
use std::process::ExitCode;
use tokio::signal;
use tracing::{debug, error, info, warn};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("startup_gate=info".parse()?)
                .add_directive("reqwest=warn".parse()?),
        )
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "startup-gate.yaml".to_string());

    info!("Loading configuration from: {}", config_path);
    let gate_config = config::load_config(&config_path).await?;
    let env_overrides = config::load_env_overrides(config::ENV_PREFIX)?;

    let runner_config = RunnerConfig::default().merged(&gate_config.runner.overlay(env_overrides));
    runner_config
        .validate()
        .context("Invalid runner configuration")?;

    let checks = gate_config
        .checks
        .iter()
        .map(|check| {
            build_check(check)
                .map(|built| (check.name().to_string(), built))
                .with_context(|| format!("Failed to build check {}", check.name()))
        })
        .collect::<Result<Vec<_>>>()?;

    if checks.is_empty() {
        warn!("No checks configured; startup will pass trivially");
    }

    let gate = StartupGate::with_checks(|hc| {
        for (name, check) in checks {
            hc.add_shared(name, check);
        }
    })?;

    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_signal(cancel.clone()));

    match gate.validate_startup(Some(runner_config), Some(cancel)).await {
        Ok(()) => {
            info!("Dependencies ready");
            Ok(ExitCode::SUCCESS)
        }
        Err(e) if e.is_cancelled() => {
            warn!("{}", e);
            Ok(ExitCode::from(130))
        }
        Err(e) => {
            error!("{}", e);
            if let StartupError::Unhealthy { report, .. } = &e {
                let failing: Vec<&str> = report.failing().iter().map(|o| o.name.as_str()).collect();
                error!(checks = ?failing, "Dependencies not ready");
                debug!(report = %serde_json::to_string(report)?, "Final health report");
            }
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn cancel_on_signal(cancel: CancellationToken) {
    if let Err(e) = signal::ctrl_c().await {
        error!("Failed to install Ctrl+C handler: {}", e);
        return;
    }

    info!("Shutdown signal received, cancelling startup validation");
    cancel.cancel();
}
