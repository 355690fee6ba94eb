// src/config/mod.rs
mod models;

pub use models::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Prefix for environment overrides, e.g. `STARTUP_GATE_RETRY_COUNT`.
pub const ENV_PREFIX: &str = "STARTUP_GATE";

/// Load configuration from a file (YAML or JSON)
pub async fn load_config<P: AsRef<Path>>(path: P) -> Result<GateConfig> {
    let path = path.as_ref();
    let contents = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read config file {}", path.display()))?;

    let config = parse_config(path, &contents)?;
    config.validate()?;
    Ok(config)
}

fn parse_config(path: &Path, contents: &str) -> Result<GateConfig> {
    let extension = path.extension().and_then(|s| s.to_str());

    let config: GateConfig = if extension == Some("yaml") || extension == Some("yml") {
        serde_yaml::from_str(contents).context("Failed to parse YAML config")?
    } else {
        serde_json::from_str(contents).context("Failed to parse JSON config")?
    };

    Ok(config)
}

/// Read runner overrides from environment variables under `prefix`.
pub fn load_env_overrides(prefix: &str) -> Result<RunnerOverrides> {
    let overrides = ::config::Config::builder()
        .add_source(::config::Environment::with_prefix(prefix).try_parsing(true))
        .build()
        .context("Failed to read environment overrides")?
        .try_deserialize::<RunnerOverrides>()
        .context("Failed to parse environment overrides")?;

    Ok(overrides)
}
