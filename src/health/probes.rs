// src/health/probes.rs
use crate::config::CheckConfig;
use crate::health::{CheckResult, HealthCheck};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use url::Url;

/// GETs an endpoint; any 2xx response is healthy.
pub struct HttpCheck {
    url: Url,
    client: Client,
}

impl HttpCheck {
    pub fn new(url: Url, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder().user_agent("startup-gate-health-check");
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().context("Failed to create HTTP client")?;

        Ok(Self { url, client })
    }
}

#[async_trait]
impl HealthCheck for HttpCheck {
    async fn check(&self) -> Result<CheckResult> {
        let response = self
            .client
            .get(self.url.as_str())
            .send()
            .await
            .with_context(|| format!("GET {} failed", self.url))?;

        let status = response.status();
        if status.is_success() {
            Ok(CheckResult::healthy(format!("HTTP {}", status)))
        } else {
            Ok(CheckResult::unhealthy(format!("HTTP {}", status)))
        }
    }
}

/// Opens a TCP connection; a completed handshake is healthy.
///
/// Enough to gate on databases and caches whose listener is the signal
/// that matters at boot.
pub struct TcpCheck {
    address: String,
}

impl TcpCheck {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
        }
    }
}

#[async_trait]
impl HealthCheck for TcpCheck {
    async fn check(&self) -> Result<CheckResult> {
        TcpStream::connect(&self.address)
            .await
            .with_context(|| format!("TCP connect to {} failed", self.address))?;

        Ok(CheckResult::healthy(format!("Connected to {}", self.address)))
    }
}

/// Instantiate the check described by a config entry.
pub fn build_check(config: &CheckConfig) -> Result<Arc<dyn HealthCheck>> {
    match config {
        CheckConfig::Http {
            url, timeout_secs, ..
        } => {
            let check = HttpCheck::new(url.clone(), timeout_secs.map(Duration::from_secs))?;
            Ok(Arc::new(check))
        }
        CheckConfig::Tcp { address, .. } => Ok(Arc::new(TcpCheck::new(address.clone()))),
    }
}
