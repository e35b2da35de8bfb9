//! # Post-deployment Health Checking
//!
//! Repeated polling of deployed surfaces with bounded retries and a fixed
//! delay between attempts. An endpoint is healthy iff any attempt within the
//! budget succeeds. Every endpoint is evaluated — no short-circuit on the
//! first unhealthy one — because a partial rollout is diagnosed from the
//! complete list of failing surfaces.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// A deployed surface to verify
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub name: String,
    pub url: String,
}

/// Pluggable probe against one endpoint
#[async_trait]
pub trait HealthProbe: Send + Sync {
    /// Ok when the endpoint responded healthy, Err with a diagnostic otherwise
    async fn probe(&self, endpoint: &Endpoint) -> Result<(), String>;
}

/// HTTP GET probe; any 2xx response is healthy
pub struct HttpProbe {
    client: reqwest::Client,
}

impl HttpProbe {
    pub fn new(timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self { client }
    }
}

#[async_trait]
impl HealthProbe for HttpProbe {
    async fn probe(&self, endpoint: &Endpoint) -> Result<(), String> {
        let response = self
            .client
            .get(&endpoint.url)
            .send()
            .await
            .map_err(|e| format!("request failed: {e}"))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(format!("unexpected status {}", response.status()))
        }
    }
}

/// Health verdict for one endpoint, with the attempt count actually spent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointHealth {
    pub endpoint: String,
    pub healthy: bool,
    pub attempts: u32,
    pub last_error: Option<String>,
}

/// Aggregate result of a health-check pass
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HealthReport {
    pub results: Vec<EndpointHealth>,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.results.iter().all(|r| r.healthy)
    }

    /// Every endpoint that stayed unhealthy after exhausting its budget
    pub fn unhealthy(&self) -> Vec<&EndpointHealth> {
        self.results.iter().filter(|r| !r.healthy).collect()
    }
}

/// Poller with a bounded retry budget per endpoint
pub struct HealthChecker {
    probe: Arc<dyn HealthProbe>,
    max_retries: u32,
    retry_delay: Duration,
}

impl HealthChecker {
    pub fn new(probe: Arc<dyn HealthProbe>, max_retries: u32, retry_delay: Duration) -> Self {
        Self {
            probe,
            max_retries: max_retries.max(1),
            retry_delay,
        }
    }

    /// Probe every endpoint up to `max_retries` times with `retry_delay`
    /// between attempts
    pub async fn check_all(&self, endpoints: &[Endpoint]) -> HealthReport {
        let mut report = HealthReport::default();

        for endpoint in endpoints {
            report.results.push(self.check_endpoint(endpoint).await);
        }

        let unhealthy = report.unhealthy().len();
        if unhealthy == 0 {
            info!(endpoints = endpoints.len(), "💚 All endpoints healthy");
        } else {
            warn!(
                endpoints = endpoints.len(),
                unhealthy,
                "Health check found unhealthy endpoints"
            );
        }
        report
    }

    async fn check_endpoint(&self, endpoint: &Endpoint) -> EndpointHealth {
        let mut last_error = None;

        for attempt in 1..=self.max_retries {
            debug!(
                endpoint = %endpoint.name,
                attempt,
                max_retries = self.max_retries,
                "Probing endpoint"
            );

            match self.probe.probe(endpoint).await {
                Ok(()) => {
                    return EndpointHealth {
                        endpoint: endpoint.name.clone(),
                        healthy: true,
                        attempts: attempt,
                        last_error: None,
                    };
                }
                Err(detail) => {
                    last_error = Some(detail);
                    if attempt < self.max_retries {
                        tokio::time::sleep(self.retry_delay).await;
                    }
                }
            }
        }

        EndpointHealth {
            endpoint: endpoint.name.clone(),
            healthy: false,
            attempts: self.max_retries,
            last_error,
        }
    }
}
