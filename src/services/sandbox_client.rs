use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

use crate::metrics::{SANDBOX_REQUESTS_TOTAL, SANDBOX_REQUEST_DURATION_SECONDS};
use crate::models::submission::{ExecutionOutput, Language};

/// Hard upper bound on one compile + run round trip. The sandbox enforces
/// its own per-run limit; this bound guarantees the caller is never left
/// waiting if the sandbox hangs.
const SANDBOX_TIMEOUT_SECS: u64 = 20;

pub const RUNNER_NOT_CONFIGURED: &str =
    "Code runner is not configured. Executions are disabled on this deployment.";

/// The runner itself could not be reached (not configured, or network
/// failure). Per-run failures such as compile errors and timeouts are
/// regular `ExecutionOutput`s, not this error.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct RunnerUnavailable(pub String);

#[async_trait]
pub trait CodeExecutor: Send + Sync {
    async fn execute(
        &self,
        language: Language,
        source: &str,
        stdin: &str,
    ) -> Result<ExecutionOutput, RunnerUnavailable>;
}

#[derive(Debug, Serialize)]
struct SandboxRequest<'a> {
    language: Language,
    source: &'a str,
    stdin: &'a str,
}

/// HTTP client for the external sandboxed compiler/runner. Stateless; the
/// submitted source is passed through opaquely and never interpreted here.
pub struct SandboxClient {
    http: reqwest::Client,
    base_url: Option<String>,
    api_key: Option<String>,
}

impl SandboxClient {
    pub fn new(base_url: Option<String>, api_key: Option<String>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(Self::timeout_secs()))
            .build()?;

        if base_url.is_none() {
            tracing::warn!("SANDBOX_API_URL not set; code execution will run degraded");
        }

        Ok(Self {
            http,
            base_url,
            api_key,
        })
    }

    fn timeout_secs() -> u64 {
        std::env::var("SANDBOX_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(SANDBOX_TIMEOUT_SECS)
    }
}

#[async_trait]
impl CodeExecutor for SandboxClient {
    async fn execute(
        &self,
        language: Language,
        source: &str,
        stdin: &str,
    ) -> Result<ExecutionOutput, RunnerUnavailable> {
        let Some(base_url) = &self.base_url else {
            SANDBOX_REQUESTS_TOTAL
                .with_label_values(&["unconfigured"])
                .inc();
            return Err(RunnerUnavailable(RUNNER_NOT_CONFIGURED.to_string()));
        };

        let url = format!("{}/v1/execute", base_url.trim_end_matches('/'));
        let body = SandboxRequest {
            language,
            source,
            stdin,
        };

        let mut request = self.http.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.header("x-api-key", key);
        }

        let language_label = match language {
            Language::C => "c",
            Language::Cpp => "cpp",
        };
        let start = std::time::Instant::now();
        let response = request.send().await;
        SANDBOX_REQUEST_DURATION_SECONDS
            .with_label_values(&[language_label])
            .observe(start.elapsed().as_secs_f64());

        let response = match response {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                // Client-side deadline hit; surface as a timed-out run, not
                // a generic failure
                tracing::warn!("Sandbox request timed out after {}s", Self::timeout_secs());
                SANDBOX_REQUESTS_TOTAL.with_label_values(&["timeout"]).inc();
                return Ok(ExecutionOutput::timed_out(
                    "Execution timed out before the runner responded",
                ));
            }
            Err(e) => {
                tracing::error!("Failed to reach code runner at {}: {}", url, e);
                SANDBOX_REQUESTS_TOTAL.with_label_values(&["error"]).inc();
                return Err(RunnerUnavailable(
                    "Code runner is unreachable. Please try again later.".to_string(),
                ));
            }
        };

        if !response.status().is_success() {
            tracing::error!("Code runner returned status {}", response.status());
            SANDBOX_REQUESTS_TOTAL.with_label_values(&["error"]).inc();
            return Ok(ExecutionOutput::failure(format!(
                "Code runner returned status {}",
                response.status()
            )));
        }

        match response.json::<ExecutionOutput>().await {
            Ok(output) => {
                SANDBOX_REQUESTS_TOTAL.with_label_values(&["ok"]).inc();
                Ok(output)
            }
            Err(e) => {
                // Malformed runner response is a failed run, not a crash
                tracing::error!("Failed to decode runner response: {}", e);
                SANDBOX_REQUESTS_TOTAL
                    .with_label_values(&["malformed"])
                    .inc();
                Ok(ExecutionOutput::failure(
                    "Code runner returned an unreadable response",
                ))
            }
        }
    }
}
