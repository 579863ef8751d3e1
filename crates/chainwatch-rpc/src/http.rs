//! HTTP JSON-RPC client backed by `reqwest`.
//!
//! Every attempt is bounded by `request_timeout`. Transient failures
//! (connection errors, timeouts, 5xx, 429) are retried with exponential
//! backoff; JSON-RPC error objects are returned to the caller untouched.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::TransportError;
use crate::request::{JsonRpcRequest, JsonRpcResponse};
use crate::retry::{RetryConfig, RetryPolicy};
use crate::transport::RpcTransport;

/// Slack on top of the worst case so an outer bound never cuts the last attempt short.
const BUDGET_SLACK: Duration = Duration::from_secs(1);

/// Configuration for `HttpRpcClient`.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    pub retry: RetryConfig,
    /// Limit on a single HTTP attempt.
    pub request_timeout: Duration,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            retry: RetryConfig::default(),
            request_timeout: Duration::from_secs(10),
        }
    }
}

impl HttpClientConfig {
    /// Longest a single `send` can take: every attempt timing out plus every
    /// backoff sleep. Callers that put their own timeout around a call should
    /// use at least this much, or retries on timeout never get to run.
    pub fn call_budget(&self) -> Duration {
        let policy = RetryPolicy::new(self.retry.clone());
        let attempts = policy.max_retries().saturating_add(1);
        self.request_timeout
            .saturating_mul(attempts)
            .saturating_add(policy.total_delay())
            .saturating_add(BUDGET_SLACK)
    }
}

/// HTTP JSON-RPC client.
pub struct HttpRpcClient {
    url: String,
    http: reqwest::Client,
    retry: RetryPolicy,
    request_timeout: Duration,
    next_id: AtomicU64,
}

impl HttpRpcClient {
    /// Create a client for the given JSON-RPC endpoint URL.
    pub fn new(url: impl Into<String>, config: HttpClientConfig) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| TransportError::Build(e.to_string()))?;

        Ok(Self {
            url: url.into(),
            http,
            retry: RetryPolicy::new(config.retry),
            request_timeout: config.request_timeout,
            next_id: AtomicU64::new(1),
        })
    }

    async fn send_once(&self, req: &JsonRpcRequest) -> Result<JsonRpcResponse, TransportError> {
        let resp = self
            .http
            .post(&self.url)
            .json(req)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = resp.bytes().await.map_err(|e| self.classify(e))?;
        Ok(serde_json::from_slice::<JsonRpcResponse>(&bytes)?)
    }

    fn classify(&self, err: reqwest::Error) -> TransportError {
        if err.is_timeout() {
            TransportError::Timeout {
                ms: self.request_timeout.as_millis() as u64,
            }
        } else {
            TransportError::Http(err.to_string())
        }
    }
}

#[async_trait]
impl RpcTransport for HttpRpcClient {
    async fn send(&self, req: JsonRpcRequest) -> Result<JsonRpcResponse, TransportError> {
        let mut retry = 0u32;
        loop {
            let err = match self.send_once(&req).await {
                Ok(resp) => return Ok(resp),
                Err(e) if e.is_retryable() => e,
                Err(e) => return Err(e),
            };
            retry += 1;
            let Some(delay) = self.retry.next_delay(retry) else {
                tracing::debug!(
                    attempts = retry,
                    method = %req.method,
                    error = %err,
                    "retries exhausted"
                );
                return Err(err);
            };
            tracing::warn!(
                retry,
                max_retries = self.retry.max_retries(),
                delay_ms = delay.as_millis() as u64,
                method = %req.method,
                error = %err,
                url = %self.url,
                "retrying request"
            );
            tokio::time::sleep(delay).await;
        }
    }

    fn url(&self) -> &str {
        &self.url
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }
}
