//! EVM head and log fetcher.
//!
//! Uses JSON-RPC `eth_chainId`, `eth_blockNumber` and `eth_getLogs`. Every
//! call is bounded by a timeout, and large ranges are split into chunks of at
//! most `max_block_range` blocks.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use chainwatch_core::error::WatchError;
use chainwatch_core::types::{parse_quantity, to_quantity, LogEntry, LogFilter, RawLog};
use chainwatch_rpc::{RpcTransport, TransportError};

/// The node operations the poller needs.
#[async_trait]
pub trait EvmRpcClient: Send + Sync {
    async fn chain_id(&self) -> Result<u64, WatchError>;
    async fn block_number(&self) -> Result<u64, WatchError>;
    async fn get_logs(
        &self,
        from: u64,
        to: u64,
        filter: &LogFilter,
    ) -> Result<Vec<LogEntry>, WatchError>;
}

#[async_trait]
impl<C: EvmRpcClient + ?Sized> EvmRpcClient for Arc<C> {
    async fn chain_id(&self) -> Result<u64, WatchError> {
        (**self).chain_id().await
    }

    async fn block_number(&self) -> Result<u64, WatchError> {
        (**self).block_number().await
    }

    async fn get_logs(
        &self,
        from: u64,
        to: u64,
        filter: &LogFilter,
    ) -> Result<Vec<LogEntry>, WatchError> {
        (**self).get_logs(from, to, filter).await
    }
}

/// `EvmRpcClient` over any JSON-RPC transport.
pub struct JsonRpcEvmClient<T> {
    transport: T,
}

impl<T: RpcTransport> JsonRpcEvmClient<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    async fn quantity(&self, method: &str) -> Result<u64, WatchError> {
        let raw: String = self
            .transport
            .call(method, vec![])
            .await
            .map_err(|e| rpc_error(method, e))?;
        parse_quantity(&raw).ok_or_else(|| {
            WatchError::MalformedResponse(format!("{method} returned '{raw}', expected hex quantity"))
        })
    }
}

#[async_trait]
impl<T: RpcTransport> EvmRpcClient for JsonRpcEvmClient<T> {
    async fn chain_id(&self) -> Result<u64, WatchError> {
        self.quantity("eth_chainId").await
    }

    async fn block_number(&self) -> Result<u64, WatchError> {
        self.quantity("eth_blockNumber").await
    }

    async fn get_logs(
        &self,
        from: u64,
        to: u64,
        filter: &LogFilter,
    ) -> Result<Vec<LogEntry>, WatchError> {
        // Entries are converted one at a time so a single malformed object
        // does not fail the whole range.
        let entries: Vec<Value> = self
            .transport
            .call("eth_getLogs", vec![log_params(from, to, filter)])
            .await
            .map_err(|e| rpc_error("eth_getLogs", e))?;
        Ok(entries.into_iter().map(RawLog::from_value).collect())
    }
}

/// The single `eth_getLogs` filter object for `[from, to]`.
pub fn log_params(from: u64, to: u64, filter: &LogFilter) -> Value {
    json!({
        "address": filter.address,
        "topics": [filter.topic0],
        "fromBlock": to_quantity(from),
        "toBlock": to_quantity(to),
    })
}

fn rpc_error(method: &str, err: TransportError) -> WatchError {
    match err {
        TransportError::Timeout { ms } => WatchError::Timeout {
            method: method.to_string(),
            ms,
        },
        TransportError::Deserialization(e) => {
            WatchError::MalformedResponse(format!("{method}: {e}"))
        }
        other => WatchError::Rpc(format!("{method}: {other}")),
    }
}

/// Wraps an `EvmRpcClient` with per-call timeouts and range chunking.
pub struct EvmFetcher<C> {
    client: C,
    timeout: Duration,
    max_range: u64,
}

impl<C: EvmRpcClient> EvmFetcher<C> {
    pub fn new(client: C, timeout: Duration, max_range: u64) -> Self {
        Self {
            client,
            timeout,
            max_range: max_range.max(1),
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub async fn chain_id(&self) -> Result<u64, WatchError> {
        self.bounded("eth_chainId", self.client.chain_id()).await
    }

    /// Fetch the current chain head block number.
    pub async fn head_block_number(&self) -> Result<u64, WatchError> {
        self.bounded("eth_blockNumber", self.client.block_number())
            .await
    }

    /// Fetch all logs in `[from, to]` matching the filter, in node order.
    /// Any failing chunk fails the whole range.
    pub async fn logs(
        &self,
        from: u64,
        to: u64,
        filter: &LogFilter,
    ) -> Result<Vec<LogEntry>, WatchError> {
        if to < from {
            return Ok(vec![]);
        }
        let mut all_logs = Vec::new();
        let mut start = from;
        loop {
            let end = start.saturating_add(self.max_range - 1).min(to);
            let chunk = self
                .bounded("eth_getLogs", self.client.get_logs(start, end, filter))
                .await?;
            tracing::trace!(start, end, logs = chunk.len(), "fetched log chunk");
            all_logs.extend(chunk);
            if end >= to {
                break;
            }
            start = end + 1;
        }
        Ok(all_logs)
    }

    async fn bounded<T>(
        &self,
        method: &str,
        fut: impl Future<Output = Result<T, WatchError>>,
    ) -> Result<T, WatchError> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(WatchError::Timeout {
                method: method.to_string(),
                ms: self.timeout.as_millis() as u64,
            }),
        }
    }
}
