//! Fluent builder API for creating pollers.
//!
//! # Example
//!
//! ```rust,no_run
//! # async fn demo() -> Result<(), chainwatch_core::WatchError> {
//! use std::sync::Arc;
//! use chainwatch_core::{OutputFormat, StdoutSink};
//! use chainwatch_evm::{JsonRpcEvmClient, PollerBuilder};
//! use chainwatch_rpc::{HttpClientConfig, HttpRpcClient};
//!
//! let transport = HttpRpcClient::new("https://rpc.example.org", HttpClientConfig::default())
//!     .map_err(|e| chainwatch_core::WatchError::Startup { reason: e.to_string() })?;
//! let mut poller = PollerBuilder::new()
//!     .contract("0x64376a051E77b7D7181C3DfBb49c3c83e127704b")
//!     .poll_interval_ms(2000)
//!     .connect(
//!         JsonRpcEvmClient::new(transport),
//!         Arc::new(StdoutSink::new(OutputFormat::Text)),
//!     )
//!     .await?;
//! poller.run().await;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use chainwatch_core::config::WatchConfig;
use chainwatch_core::error::WatchError;
use chainwatch_core::sink::EventSink;

use crate::fetcher::EvmRpcClient;
use crate::poller::EventPoller;

/// Fluent builder for `WatchConfig`.
#[derive(Debug, Default)]
pub struct PollerBuilder {
    config: WatchConfig,
}

impl PollerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the contract address to watch.
    pub fn contract(mut self, address: impl Into<String>) -> Self {
        self.config.contract_address = address.into();
        self
    }

    /// Set the canonical event signature.
    pub fn event_signature(mut self, signature: impl Into<String>) -> Self {
        self.config.event_signature = signature.into();
        self
    }

    /// Set the chain id the node is expected to report.
    pub fn chain_id(mut self, chain_id: u64) -> Self {
        self.config.chain_id = Some(chain_id);
        self
    }

    /// Set the delay between poll iterations in milliseconds.
    pub fn poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.poll_interval_ms = ms;
        self
    }

    /// Set the per-call RPC timeout in milliseconds.
    pub fn request_timeout_ms(mut self, ms: u64) -> Self {
        self.config.request_timeout_ms = ms;
        self
    }

    /// Set the number of blocks per `eth_getLogs` request.
    pub fn max_block_range(mut self, blocks: u64) -> Self {
        self.config.max_block_range = blocks;
        self
    }

    /// Build the `WatchConfig`.
    pub fn build_config(self) -> WatchConfig {
        self.config
    }

    /// Build the config and connect a poller with it.
    pub async fn connect<C: EvmRpcClient>(
        self,
        client: C,
        sink: Arc<dyn EventSink>,
    ) -> Result<EventPoller<C>, WatchError> {
        EventPoller::connect(client, &self.config, sink).await
    }
}
