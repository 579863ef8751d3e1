//! Command-line and environment configuration.

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use chainwatch_core::config::{WatchConfig, COLOR_CHANGED_SIGNATURE, DEFAULT_CONTRACT_ADDRESS};
use chainwatch_core::OutputFormat;
use chainwatch_rpc::{HttpClientConfig, RetryConfig};
use clap::Parser;

use crate::logging::LogConfig;

#[derive(Debug, Parser)]
#[command(
    name = "chainwatch",
    about = "Watch a contract for ColorChanged events",
    long_about = "
Polls an EVM JSON-RPC node for ColorChanged(uint256,uint8,uint8,uint8) logs
emitted by one contract and prints one line per event. Serves GET / on
HOST:PORT for liveness probes.

ENVIRONMENT VARIABLES:
  rpc, networkName, chainID, symbol   deployment settings (rpc is required)
  CONTRACT_ADDRESS, EVENT_SIGNATURE   what to watch
  POLL_INTERVAL_MS, RPC_TIMEOUT_MS, RPC_MAX_RETRIES, MAX_BLOCK_RANGE
  HOST, PORT, LOG_LEVEL, LOG_JSON, OUTPUT_FORMAT
",
    version
)]
pub struct Args {
    /// JSON-RPC endpoint URL
    #[arg(long, env = "rpc")]
    pub rpc_url: String,

    /// Network name, informational
    #[arg(long, env = "networkName")]
    pub network_name: Option<String>,

    /// Expected chain id; a mismatch is logged, not fatal
    #[arg(long, env = "chainID")]
    pub chain_id: Option<u64>,

    /// Native currency symbol, informational
    #[arg(long, env = "symbol")]
    pub symbol: Option<String>,

    /// Contract address to watch
    #[arg(long, env = "CONTRACT_ADDRESS", default_value = DEFAULT_CONTRACT_ADDRESS)]
    pub contract: String,

    /// Canonical event signature
    #[arg(long, env = "EVENT_SIGNATURE", default_value = COLOR_CHANGED_SIGNATURE)]
    pub event_signature: String,

    /// Delay between polls (ms)
    #[arg(long, env = "POLL_INTERVAL_MS", default_value_t = 2000)]
    pub poll_interval_ms: u64,

    /// Timeout for one HTTP attempt (ms); a call may retry within its budget
    #[arg(long, env = "RPC_TIMEOUT_MS", default_value_t = 10_000)]
    pub rpc_timeout_ms: u64,

    /// Transport-level retries for transient RPC failures
    #[arg(long, env = "RPC_MAX_RETRIES", default_value_t = 2)]
    pub rpc_max_retries: u32,

    /// Maximum blocks per eth_getLogs request
    #[arg(long, env = "MAX_BLOCK_RANGE", default_value_t = 1000)]
    pub max_block_range: u64,

    /// Health server bind address
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: IpAddr,

    /// Health server port
    #[arg(long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    /// Log level or filter directives, e.g. "info,chainwatch_evm=debug"
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Emit JSON structured logs
    #[arg(long, env = "LOG_JSON")]
    pub log_json: bool,

    /// Event line format: text | json
    #[arg(long, env = "OUTPUT_FORMAT", default_value = "text")]
    pub output: OutputFormat,
}

impl Args {
    /// The poller's per-call bound is the transport's full retry budget, so
    /// timed-out attempts are retried before the call is given up.
    pub fn watch_config(&self) -> WatchConfig {
        let call_budget = self.http_config().call_budget();
        WatchConfig {
            contract_address: self.contract.clone(),
            event_signature: self.event_signature.clone(),
            chain_id: self.chain_id,
            poll_interval_ms: self.poll_interval_ms,
            request_timeout_ms: u64::try_from(call_budget.as_millis()).unwrap_or(u64::MAX),
            max_block_range: self.max_block_range,
        }
    }

    pub fn http_config(&self) -> HttpClientConfig {
        HttpClientConfig {
            retry: RetryConfig {
                max_retries: self.rpc_max_retries,
                ..Default::default()
            },
            request_timeout: Duration::from_millis(self.rpc_timeout_ms),
        }
    }

    pub fn log_config(&self) -> LogConfig {
        LogConfig {
            level: self.log_level.clone(),
            json: self.log_json,
        }
    }

    pub fn health_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}
