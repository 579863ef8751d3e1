//! chainwatch: polls a contract for ColorChanged events.
//!
//! Usage:
//! ```bash
//! rpc=https://testnet-rpc.monad.xyz chainwatch
//! chainwatch --rpc-url http://localhost:8545 --output json --log-level debug
//! ```
//!
//! Runs two independent tasks: the event poller and the health server.

mod config;
mod health;
mod logging;

use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;

use chainwatch_core::StdoutSink;
use chainwatch_evm::{EventPoller, JsonRpcEvmClient};
use chainwatch_rpc::HttpRpcClient;

use crate::config::Args;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logging::init_tracing(&args.log_config());

    if let Err(e) = run(args).await {
        tracing::error!(error = %format!("{e:#}"), "fatal");
        return Err(e);
    }
    Ok(())
}

async fn run(args: Args) -> anyhow::Result<()> {
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        network = args.network_name.as_deref().unwrap_or("unknown"),
        chain_id = ?args.chain_id,
        symbol = args.symbol.as_deref().unwrap_or("?"),
        rpc = %args.rpc_url,
        "starting chainwatch"
    );

    let listener = health::bind(args.health_addr()).await?;

    let transport =
        HttpRpcClient::new(&args.rpc_url, args.http_config()).context("building RPC client")?;
    let sink = Arc::new(StdoutSink::new(args.output));
    let mut poller = EventPoller::connect(JsonRpcEvmClient::new(transport), &args.watch_config(), sink)
        .await
        .context("connecting to RPC node")?;

    let server = tokio::spawn(health::serve(listener));
    let watcher = tokio::spawn(async move { poller.run().await });

    tokio::select! {
        res = server => match res {
            Ok(Ok(())) => bail!("health server stopped"),
            Ok(Err(e)) => Err(e.context("health server failed")),
            Err(e) => Err(anyhow::Error::new(e).context("health server task panicked")),
        },
        res = watcher => {
            res.context("poller task panicked")?;
            bail!("poller stopped")
        }
        res = tokio::signal::ctrl_c() => {
            res.context("listening for ctrl-c")?;
            tracing::info!("received ctrl-c, shutting down");
            Ok(())
        }
    }
}
