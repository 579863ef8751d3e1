//! The event poll loop.
//!
//! # Startup
//! Check connectivity (`eth_chainId`, `eth_blockNumber`), compute the event
//! topic, and place the cursor at the current head. Failure here is fatal.
//!
//! # Steady state
//! Every `poll_interval`:
//!   - query the head
//!   - fetch logs for `[cursor, head]`
//!   - decode and emit each log in node order, skipping the ones that fail
//!   - move the cursor to `head + 1`
//!
//! A failed head query or log fetch leaves the cursor where it was, so the
//! same range is requested again on the next iteration.

use std::sync::Arc;
use std::time::Duration;

use chainwatch_core::config::WatchConfig;
use chainwatch_core::cursor::Cursor;
use chainwatch_core::error::WatchError;
use chainwatch_core::sink::EventSink;
use chainwatch_core::types::{EventRecord, LogEntry, LogFilter, RawLog};

use crate::decoder::decode_color_changed;
use crate::fetcher::{EvmFetcher, EvmRpcClient};
use crate::topic::{keccak256_signature, Topic};

/// Outcome of one successful poll iteration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollReport {
    /// Inclusive range scanned, or `None` if the head had not moved past the cursor.
    pub range: Option<(u64, u64)>,
    /// Logs returned by the node.
    pub fetched: usize,
    /// Events handed to the sink successfully.
    pub emitted: usize,
    /// Logs that failed to decode, including entries in an unexpected shape.
    pub decode_failures: usize,
    /// Logs skipped because they were removed or outside the filter.
    pub skipped: usize,
    /// Decoded events the sink rejected.
    pub sink_failures: usize,
}

/// Polls one contract for one event and forwards decoded events to a sink.
pub struct EventPoller<C> {
    fetcher: EvmFetcher<C>,
    filter: LogFilter,
    topic: Topic,
    cursor: Cursor,
    sink: Arc<dyn EventSink>,
    poll_interval: Duration,
}

impl<C: EvmRpcClient> EventPoller<C> {
    /// Validate `config`, check the node is reachable and start at its current head.
    pub async fn connect(
        client: C,
        config: &WatchConfig,
        sink: Arc<dyn EventSink>,
    ) -> Result<Self, WatchError> {
        config.validate()?;

        let topic = keccak256_signature(&config.event_signature);
        let fetcher = EvmFetcher::new(client, config.request_timeout(), config.max_block_range);

        let chain_id = fetcher.chain_id().await.map_err(startup_error)?;
        if let Some(expected) = config.chain_id {
            if expected != chain_id {
                tracing::warn!(expected, reported = chain_id, "node reports a different chain id");
            }
        }
        let head = fetcher.head_block_number().await.map_err(startup_error)?;

        tracing::info!(
            chain_id,
            head,
            contract = %config.contract_address,
            signature = %config.event_signature,
            topic = %topic,
            "connected to node"
        );

        Ok(Self {
            fetcher,
            filter: LogFilter::new(config.contract_address.to_ascii_lowercase(), topic.as_hex()),
            topic,
            cursor: Cursor::new(head),
            sink,
            poll_interval: config.poll_interval(),
        })
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn topic(&self) -> &Topic {
        &self.topic
    }

    pub fn filter(&self) -> &LogFilter {
        &self.filter
    }

    /// Run one iteration. On error the cursor is unchanged.
    pub async fn poll_once(&mut self) -> Result<PollReport, WatchError> {
        let head = self.fetcher.head_block_number().await?;

        let Some((from, to)) = self.cursor.pending_range(head) else {
            tracing::debug!(head, next = self.cursor.next_block(), "no new blocks");
            return Ok(PollReport::default());
        };

        let logs = self.fetcher.logs(from, to, &self.filter).await?;

        let mut report = PollReport {
            range: Some((from, to)),
            fetched: logs.len(),
            ..Default::default()
        };
        for entry in &logs {
            self.handle_entry(entry, &mut report).await;
        }

        self.cursor.advance_past(to);
        Ok(report)
    }

    /// `poll_once`, logging instead of returning the error.
    pub async fn tick(&mut self) -> Option<PollReport> {
        match self.poll_once().await {
            Ok(report) => {
                if let Some((from, to)) = report.range {
                    tracing::debug!(
                        from,
                        to,
                        fetched = report.fetched,
                        emitted = report.emitted,
                        decode_failures = report.decode_failures,
                        "poll complete"
                    );
                }
                Some(report)
            }
            Err(e) if e.is_transient() => {
                tracing::warn!(
                    next = self.cursor.next_block(),
                    error = %e,
                    "poll failed, range will be retried"
                );
                None
            }
            Err(e) => {
                tracing::error!(
                    next = self.cursor.next_block(),
                    error = %e,
                    "poll failed with a non-transient error, range will be retried"
                );
                None
            }
        }
    }

    /// Poll forever.
    pub async fn run(&mut self) {
        tracing::info!(
            next = self.cursor.next_block(),
            interval_ms = self.poll_interval.as_millis() as u64,
            "listening for events"
        );
        loop {
            self.tick().await;
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn handle_entry(&self, entry: &LogEntry, report: &mut PollReport) {
        match entry {
            Ok(log) => self.handle_log(log, report).await,
            Err(e) => {
                tracing::warn!(error = %e, "malformed log entry, skipping");
                report.decode_failures += 1;
            }
        }
    }

    async fn handle_log(&self, log: &RawLog, report: &mut PollReport) {
        if log.is_removed() || !self.filter.matches(log) {
            tracing::warn!(
                address = %log.address,
                tx = log.tx_hash.as_deref().unwrap_or("?"),
                removed = log.is_removed(),
                "skipping log outside the filter"
            );
            report.skipped += 1;
            return;
        }

        let event = match decode_color_changed(log, &self.topic) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(
                    block = log.block_number_u64(),
                    tx = log.tx_hash.as_deref().unwrap_or("?"),
                    log_index = log.log_index_u64(),
                    error = %e,
                    "failed to decode log, skipping"
                );
                report.decode_failures += 1;
                return;
            }
        };

        let record = EventRecord::from_log(log, event);
        match self.sink.emit(&record).await {
            Ok(()) => report.emitted += 1,
            Err(e) => {
                tracing::error!(
                    sink = self.sink.name(),
                    token_id = %record.event.token_id,
                    error = %e,
                    "failed to emit event"
                );
                report.sink_failures += 1;
            }
        }
    }
}

fn startup_error(err: WatchError) -> WatchError {
    WatchError::Startup {
        reason: err.to_string(),
    }
}
