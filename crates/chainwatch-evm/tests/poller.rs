//! Poll loop scenarios against a scripted node.
//!
//! Each `Scripted` node answers `eth_blockNumber` and `eth_getLogs` from
//! queues (`None` = the call fails) and records every requested log range.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use alloy_primitives::U256;
use async_trait::async_trait;
use chainwatch_core::config::{WatchConfig, COLOR_CHANGED_SIGNATURE, DEFAULT_CONTRACT_ADDRESS};
use chainwatch_core::error::WatchError;
use chainwatch_core::sink::{EventSink, MemorySink};
use chainwatch_core::types::{EventRecord, LogEntry, LogFilter, RawLog};
use chainwatch_evm::{keccak256_signature, EventPoller, EvmRpcClient, JsonRpcEvmClient, PollReport};
use chainwatch_rpc::{
    HttpClientConfig, HttpRpcClient, JsonRpcRequest, JsonRpcResponse, RetryConfig, RpcTransport,
    TransportError,
};
use serde_json::{json, Value};

// ─── Helpers ──────────────────────────────────────────────────────────────────

#[derive(Default)]
struct Scripted {
    chain_id: Option<u64>,
    heads: Mutex<VecDeque<Option<u64>>>,
    logs: Mutex<VecDeque<Option<Vec<RawLog>>>>,
    ranges: Mutex<Vec<(u64, u64)>>,
}

impl Scripted {
    fn new(heads: Vec<Option<u64>>, logs: Vec<Option<Vec<RawLog>>>) -> Arc<Self> {
        Arc::new(Self {
            chain_id: Some(10143),
            heads: Mutex::new(heads.into()),
            logs: Mutex::new(logs.into()),
            ranges: Mutex::new(vec![]),
        })
    }

    fn ranges(&self) -> Vec<(u64, u64)> {
        self.ranges.lock().unwrap().clone()
    }
}

#[async_trait]
impl EvmRpcClient for Scripted {
    async fn chain_id(&self) -> Result<u64, WatchError> {
        self.chain_id
            .ok_or_else(|| WatchError::Rpc("eth_chainId: connection refused".into()))
    }

    async fn block_number(&self) -> Result<u64, WatchError> {
        match self.heads.lock().unwrap().pop_front() {
            Some(Some(head)) => Ok(head),
            Some(None) => Err(WatchError::Rpc("eth_blockNumber: HTTP 502".into())),
            None => Err(WatchError::Rpc("script exhausted".into())),
        }
    }

    async fn get_logs(
        &self,
        from: u64,
        to: u64,
        _filter: &LogFilter,
    ) -> Result<Vec<LogEntry>, WatchError> {
        self.ranges.lock().unwrap().push((from, to));
        match self.logs.lock().unwrap().pop_front() {
            Some(Some(logs)) => Ok(logs.into_iter().map(Ok).collect()),
            Some(None) => Err(WatchError::Timeout {
                method: "eth_getLogs".into(),
                ms: 10_000,
            }),
            None => Ok(vec![]),
        }
    }
}

fn word(value: u64) -> String {
    format!("{value:064x}")
}

fn color_log(block: u64, log_index: u64, token_id: u64, rgb: [u64; 3]) -> RawLog {
    RawLog {
        address: DEFAULT_CONTRACT_ADDRESS.to_string(),
        topics: vec![
            keccak256_signature(COLOR_CHANGED_SIGNATURE).to_string(),
            format!("0x{}", word(token_id)),
        ],
        data: format!("0x{}{}{}", word(rgb[0]), word(rgb[1]), word(rgb[2])),
        block_number: Some(format!("{block:#x}")),
        block_hash: Some(format!("0x{}", word(block))),
        tx_hash: Some(format!("0x{}", word(block * 100 + log_index))),
        log_index: Some(format!("{log_index:#x}")),
        removed: None,
    }
}

fn config() -> WatchConfig {
    WatchConfig {
        poll_interval_ms: 10,
        request_timeout_ms: 1000,
        ..Default::default()
    }
}

fn token_ids(records: &[EventRecord]) -> Vec<u64> {
    records.iter().map(|r| r.event.token_id.to::<u64>()).collect()
}

async fn connect(
    node: &Arc<Scripted>,
    sink: &Arc<MemorySink>,
) -> EventPoller<Arc<Scripted>> {
    EventPoller::connect(node.clone(), &config(), sink.clone())
        .await
        .expect("startup should succeed")
}

// ─── Startup ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn startup_places_cursor_at_head() {
    let node = Scripted::new(vec![Some(100)], vec![]);
    let sink = Arc::new(MemorySink::new());
    let poller = connect(&node, &sink).await;

    assert_eq!(poller.cursor().next_block(), 100);
    assert_eq!(poller.topic(), &keccak256_signature(COLOR_CHANGED_SIGNATURE));
    assert!(node.ranges().is_empty(), "no backfill at startup");
}

#[tokio::test]
async fn startup_fails_when_head_query_fails() {
    let node = Scripted::new(vec![None], vec![]);
    let sink: Arc<dyn EventSink> = Arc::new(MemorySink::new());
    let err = EventPoller::connect(node, &config(), sink).await.err().unwrap();
    assert!(matches!(err, WatchError::Startup { .. }), "got {err}");
}

#[tokio::test]
async fn startup_fails_when_chain_id_fails() {
    let node = Arc::new(Scripted {
        chain_id: None,
        heads: Mutex::new(vec![Some(1)].into()),
        ..Default::default()
    });
    let sink: Arc<dyn EventSink> = Arc::new(MemorySink::new());
    let err = EventPoller::connect(node, &config(), sink).await.err().unwrap();
    assert!(matches!(err, WatchError::Startup { ref reason } if reason.contains("refused")));
}

#[tokio::test]
async fn startup_fails_for_unreachable_endpoint() {
    let transport = HttpRpcClient::new(
        "http://127.0.0.1:1",
        HttpClientConfig {
            retry: RetryConfig {
                max_retries: 0,
                ..Default::default()
            },
            request_timeout: Duration::from_secs(2),
        },
    )
    .unwrap();
    let sink: Arc<dyn EventSink> = Arc::new(MemorySink::new());
    let err = EventPoller::connect(JsonRpcEvmClient::new(transport), &config(), sink)
        .await
        .err()
        .unwrap();
    assert!(matches!(err, WatchError::Startup { .. }), "got {err}");
}

#[tokio::test]
async fn startup_rejects_invalid_config_before_any_call() {
    let node = Scripted::new(vec![Some(1)], vec![]);
    let bad = WatchConfig {
        contract_address: "not-an-address".into(),
        ..config()
    };
    let sink: Arc<dyn EventSink> = Arc::new(MemorySink::new());
    let err = EventPoller::connect(node.clone(), &bad, sink).await.err().unwrap();
    assert!(matches!(err, WatchError::Config(_)));
    assert_eq!(node.heads.lock().unwrap().len(), 1, "head was not queried");
}

#[tokio::test]
async fn chain_id_mismatch_is_not_fatal() {
    let node = Scripted::new(vec![Some(5)], vec![]);
    let cfg = WatchConfig {
        chain_id: Some(1),
        ..config()
    };
    let sink: Arc<dyn EventSink> = Arc::new(MemorySink::new());
    let poller = EventPoller::connect(node, &cfg, sink).await.unwrap();
    assert_eq!(poller.cursor().next_block(), 5);
}

// ─── Steady state ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn decodes_and_emits_event() {
    let node = Scripted::new(
        vec![Some(100), Some(105)],
        vec![Some(vec![color_log(102, 0, 42, [10, 20, 30])])],
    );
    let sink = Arc::new(MemorySink::new());
    let mut poller = connect(&node, &sink).await;

    let report = poller.poll_once().await.unwrap();
    assert_eq!(report.range, Some((100, 105)));
    assert_eq!(report.emitted, 1);

    let records = sink.records();
    assert_eq!(records.len(), 1);
    let e = records[0].event;
    assert_eq!((e.token_id, e.r, e.g, e.b), (U256::from(42u64), 10, 20, 30));
    assert_eq!(records[0].block_number, Some(102));
    assert_eq!(poller.cursor().next_block(), 106);
}

#[tokio::test]
async fn malformed_log_does_not_block_batch() {
    let mut broken = color_log(101, 1, 2, [0, 0, 0]);
    broken.data = format!("0x{}", word(7)); // one word instead of three

    let node = Scripted::new(
        vec![Some(100), Some(101)],
        vec![Some(vec![
            color_log(100, 0, 1, [1, 1, 1]),
            broken,
            color_log(101, 2, 3, [3, 3, 3]),
        ])],
    );
    let sink = Arc::new(MemorySink::new());
    let mut poller = connect(&node, &sink).await;

    let report = poller.poll_once().await.unwrap();
    assert_eq!(
        report,
        PollReport {
            range: Some((100, 101)),
            fetched: 3,
            emitted: 2,
            decode_failures: 1,
            skipped: 0,
            sink_failures: 0,
        }
    );
    assert_eq!(token_ids(&sink.records()), vec![1, 3]);
}

#[tokio::test]
async fn out_of_range_color_is_a_decode_failure() {
    let node = Scripted::new(
        vec![Some(10), Some(10)],
        vec![Some(vec![color_log(10, 0, 9, [300, 0, 0])])],
    );
    let sink = Arc::new(MemorySink::new());
    let mut poller = connect(&node, &sink).await;

    let report = poller.poll_once().await.unwrap();
    assert_eq!(report.decode_failures, 1);
    assert_eq!(report.emitted, 0);
    assert_eq!(poller.cursor().next_block(), 11);
}

#[tokio::test]
async fn events_are_emitted_in_node_order() {
    let node = Scripted::new(
        vec![Some(1), Some(9)],
        vec![Some(vec![
            color_log(3, 0, 30, [0, 0, 0]),
            color_log(3, 1, 31, [0, 0, 0]),
            color_log(8, 0, 80, [0, 0, 0]),
        ])],
    );
    let sink = Arc::new(MemorySink::new());
    let mut poller = connect(&node, &sink).await;

    poller.poll_once().await.unwrap();
    assert_eq!(token_ids(&sink.records()), vec![30, 31, 80]);
}

#[tokio::test]
async fn empty_range_still_advances_cursor() {
    let node = Scripted::new(vec![Some(100), Some(104)], vec![Some(vec![])]);
    let sink = Arc::new(MemorySink::new());
    let mut poller = connect(&node, &sink).await;

    let report = poller.poll_once().await.unwrap();
    assert_eq!(report.fetched, 0);
    assert_eq!(poller.cursor().next_block(), 105);
}

#[tokio::test]
async fn failed_fetch_retries_same_range() {
    let node = Scripted::new(
        vec![Some(100), Some(105), Some(105)],
        vec![None, Some(vec![color_log(104, 0, 7, [1, 2, 3])])],
    );
    let sink = Arc::new(MemorySink::new());
    let mut poller = connect(&node, &sink).await;

    let err = poller.poll_once().await.unwrap_err();
    assert!(err.is_transient());
    assert_eq!(poller.cursor().next_block(), 100);

    let report = poller.poll_once().await.unwrap();
    assert_eq!(report.emitted, 1);
    assert_eq!(node.ranges(), vec![(100, 105), (100, 105)]);
    assert_eq!(poller.cursor().next_block(), 106);
}

#[tokio::test]
async fn failed_fetch_widens_to_new_head() {
    let node = Scripted::new(vec![Some(100), Some(105), Some(108)], vec![None]);
    let sink = Arc::new(MemorySink::new());
    let mut poller = connect(&node, &sink).await;

    assert!(poller.tick().await.is_none());
    poller.tick().await.unwrap();
    assert_eq!(node.ranges(), vec![(100, 105), (100, 108)]);
}

#[tokio::test]
async fn failed_later_chunk_fails_whole_range() {
    let node = Scripted::new(
        vec![Some(100), Some(125), Some(125)],
        vec![
            Some(vec![color_log(105, 0, 1, [1, 1, 1])]),
            None,
            Some(vec![color_log(105, 0, 1, [1, 1, 1])]),
            Some(vec![]),
            Some(vec![color_log(122, 0, 2, [2, 2, 2])]),
        ],
    );
    let sink = Arc::new(MemorySink::new());
    let cfg = WatchConfig {
        max_block_range: 10,
        ..config()
    };
    let mut poller = EventPoller::connect(node.clone(), &cfg, sink.clone())
        .await
        .unwrap();

    assert!(poller.poll_once().await.is_err());
    assert_eq!(poller.cursor().next_block(), 100);
    assert!(sink.records().is_empty(), "nothing emitted from a partial range");

    let report = poller.poll_once().await.unwrap();
    assert_eq!(report.range, Some((100, 125)));
    assert_eq!(token_ids(&sink.records()), vec![1, 2]);
    assert_eq!(
        node.ranges(),
        vec![(100, 109), (110, 119), (100, 109), (110, 119), (120, 125)]
    );
    assert_eq!(poller.cursor().next_block(), 126);
}

#[tokio::test]
async fn failed_head_query_keeps_cursor() {
    let node = Scripted::new(vec![Some(100), None], vec![]);
    let sink = Arc::new(MemorySink::new());
    let mut poller = connect(&node, &sink).await;

    assert!(poller.tick().await.is_none());
    assert_eq!(poller.cursor().next_block(), 100);
    assert!(node.ranges().is_empty());
}

#[tokio::test]
async fn cursor_is_monotonic_without_gaps() {
    // 108 is a lagging replica answering below the cursor.
    let heads = [100, 103, 103, 110, 108, 115];
    let node = Scripted::new(heads.iter().map(|h| Some(*h)).collect(), vec![]);
    let sink = Arc::new(MemorySink::new());
    let mut poller = connect(&node, &sink).await;

    let mut last = poller.cursor().next_block();
    for _ in 1..heads.len() {
        poller.poll_once().await.unwrap();
        let next = poller.cursor().next_block();
        assert!(next >= last);
        last = next;
    }

    let ranges = node.ranges();
    assert_eq!(ranges, vec![(100, 103), (104, 110), (111, 115)]);
    for pair in ranges.windows(2) {
        assert_eq!(pair[1].0, pair[0].1 + 1, "gap or overlap between {pair:?}");
    }
    assert_eq!(last, 116);
}

#[tokio::test]
async fn removed_and_foreign_logs_are_skipped() {
    let mut removed = color_log(5, 0, 1, [0, 0, 0]);
    removed.removed = Some(true);
    let mut foreign = color_log(5, 1, 2, [0, 0, 0]);
    foreign.address = "0x0000000000000000000000000000000000000001".into();

    let node = Scripted::new(
        vec![Some(5), Some(5)],
        vec![Some(vec![removed, foreign, color_log(5, 2, 3, [0, 0, 0])])],
    );
    let sink = Arc::new(MemorySink::new());
    let mut poller = connect(&node, &sink).await;

    let report = poller.poll_once().await.unwrap();
    assert_eq!(report.skipped, 2);
    assert_eq!(token_ids(&sink.records()), vec![3]);
}

/// Rejects token id 2, accepts everything else.
struct PickySink(MemorySink);

#[async_trait]
impl EventSink for PickySink {
    async fn emit(&self, record: &EventRecord) -> Result<(), WatchError> {
        if record.event.token_id == U256::from(2u64) {
            return Err(WatchError::Sink {
                sink: "picky".into(),
                reason: "rejected".into(),
            });
        }
        self.0.emit(record).await
    }

    fn name(&self) -> &str {
        "picky"
    }
}

#[tokio::test]
async fn sink_failure_does_not_abort_batch() {
    let node = Scripted::new(
        vec![Some(1), Some(2)],
        vec![Some(vec![
            color_log(1, 0, 1, [0, 0, 0]),
            color_log(1, 1, 2, [0, 0, 0]),
            color_log(2, 0, 3, [0, 0, 0]),
        ])],
    );
    let sink = Arc::new(PickySink(MemorySink::new()));
    let mut poller = EventPoller::connect(node, &config(), sink.clone())
        .await
        .unwrap();

    let report = poller.poll_once().await.unwrap();
    assert_eq!(report.emitted, 2);
    assert_eq!(report.sink_failures, 1);
    assert_eq!(token_ids(&sink.0.records()), vec![1, 3]);
    assert_eq!(poller.cursor().next_block(), 3);
}

#[tokio::test]
async fn run_survives_errors() {
    let node = Scripted::new(
        vec![Some(10), None, Some(12), Some(12)],
        vec![None, Some(vec![color_log(11, 0, 5, [9, 9, 9])])],
    );
    let sink = Arc::new(MemorySink::new());
    let mut poller = connect(&node, &sink).await;

    // The loop never returns on its own; stop it once the script is spent.
    let _ = tokio::time::timeout(Duration::from_millis(300), poller.run()).await;

    assert_eq!(token_ids(&sink.records()), vec![5]);
    assert_eq!(node.ranges(), vec![(10, 12), (10, 12)]);
    assert_eq!(poller.cursor().next_block(), 13);
}

// ─── JSON wire ────────────────────────────────────────────────────────────────

/// Answers the three node methods from raw JSON, the way a node would.
struct JsonNode {
    heads: Mutex<VecDeque<u64>>,
    logs: Mutex<VecDeque<Value>>,
}

#[async_trait]
impl RpcTransport for JsonNode {
    async fn send(&self, req: JsonRpcRequest) -> Result<JsonRpcResponse, TransportError> {
        let result = match req.method.as_str() {
            "eth_chainId" => json!("0x279f"),
            "eth_blockNumber" => {
                let head = self.heads.lock().unwrap().pop_front().unwrap_or(u64::MAX);
                json!(format!("{head:#x}"))
            }
            "eth_getLogs" => self.logs.lock().unwrap().pop_front().unwrap_or(json!([])),
            other => panic!("unexpected method {other}"),
        };
        Ok(JsonRpcResponse {
            jsonrpc: "2.0".into(),
            id: req.id,
            result: Some(result),
            error: None,
        })
    }

    fn url(&self) -> &str {
        "json://"
    }
}

#[tokio::test]
async fn malformed_log_object_is_skipped_and_cursor_advances() {
    let good_a = serde_json::to_value(color_log(101, 0, 11, [1, 2, 3])).unwrap();
    let good_b = serde_json::to_value(color_log(102, 0, 12, [4, 5, 6])).unwrap();
    let mut null_data = good_a.clone();
    null_data["data"] = Value::Null;
    let mut numeric_topic = good_a.clone();
    numeric_topic["topics"][1] = json!(7);

    let node = JsonNode {
        heads: Mutex::new(vec![100, 102].into()),
        logs: Mutex::new(vec![json!([good_a, null_data, numeric_topic, good_b])].into()),
    };
    let sink = Arc::new(MemorySink::new());
    let mut poller = EventPoller::connect(JsonRpcEvmClient::new(node), &config(), sink.clone())
        .await
        .unwrap();

    let report = poller.poll_once().await.unwrap();
    assert_eq!(report.fetched, 4);
    assert_eq!(report.emitted, 2);
    assert_eq!(report.decode_failures, 2);
    assert_eq!(token_ids(&sink.records()), vec![11, 12]);
    assert_eq!(poller.cursor().next_block(), 103);
}
