//! chainwatch-core: shared types for the contract log watcher.
//!
//! # Architecture
//!
//! ```text
//! cli → EventPoller (chainwatch-evm)
//!           ├── Cursor        (next unscanned block, monotonic)
//!           ├── EvmFetcher    (eth_blockNumber / eth_getLogs over chainwatch-rpc)
//!           ├── decoder       (ColorChanged topics + data → EventRecord)
//!           └── EventSink     (stdout / memory)
//! ```

pub mod config;
pub mod cursor;
pub mod error;
pub mod sink;
pub mod types;

pub use config::WatchConfig;
pub use cursor::Cursor;
pub use error::{DecodeError, WatchError};
pub use sink::{EventSink, MemorySink, OutputFormat, StdoutSink};
pub use types::{ColorChanged, EventRecord, LogEntry, LogFilter, RawLog};
