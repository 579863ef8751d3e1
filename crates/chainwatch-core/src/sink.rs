//! Output sinks for decoded events.

use std::io::Write;
use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::WatchError;
use crate::types::EventRecord;

/// Destination for decoded events.
///
/// Implement this to forward events somewhere other than stdout.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Called once per decoded event, in log order.
    async fn emit(&self, record: &EventRecord) -> Result<(), WatchError>;

    /// Name used in logs and errors.
    fn name(&self) -> &str;
}

/// Line format for `StdoutSink`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// `ColorChanged: Token ID: 42, RGB: (10, 20, 30) [block …]`
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown output format '{other}' (expected text|json)")),
        }
    }
}

/// Writes one line per event to stdout.
#[derive(Debug, Default)]
pub struct StdoutSink {
    format: OutputFormat,
}

impl StdoutSink {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Render `record` as a single line (without the trailing newline).
    pub fn render(&self, record: &EventRecord) -> Result<String, WatchError> {
        match self.format {
            OutputFormat::Text => Ok(record.to_string()),
            OutputFormat::Json => serde_json::to_string(record).map_err(|e| WatchError::Sink {
                sink: self.name().into(),
                reason: e.to_string(),
            }),
        }
    }
}

#[async_trait]
impl EventSink for StdoutSink {
    async fn emit(&self, record: &EventRecord) -> Result<(), WatchError> {
        let line = self.render(record)?;
        let mut out = std::io::stdout().lock();
        writeln!(out, "{line}").map_err(|e| WatchError::Sink {
            sink: self.name().into(),
            reason: e.to_string(),
        })
    }

    fn name(&self) -> &str {
        "stdout"
    }
}

/// Collects events in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<EventRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything emitted so far.
    pub fn records(&self) -> Vec<EventRecord> {
        self.records
            .lock()
            .map(|r| r.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }
}

#[async_trait]
impl EventSink for MemorySink {
    async fn emit(&self, record: &EventRecord) -> Result<(), WatchError> {
        let mut records = self.records.lock().map_err(|e| WatchError::Sink {
            sink: "memory".into(),
            reason: e.to_string(),
        })?;
        records.push(record.clone());
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
