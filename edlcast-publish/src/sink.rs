//! Output records and the sinks that deliver them.

use std::io::Write;
use std::sync::Arc;

use edlcast_edl::Event;
use parking_lot::Mutex;
use serde::Serialize;

use crate::error::{PublishError, Result};

/// One emitted event with its position in the output stream.
#[derive(Debug, Clone, Serialize)]
pub struct PublishedRecord {
    pub sequence_number: u64,
    #[serde(flatten)]
    pub event: Event,
}

/// Receives records in strictly increasing sequence order.
pub trait RecordSink: Send {
    fn publish(&mut self, record: &PublishedRecord) -> Result<()>;

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Collects records in memory. Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    records: Arc<Mutex<Vec<PublishedRecord>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<PublishedRecord> {
        self.records.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl RecordSink for MemorySink {
    fn publish(&mut self, record: &PublishedRecord) -> Result<()> {
        self.records.lock().push(record.clone());
        Ok(())
    }
}

#[derive(Serialize)]
struct Frame<'a> {
    name: String,
    freshness_ms: u64,
    content: &'a PublishedRecord,
}

/// Writes one framed JSON object per line:
/// `{"name": "<prefix><sequence>", "freshness_ms": .., "content": {..}}`.
pub struct JsonLinesSink<W: Write + Send> {
    writer: W,
    name_prefix: String,
    freshness_ms: u64,
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(writer: W, name_prefix: impl Into<String>, freshness_ms: u64) -> Self {
        Self {
            writer,
            name_prefix: name_prefix.into(),
            freshness_ms,
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> RecordSink for JsonLinesSink<W> {
    fn publish(&mut self, record: &PublishedRecord) -> Result<()> {
        let frame = Frame {
            name: format!("{}{}", self.name_prefix, record.sequence_number),
            freshness_ms: self.freshness_ms,
            content: record,
        };
        let line = serde_json::to_string(&frame)?;
        writeln!(self.writer, "{line}").map_err(|e| PublishError::Sink(e.to_string()))
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush().map_err(|e| PublishError::Sink(e.to_string()))
    }
}
