//! Event publishing.
//!
//! The pipeline hands each event to an [`EventSink`] synchronously and moves
//! on; sinks own their failure handling.

use std::io::Write;

use serde::Serialize;
use tracing::error;

use crate::event::MetricEvent;

/// Name reported in the `beat` envelope of published events.
pub const BEAT_NAME: &str = "jstatbeat";

/// Receives completed events. Fire-and-forget from the caller's side.
pub trait EventSink {
    fn publish(&mut self, event: MetricEvent);
}

impl<S: EventSink + ?Sized> EventSink for &mut S {
    fn publish(&mut self, event: MetricEvent) {
        (**self).publish(event);
    }
}

/// Identity of the publisher, attached to every JSON event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BeatInfo {
    pub name: String,
    pub hostname: String,
    pub version: String,
}

impl BeatInfo {
    /// Metadata for this host and crate version.
    pub fn current() -> Self {
        Self {
            name: BEAT_NAME.to_string(),
            hostname: crate::util::hostname(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

#[derive(Serialize)]
struct Envelope<'a> {
    #[serde(flatten)]
    event: &'a MetricEvent,
    beat: &'a BeatInfo,
}

/// Writes one JSON object per line and flushes after each event.
///
/// Write errors are logged and counted, never returned.
pub struct JsonLinesSink<W: Write> {
    writer: W,
    beat: BeatInfo,
    published: u64,
    failed: u64,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W, beat: BeatInfo) -> Self {
        Self {
            writer,
            beat,
            published: 0,
            failed: 0,
        }
    }

    /// Events written successfully.
    pub fn published(&self) -> u64 {
        self.published
    }

    /// Events lost to serialization or write errors.
    pub fn failed(&self) -> u64 {
        self.failed
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_event(&mut self, event: &MetricEvent) -> std::io::Result<()> {
        let envelope = Envelope {
            event,
            beat: &self.beat,
        };
        serde_json::to_writer(&mut self.writer, &envelope)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()
    }
}

impl<W: Write> EventSink for JsonLinesSink<W> {
    fn publish(&mut self, event: MetricEvent) {
        match self.write_event(&event) {
            Ok(()) => self.published += 1,
            Err(e) => {
                self.failed += 1;
                error!("Failed to publish event: {}", e);
            }
        }
    }
}

/// Keeps events in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub events: Vec<MetricEvent>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EventSink for MemorySink {
    fn publish(&mut self, event: MetricEvent) {
        self.events.push(event);
    }
}
