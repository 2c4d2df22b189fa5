//! Diagnostic events and sinks.
//!
//! A run reports `graphstart`, `nodestart`, `edge`, `skip`, `nodeend` and
//! `graphend` events to a [`DiagnosticsSink`] and awaits each report before it
//! continues, so a slow sink slows the run down instead of buffering without
//! bound. Every event carries the invocation path of the step that produced it.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::graph::Edge;
use crate::path::InvocationPath;
use crate::values::Values;

/// Event kind, as written in the `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    GraphStart,
    NodeStart,
    Edge,
    Skip,
    NodeEnd,
    GraphEnd,
}

/// Payload of a diagnostic event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EventData {
    GraphStart {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
    },
    NodeStart {
        node: String,
        inputs: Values,
    },
    /// An edge fired; `value` holds what it carries, keyed by input name.
    Edge {
        edge: Edge,
        value: Values,
    },
    Skip {
        node: String,
        inputs: Values,
        missing_inputs: Vec<String>,
    },
    NodeEnd {
        node: String,
        inputs: Values,
        outputs: Values,
    },
    GraphEnd {},
}

impl EventData {
    pub fn kind(&self) -> EventKind {
        match self {
            EventData::GraphStart { .. } => EventKind::GraphStart,
            EventData::NodeStart { .. } => EventKind::NodeStart,
            EventData::Edge { .. } => EventKind::Edge,
            EventData::Skip { .. } => EventKind::Skip,
            EventData::NodeEnd { .. } => EventKind::NodeEnd,
            EventData::GraphEnd {} => EventKind::GraphEnd,
        }
    }
}

/// One diagnostic record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticEvent {
    #[serde(flatten)]
    pub data: EventData,
    pub path: InvocationPath,
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
}

impl DiagnosticEvent {
    /// Stamps `data` with `path` and the current time.
    pub fn new(data: EventData, path: InvocationPath) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Self {
            data,
            path,
            timestamp,
        }
    }

    pub fn kind(&self) -> EventKind {
        self.data.kind()
    }
}

/// Receiver of diagnostic events. The run awaits every `report`.
#[async_trait]
pub trait DiagnosticsSink: Send + Sync {
    async fn report(&self, event: DiagnosticEvent);
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

#[async_trait]
impl DiagnosticsSink for NullSink {
    async fn report(&self, _event: DiagnosticEvent) {}
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<DiagnosticEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of events recorded so far.
    pub fn events(&self) -> Vec<DiagnosticEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn kinds(&self) -> Vec<EventKind> {
        self.events().iter().map(DiagnosticEvent::kind).collect()
    }

    pub fn clear(&self) {
        if let Ok(mut events) = self.events.lock() {
            events.clear();
        }
    }
}

#[async_trait]
impl DiagnosticsSink for MemorySink {
    async fn report(&self, event: DiagnosticEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

/// Forwards only the listed kinds to an inner sink.
pub struct FilteredSink {
    inner: Arc<dyn DiagnosticsSink>,
    kinds: HashSet<EventKind>,
}

impl FilteredSink {
    pub fn new(inner: Arc<dyn DiagnosticsSink>, kinds: impl IntoIterator<Item = EventKind>) -> Self {
        Self {
            inner,
            kinds: kinds.into_iter().collect(),
        }
    }
}

#[async_trait]
impl DiagnosticsSink for FilteredSink {
    async fn report(&self, event: DiagnosticEvent) {
        if self.kinds.contains(&event.kind()) {
            self.inner.report(event).await;
        }
    }
}

/// Sends events over a bounded channel; a full channel makes the run wait.
pub struct ChannelSink {
    tx: mpsc::Sender<DiagnosticEvent>,
}

impl ChannelSink {
    /// Returns the sink and the stream of events it receives.
    pub fn new(capacity: usize) -> (Self, ReceiverStream<DiagnosticEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, ReceiverStream::new(rx))
    }
}

#[async_trait]
impl DiagnosticsSink for ChannelSink {
    async fn report(&self, event: DiagnosticEvent) {
        // A dropped receiver only means nobody is listening any more.
        let _ = self.tx.send(event).await;
    }
}

/// Writes events to `tracing` at debug level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

#[async_trait]
impl DiagnosticsSink for TracingSink {
    async fn report(&self, event: DiagnosticEvent) {
        match &event.data {
            EventData::GraphStart { title } => {
                tracing::debug!(path = %event.path, title = ?title, "graphstart")
            }
            EventData::NodeStart { node, .. } => {
                tracing::debug!(path = %event.path, node = %node, "nodestart")
            }
            EventData::Edge { edge, .. } => {
                tracing::debug!(path = %event.path, from = %edge.from, to = %edge.to, "edge")
            }
            EventData::Skip {
                node,
                missing_inputs,
                ..
            } => tracing::debug!(path = %event.path, node = %node, ?missing_inputs, "skip"),
            EventData::NodeEnd { node, .. } => {
                tracing::debug!(path = %event.path, node = %node, "nodeend")
            }
            EventData::GraphEnd {} => tracing::debug!(path = %event.path, "graphend"),
        }
    }
}
