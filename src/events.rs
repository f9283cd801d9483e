//! Event system for runs
//!
//! Provides typed event emission for task starts and settlements

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::mpsc;

pub const EVENT_VERSION: u32 = 1;

/// Which entry point produced a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    Parallel,
    Series,
    Auto,
}

/// Runtime event types
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum FlowEvent {
    RunStarted {
        mode: RunMode,
        tasks: usize,
    },
    TaskStarted {
        task: String,
    },
    TaskSettled {
        task: String,
        success: bool,
        duration_ms: u64,
    },
    RunFinished {
        success: bool,
    },
}

/// Event envelope with metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowEventEnvelope {
    pub version: u32,
    pub sequence: u64,
    pub run_id: String,
    pub timestamp: u64,
    pub event: FlowEvent,
}

/// Event sink trait for emitting events
pub trait EventSink: Send + Sync {
    /// Emit an event
    fn emit(&self, envelope: &FlowEventEnvelope);
}

/// A simple logging event sink
#[derive(Debug, Default)]
pub struct LoggingEventSink;

impl EventSink for LoggingEventSink {
    fn emit(&self, envelope: &FlowEventEnvelope) {
        tracing::debug!("Event: {:?}", envelope);
    }
}

/// A buffering event sink that collects events
#[derive(Debug, Default)]
pub struct BufferingEventSink {
    events: Mutex<Vec<FlowEventEnvelope>>,
}

impl BufferingEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_events(&self) -> Vec<FlowEventEnvelope> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Just the event payloads, in emission order
    pub fn kinds(&self) -> Vec<FlowEvent> {
        self.get_events().into_iter().map(|e| e.event).collect()
    }

    pub fn clear(&self) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl EventSink for BufferingEventSink {
    fn emit(&self, envelope: &FlowEventEnvelope) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(envelope.clone());
    }
}

/// Forwards events into an unbounded tokio channel
#[derive(Debug)]
pub struct ChannelEventSink {
    sender: mpsc::UnboundedSender<FlowEventEnvelope>,
}

impl ChannelEventSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<FlowEventEnvelope>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl EventSink for ChannelEventSink {
    fn emit(&self, envelope: &FlowEventEnvelope) {
        // Receiver gone means nobody is listening anymore
        let _ = self.sender.send(envelope.clone());
    }
}

/// Get current timestamp in milliseconds
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_millis() as u64
}

/// Per-run emitter; sequence numbers start at zero for every run
pub(crate) struct EventEmitter {
    run_id: String,
    sink: Option<Arc<dyn EventSink>>,
    sequence: AtomicU64,
}

impl EventEmitter {
    pub(crate) fn new(run_id: impl Into<String>, sink: Option<Arc<dyn EventSink>>) -> Self {
        Self {
            run_id: run_id.into(),
            sink,
            sequence: AtomicU64::new(0),
        }
    }

    pub(crate) fn emit(&self, event: FlowEvent) {
        if let Some(sink) = &self.sink {
            let envelope = FlowEventEnvelope {
                version: EVENT_VERSION,
                sequence: self.sequence.fetch_add(1, Ordering::Relaxed),
                run_id: self.run_id.clone(),
                timestamp: now_ms(),
                event,
            };
            sink.emit(&envelope);
        }
    }

    pub(crate) fn task_started(&self, task: &dyn fmt::Display) {
        self.emit(FlowEvent::TaskStarted {
            task: task.to_string(),
        });
    }

    pub(crate) fn task_settled(&self, task: &dyn fmt::Display, success: bool, elapsed: Duration) {
        self.emit(FlowEvent::TaskSettled {
            task: task.to_string(),
            success,
            duration_ms: elapsed.as_millis() as u64,
        });
    }
}
