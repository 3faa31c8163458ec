//! Build progress events.
//!
//! The engine emits a structured record at every lifecycle transition so
//! downstream collaborators (chat relay, broadcast transport) can announce
//! progress. The engine does not format or deliver messages; sinks decide
//! what to do with each record.

use crate::plan::{PlanCompletion, ProgressSnapshot};
use crate::types::ActorId;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::info;

/// One structured progress record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BuildEvent {
    PlanStarted {
        actor: ActorId,
        blueprint: String,
        total_pieces: usize,
        at_ms: u64,
    },
    BatchPlaced {
        actor: ActorId,
        blueprint: String,
        progress: ProgressSnapshot,
        at_ms: u64,
    },
    PlanFinished {
        actor: ActorId,
        blueprint: String,
        completion: PlanCompletion,
        at_ms: u64,
    },
    PlanCancelled {
        actor: ActorId,
        blueprint: String,
        placed: usize,
        at_ms: u64,
    },
}

impl BuildEvent {
    pub fn actor(&self) -> &ActorId {
        match self {
            BuildEvent::PlanStarted { actor, .. }
            | BuildEvent::BatchPlaced { actor, .. }
            | BuildEvent::PlanFinished { actor, .. }
            | BuildEvent::PlanCancelled { actor, .. } => actor,
        }
    }
}

/// Where progress records go. Implementations must not block the request
/// path; delivery guarantees are the sink's concern, not the engine's.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &BuildEvent);
}

/// Drops every event. Default for embedders that poll `status` instead.
#[derive(Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: &BuildEvent) {}
}

/// Logs each event as a structured tracing record.
#[derive(Default)]
pub struct LogSink;

impl EventSink for LogSink {
    fn emit(&self, event: &BuildEvent) {
        match serde_json::to_string(event) {
            Ok(payload) => info!(target: "plinth::events", actor = %event.actor(), %payload, "build event"),
            Err(e) => info!(target: "plinth::events", actor = %event.actor(), error = %e, "unserializable build event"),
        }
    }
}

/// Captures events in memory. Test helper.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<BuildEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<BuildEvent> {
        self.events.lock().clone()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: &BuildEvent) {
        self.events.lock().push(event.clone());
    }
}
