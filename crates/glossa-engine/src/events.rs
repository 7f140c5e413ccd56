//! Pipeline event stream.
//!
//! Emits [`PipelineEvent`]s via a [`tokio::sync::broadcast`] channel so that
//! observers (the CLI, a report writer, tests) can follow a run without
//! coupling to the runner internals.

use serde::{Deserialize, Serialize};

use glossa_types::Status;

/// Events emitted during a pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PipelineEvent {
    PipelineStarted {
        path: String,
        critical: usize,
        normal: usize,
    },
    RuleStarted {
        rule: String,
        fail_fast: bool,
    },
    RuleCompleted {
        rule: String,
        status: Status,
        changed: bool,
        duration_ms: u64,
    },
    FixApplied {
        rule: String,
        path: String,
        bytes: usize,
    },
    PipelineHalted {
        rule: String,
        status: Status,
    },
    PipelineCompleted {
        status: Status,
        rules_run: usize,
        cancelled: bool,
        duration_ms: u64,
    },
}

/// Event emitter wrapping a broadcast sender.
#[derive(Clone)]
pub struct EventEmitter {
    sender: tokio::sync::broadcast::Sender<PipelineEvent>,
}

impl EventEmitter {
    /// Create a new emitter with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = tokio::sync::broadcast::channel(capacity);
        Self { sender }
    }

    /// Emit an event to all current subscribers. Dropped when nobody listens.
    pub fn emit(&self, event: PipelineEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<PipelineEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventEmitter {
    fn default() -> Self {
        Self::new(256)
    }
}

impl std::fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventEmitter")
            .field("receivers", &self.sender.receiver_count())
            .finish()
    }
}
