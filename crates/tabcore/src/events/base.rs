use crate::{ToolId, ToolKind, WorkflowId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

pub type RunId = Uuid;

/// Lifecycle of a single pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Pending,
    Ordering,
    Running,
    Completed,
    Failed,
}

/// Events emitted during a workflow run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RunEvent {
    RunStarted {
        run_id: RunId,
        workflow_id: WorkflowId,
        timestamp: DateTime<Utc>,
    },
    StateChanged {
        run_id: RunId,
        state: RunState,
        timestamp: DateTime<Utc>,
    },
    ToolStarted {
        run_id: RunId,
        tool_id: ToolId,
        kind: ToolKind,
        timestamp: DateTime<Utc>,
    },
    ToolCompleted {
        run_id: RunId,
        tool_id: ToolId,
        rows: usize,
        columns: usize,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },
    ToolFailed {
        run_id: RunId,
        tool_id: ToolId,
        code: String,
        error: String,
        timestamp: DateTime<Utc>,
    },
    ToolMessage {
        run_id: RunId,
        tool_id: ToolId,
        event: ToolEvent,
        timestamp: DateTime<Utc>,
    },
    RunCompleted {
        run_id: RunId,
        success: bool,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },
}

/// Messages an executor reports while it runs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type")]
pub enum ToolEvent {
    Info { message: String },
    Warning { message: String },
}

/// Event emitter handed to executors
#[derive(Clone)]
pub struct EventEmitter {
    run_id: RunId,
    tool_id: ToolId,
    sender: broadcast::Sender<RunEvent>,
}

impl EventEmitter {
    pub fn new(run_id: RunId, tool_id: ToolId, sender: broadcast::Sender<RunEvent>) -> Self {
        Self {
            run_id,
            tool_id,
            sender,
        }
    }

    pub fn emit(&self, event: ToolEvent) {
        let _ = self.sender.send(RunEvent::ToolMessage {
            run_id: self.run_id,
            tool_id: self.tool_id,
            event,
            timestamp: Utc::now(),
        });
    }

    pub fn info(&self, message: impl Into<String>) {
        self.emit(ToolEvent::Info {
            message: message.into(),
        });
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.emit(ToolEvent::Warning {
            message: message.into(),
        });
    }
}

/// Broadcast bus shared by every run of a runtime.
///
/// Sends never block; with no subscribers events are dropped.
pub struct EventBus {
    sender: broadcast::Sender<RunEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RunEvent> {
        self.sender.subscribe()
    }

    pub fn emit(&self, event: RunEvent) {
        let _ = self.sender.send(event);
    }

    pub fn create_emitter(&self, run_id: RunId, tool_id: ToolId) -> EventEmitter {
        EventEmitter::new(run_id, tool_id, self.sender.clone())
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1000)
    }
}
