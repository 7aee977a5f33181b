use crate::ErrorPolicy;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

pub type ExecutionId = Uuid;

/// Events emitted while a flow runs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ExecutionEvent {
    FlowStarted {
        execution_id: ExecutionId,
        steps: usize,
        policy: ErrorPolicy,
        timestamp: DateTime<Utc>,
    },
    StepStarted {
        execution_id: ExecutionId,
        step: usize,
        tasks: usize,
        timestamp: DateTime<Utc>,
    },
    TaskCompleted {
        execution_id: ExecutionId,
        step: usize,
        task: usize,
        failed: bool,
        timestamp: DateTime<Utc>,
    },
    StepCompleted {
        execution_id: ExecutionId,
        step: usize,
        failed: bool,
        finalized_early: bool,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },
    FlowCompleted {
        execution_id: ExecutionId,
        steps_run: usize,
        halted: bool,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },
}

impl ExecutionEvent {
    pub fn execution_id(&self) -> ExecutionId {
        match self {
            ExecutionEvent::FlowStarted { execution_id, .. }
            | ExecutionEvent::StepStarted { execution_id, .. }
            | ExecutionEvent::TaskCompleted { execution_id, .. }
            | ExecutionEvent::StepCompleted { execution_id, .. }
            | ExecutionEvent::FlowCompleted { execution_id, .. } => *execution_id,
        }
    }
}

/// Broadcast bus for execution events
///
/// Events sent while nobody is subscribed are dropped.
pub struct EventBus {
    sender: broadcast::Sender<ExecutionEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ExecutionEvent> {
        self.sender.subscribe()
    }

    pub fn emit(&self, event: ExecutionEvent) {
        if self.sender.send(event).is_err() {
            tracing::trace!("no subscribers for execution event");
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1000)
    }
}
