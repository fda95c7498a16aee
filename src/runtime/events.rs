/// Lifecycle events and publishers
///
/// The engine publishes one event per lifecycle transition. Publishing is
/// fire-and-forget: it never blocks the run loop, and a failed or unobserved
/// send is dropped without affecting the instance.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;

/// Events emitted while an instance runs
///
/// Serialized with a `type` tag (`WORKFLOW_STARTED`, `STEP_FAILED`, ...) and
/// camelCase fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowEvent {
    #[serde(rename_all = "camelCase")]
    WorkflowStarted {
        instance_id: String,
        workflow_definition_id: String,
        workflow_name: String,
        started_at: DateTime<Utc>,
        initial_payload: Value,
    },

    #[serde(rename_all = "camelCase")]
    StepStarted {
        instance_id: String,
        step_id: String,
        step_name: String,
        function_name: String,
        input: Value,
        started_at: DateTime<Utc>,
    },

    #[serde(rename_all = "camelCase")]
    StepCompleted {
        instance_id: String,
        step_id: String,
        step_name: String,
        output: Value,
        ended_at: DateTime<Utc>,
    },

    #[serde(rename_all = "camelCase")]
    StepFailed {
        instance_id: String,
        step_id: String,
        step_name: String,
        error: String,
        ended_at: DateTime<Utc>,
    },

    #[serde(rename_all = "camelCase")]
    WorkflowCompleted {
        instance_id: String,
        workflow_name: String,
        ended_at: DateTime<Utc>,
    },

    #[serde(rename_all = "camelCase")]
    WorkflowFailed {
        instance_id: String,
        workflow_name: Option<String>,
        error: String,
        ended_at: DateTime<Utc>,
    },
}

impl WorkflowEvent {
    /// Instance this event belongs to
    pub fn instance_id(&self) -> &str {
        match self {
            WorkflowEvent::WorkflowStarted { instance_id, .. }
            | WorkflowEvent::StepStarted { instance_id, .. }
            | WorkflowEvent::StepCompleted { instance_id, .. }
            | WorkflowEvent::StepFailed { instance_id, .. }
            | WorkflowEvent::WorkflowCompleted { instance_id, .. }
            | WorkflowEvent::WorkflowFailed { instance_id, .. } => instance_id,
        }
    }

    /// Wire name of the event type
    pub fn kind(&self) -> &'static str {
        match self {
            WorkflowEvent::WorkflowStarted { .. } => "WORKFLOW_STARTED",
            WorkflowEvent::StepStarted { .. } => "STEP_STARTED",
            WorkflowEvent::StepCompleted { .. } => "STEP_COMPLETED",
            WorkflowEvent::StepFailed { .. } => "STEP_FAILED",
            WorkflowEvent::WorkflowCompleted { .. } => "WORKFLOW_COMPLETED",
            WorkflowEvent::WorkflowFailed { .. } => "WORKFLOW_FAILED",
        }
    }
}

/// Sink for lifecycle events
///
/// Implementations must not block and must swallow their own failures
pub trait EventPublisher: Send + Sync {
    fn publish(&self, event: WorkflowEvent);
}

/// Publisher that discards all events
#[derive(Debug, Clone, Default)]
pub struct NoopPublisher;

impl EventPublisher for NoopPublisher {
    fn publish(&self, _event: WorkflowEvent) {}
}

/// Fan-out publisher over a tokio broadcast channel
///
/// Slow subscribers lag and lose the oldest events; with no subscribers the
/// event is simply dropped
#[derive(Debug, Clone)]
pub struct BroadcastPublisher {
    sender: broadcast::Sender<WorkflowEvent>,
}

impl BroadcastPublisher {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Subscribe to events published from now on
    pub fn subscribe(&self) -> broadcast::Receiver<WorkflowEvent> {
        self.sender.subscribe()
    }
}

impl EventPublisher for BroadcastPublisher {
    fn publish(&self, event: WorkflowEvent) {
        // Err only means nobody is listening
        if self.sender.send(event).is_err() {
            tracing::trace!("event dropped, no subscribers");
        }
    }
}

/// Drain a subscription, logging each event as JSON until the channel closes
pub async fn log_events(mut receiver: broadcast::Receiver<WorkflowEvent>) {
    loop {
        match receiver.recv().await {
            Ok(event) => match serde_json::to_string(&event) {
                Ok(json) => tracing::debug!("📣 [{}] {} {}", event.instance_id(), event.kind(), json),
                Err(e) => tracing::warn!("Failed to serialize {} event: {}", event.kind(), e),
            },
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!("Event logger lagged, skipped {} events", skipped);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
