/// Workflow instance data model
///
/// An instance is one run of a definition against a trigger payload: a status,
/// the evolving payload document, a cursor into the step chain, and an
/// append-only history of step executions.

use crate::error::{EngineError, Result};
use crate::workflow::types::WorkflowDefinition;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Instance lifecycle status
///
/// Moves strictly forward: PENDING -> RUNNING -> COMPLETED | FAILED.
/// TIMED_OUT and CANCELLED are reserved and never entered by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InstanceStatus {
    Pending,
    Running,
    Completed,
    Failed,
    TimedOut,
    Cancelled,
}

impl InstanceStatus {
    /// Whether the run loop may pick this instance up
    pub fn is_runnable(self) -> bool {
        matches!(self, InstanceStatus::Pending | InstanceStatus::Running)
    }

    pub fn is_terminal(self) -> bool {
        !self.is_runnable()
    }

    /// Allowed forward edges of the state machine
    pub fn can_transition_to(self, next: InstanceStatus) -> bool {
        use InstanceStatus::*;
        matches!(
            (self, next),
            (Pending, Running)
                | (Pending, Failed)
                | (Running, Completed)
                | (Running, Failed)
                | (Running, TimedOut)
                | (Running, Cancelled)
                | (Pending, Cancelled)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            InstanceStatus::Pending => "PENDING",
            InstanceStatus::Running => "RUNNING",
            InstanceStatus::Completed => "COMPLETED",
            InstanceStatus::Failed => "FAILED",
            InstanceStatus::TimedOut => "TIMED_OUT",
            InstanceStatus::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a single step execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepStatus {
    Success,
    Error,
}

/// One entry of an instance's history
///
/// `input` and `output` are owned copies taken at execution time, so later
/// payload mutations never show up here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepExecutionRecord {
    pub step_id: String,
    pub function_name: String,
    pub status: StepStatus,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub input: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A runtime execution of a workflow definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowInstance {
    pub instance_id: String,
    pub workflow_definition_id: String,
    /// Name of the definition at trigger time
    pub workflow_definition_name: String,
    pub status: InstanceStatus,
    /// Trigger input, never modified after creation
    pub initial_payload: Value,
    /// The document steps read from and write into
    pub current_payload: Value,
    /// Next step to run; after a failure, the failing step
    #[serde(default)]
    pub current_step_id: Option<String>,
    #[serde(default)]
    pub history: Vec<StepExecutionRecord>,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WorkflowInstance {
    /// Fresh PENDING instance positioned at the definition's start step
    pub fn new(definition: &WorkflowDefinition, payload: Value) -> Self {
        Self {
            instance_id: uuid::Uuid::new_v4().to_string(),
            workflow_definition_id: definition.id.clone(),
            workflow_definition_name: definition.name.clone(),
            status: InstanceStatus::Pending,
            initial_payload: payload.clone(),
            current_payload: payload,
            current_step_id: Some(definition.start_at.clone()),
            history: Vec::new(),
            started_at: Utc::now(),
            ended_at: None,
            error: None,
        }
    }

    /// Move to `next`, refusing backward or sideways moves
    pub fn transition_to(&mut self, next: InstanceStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(EngineError::InvalidTransition {
                from: self.status.to_string(),
                to: next.to_string(),
            });
        }
        self.status = next;
        Ok(())
    }

    /// Mark the instance FAILED with an error message
    ///
    /// No-op on instances that already reached a terminal status.
    pub fn fail(&mut self, error: impl Into<String>) {
        if self.status.is_runnable() {
            self.status = InstanceStatus::Failed;
            self.error = Some(error.into());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::types::sample_signup_workflow;
    use serde_json::json;

    #[test]
    fn test_new_instance_is_pending_at_start() {
        let definition = sample_signup_workflow();
        let instance = WorkflowInstance::new(&definition, json!({"email": "a@b.c"}));

        assert_eq!(instance.status, InstanceStatus::Pending);
        assert_eq!(instance.current_step_id.as_deref(), Some("validateInput"));
        assert_eq!(instance.workflow_definition_id, "sample-user-signup");
        assert_eq!(instance.initial_payload, instance.current_payload);
        assert!(instance.history.is_empty());
        assert!(instance.ended_at.is_none());
    }

    #[test]
    fn test_status_is_monotonic() {
        let definition = sample_signup_workflow();
        let mut instance = WorkflowInstance::new(&definition, json!({}));

        instance.transition_to(InstanceStatus::Running).unwrap();
        instance.transition_to(InstanceStatus::Completed).unwrap();

        let err = instance.transition_to(InstanceStatus::Running).unwrap_err();
        assert!(matches!(err, EngineError::InvalidTransition { .. }));
        assert!(instance.transition_to(InstanceStatus::Failed).is_err());
        assert!(!InstanceStatus::Completed.is_runnable());
        assert!(InstanceStatus::Failed.is_terminal());
    }

    #[test]
    fn test_fail_does_not_revive_terminal_status() {
        let definition = sample_signup_workflow();
        let mut instance = WorkflowInstance::new(&definition, json!({}));
        instance.status = InstanceStatus::Completed;
        instance.fail("late error");
        assert_eq!(instance.status, InstanceStatus::Completed);

        let mut instance = WorkflowInstance::new(&definition, json!({}));
        instance.fail("boom");
        assert_eq!(instance.status, InstanceStatus::Failed);
        assert_eq!(instance.error.as_deref(), Some("boom"));
    }

    #[test]
    fn test_wire_format() {
        let definition = sample_signup_workflow();
        let instance = WorkflowInstance::new(&definition, json!({"a": 1}));
        let value = serde_json::to_value(&instance).unwrap();

        assert_eq!(value["status"], "PENDING");
        assert_eq!(value["workflowDefinitionName"], "Sample User Signup Workflow");
        assert_eq!(value["currentStepId"], "validateInput");
        assert!(value.get("endedAt").is_none());

        let back: WorkflowInstance = serde_json::from_value(value).unwrap();
        assert_eq!(back, instance);
    }

    #[test]
    fn test_reserved_statuses_serialize() {
        assert_eq!(serde_json::to_value(InstanceStatus::TimedOut).unwrap(), "TIMED_OUT");
        assert_eq!(InstanceStatus::Cancelled.to_string(), "CANCELLED");
    }
}
