/// Core workflow definition types
///
/// A definition is an immutable, named template: a start step id plus a map of
/// steps, each pointing at its successor. These types are serialized to JSON
/// (camelCase, matching the public wire format) for persistence and the API.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A complete workflow definition
///
/// `start_at` is expected to key into `steps`. Nothing checks the graph up
/// front; a dangling reference fails the instance when the engine reaches it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowDefinition {
    /// Unique definition identifier (e.g., "sample-user-signup")
    pub id: String,
    /// Human-readable name, unique across the registry
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Id of the first step
    pub start_at: String,
    /// Steps keyed by step id
    pub steps: BTreeMap<String, WorkflowStep>,
}

impl WorkflowDefinition {
    /// Look up a step by id
    pub fn step(&self, step_id: &str) -> Option<&WorkflowStep> {
        self.steps.get(step_id)
    }

    /// Distinct function names referenced by this definition's steps
    pub fn function_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.steps.values().map(|s| s.function_name.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        names
    }
}

/// A single step: one function call with input/output addressing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowStep {
    /// Step id; filled from the map key when omitted in a request body
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(rename = "type", default)]
    pub step_type: StepType,
    /// Registry key of the function to invoke, resolved at execution time
    pub function_name: String,
    /// Where the function input is read from; None passes the whole payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_path: Option<String>,
    /// Where the function output is written; None merges at the root
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_path: Option<String>,
    /// Successor step id; None marks the last step
    #[serde(default)]
    pub next_step_id: Option<String>,
}

/// Step kinds. Only plain function calls exist today.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepType {
    #[default]
    Function,
}

/// Names that collide with the static `/workflows/<segment>/...` routes
pub const RESERVED_NAMES: [&str; 2] = ["definitions", "instances"];

/// Request body for creating or replacing a definition
///
/// The id is assigned by the registry on create and taken from the URL on replace.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefinitionRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub start_at: String,
    #[serde(default)]
    pub steps: BTreeMap<String, WorkflowStep>,
}

impl DefinitionRequest {
    /// Check presence of the required string fields
    ///
    /// No graph consistency checking: `startAt`/`nextStepId` may dangle.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("name must not be empty".to_string());
        }
        if RESERVED_NAMES.contains(&self.name.trim()) {
            return Err(format!("name '{}' is reserved", self.name.trim()));
        }
        if self.start_at.trim().is_empty() {
            return Err("startAt must not be empty".to_string());
        }
        for (key, step) in &self.steps {
            if key.trim().is_empty() {
                return Err("step ids must not be empty".to_string());
            }
            if step.name.trim().is_empty() {
                return Err(format!("step '{}': name must not be empty", key));
            }
            if step.function_name.trim().is_empty() {
                return Err(format!("step '{}': functionName must not be empty", key));
            }
        }
        Ok(())
    }

    /// Build the stored definition under the given id
    pub fn into_definition(self, id: String) -> WorkflowDefinition {
        let steps = self
            .steps
            .into_iter()
            .map(|(key, mut step)| {
                if step.id.is_empty() {
                    step.id = key.clone();
                }
                (key, step)
            })
            .collect();

        WorkflowDefinition {
            id,
            name: self.name,
            description: self.description,
            start_at: self.start_at,
            steps,
        }
    }
}

impl From<WorkflowDefinition> for DefinitionRequest {
    fn from(definition: WorkflowDefinition) -> Self {
        Self {
            name: definition.name,
            description: definition.description,
            start_at: definition.start_at,
            steps: definition.steps,
        }
    }
}

/// The signup pipeline shipped as a ready-to-trigger example
///
/// validateInput -> createUser -> sendEmail -> logAnalytics
pub fn sample_signup_workflow() -> WorkflowDefinition {
    let step = |id: &str, name: &str, function: &str, input: Option<&str>, result: Option<&str>, next: Option<&str>| {
        (
            id.to_string(),
            WorkflowStep {
                id: id.to_string(),
                name: name.to_string(),
                step_type: StepType::Function,
                function_name: function.to_string(),
                input_path: input.map(str::to_string),
                result_path: result.map(str::to_string),
                next_step_id: next.map(str::to_string),
            },
        )
    };

    WorkflowDefinition {
        id: "sample-user-signup".to_string(),
        name: "Sample User Signup Workflow".to_string(),
        description: Some("A sample workflow to demonstrate user signup process.".to_string()),
        start_at: "validateInput".to_string(),
        steps: BTreeMap::from([
            step("validateInput", "Validate User Input", "validateUserData", None, Some("$.validationResult"), Some("createUser")),
            step("createUser", "Create User in DB", "createUserInDB", Some("$.validationResult"), Some("$.userCreationResult"), Some("sendEmail")),
            step("sendEmail", "Send Welcome Email", "sendWelcomeEmail", Some("$.userCreationResult"), Some("$.emailSentResult"), Some("logAnalytics")),
            step("logAnalytics", "Log Signup Analytics", "logAnalytics", Some("$.emailSentResult"), None, None),
        ]),
    }
}
