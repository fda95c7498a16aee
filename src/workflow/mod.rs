/// Workflow definition layer
///
/// Definitions are immutable templates: a start step and a map of linked steps.
/// - Type definitions (WorkflowDefinition, WorkflowStep)
/// - SQLite persistence with sqlx
/// - Lock-free hot registry using ArcSwap

// Core definition types
pub mod types;

// SQLite persistence layer for definitions
pub mod storage;

// Hot registry behind the DefinitionRepository trait
pub mod registry;

// Re-export commonly used types
pub use registry::{DefinitionRegistry, DefinitionRepository};
pub use storage::DefinitionStorage;
pub use types::{DefinitionRequest, StepType, WorkflowDefinition, WorkflowStep};
