/// Workflow instance layer
///
/// Runtime state of triggered workflows and the key-value store that keeps it.

// Instance, status and history record types
pub mod types;

// InstanceStore trait with in-memory and SQLite adapters
pub mod store;

pub use store::{instance_key, InstanceStore, MemoryInstanceStore, SqliteInstanceStore};
pub use types::{InstanceStatus, StepExecutionRecord, StepStatus, WorkflowInstance};
