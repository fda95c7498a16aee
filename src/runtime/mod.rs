/// Runtime Execution Engine
///
/// This module runs workflow instances along their step chain.
/// It handles:
/// - Payload path addressing for step input and output
/// - Late-bound function lookup by name
/// - Sequential step execution on detached tokio tasks
/// - Lifecycle event publishing

// Dotted key-path get/set over JSON payloads
pub mod path;

// Named async step handlers
pub mod functions;

// Built-in simulated signup functions
pub mod simulated;

// Lifecycle events and publishers
pub mod events;

// Core execution engine driving instances step by step
pub mod engine;

// Re-export main types
pub use engine::ExecutionEngine;
pub use events::{BroadcastPublisher, EventPublisher, NoopPublisher, WorkflowEvent};
pub use functions::{FunctionError, FunctionRegistry, StepFunction};
pub use path::PayloadPath;
