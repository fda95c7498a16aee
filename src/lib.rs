/// Stepway: linear step-chain workflow engine
///
/// This library provides definition management with hot-reload, asynchronous
/// step-by-step execution of workflow instances with durable state, and
/// lifecycle events for observers.

// Core configuration and setup
pub mod config;

// Error taxonomy shared by every layer
pub mod error;

// Workflow definition layer - types, storage, and hot registry
pub mod workflow;

// Workflow instance layer - runtime state and durable key-value store
pub mod instance;

// Runtime execution engine - path addressing, functions, events, run loop
pub mod runtime;

// HTTP API layer - definition management, triggers, and instance queries
pub mod api;

// Server setup and initialization
pub mod server;

// Re-export commonly used types for external consumers
pub use error::{EngineError, Result};
pub use instance::{InstanceStatus, WorkflowInstance};
pub use runtime::{ExecutionEngine, FunctionRegistry, WorkflowEvent};
pub use server::start_server;
pub use workflow::{WorkflowDefinition, WorkflowStep};
