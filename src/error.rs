/// Error taxonomy for the stepway engine
///
/// NotFound, Conflict and Validation surface synchronously to callers.
/// Everything raised inside a detached run loop is folded into a FAILED
/// instance instead of being returned to anyone.

use thiserror::Error;

/// Errors produced by the definition registry, instance store and engine
#[derive(Debug, Error)]
pub enum EngineError {
    /// Definition or instance absent
    #[error("{0}")]
    NotFound(String),

    /// A definition with the same name already exists
    #[error("{0}")]
    Conflict(String),

    /// Malformed or missing required fields
    #[error("validation failed: {0}")]
    Validation(String),

    /// Step function could not be resolved or returned an error
    #[error("{0}")]
    StepExecution(String),

    /// Definition vanished between trigger and processing
    #[error("Critical: Workflow definition {0} missing.")]
    DefinitionMissing(String),

    /// Referenced step id is not part of the definition
    #[error("Step definition for {0} missing.")]
    StepMissing(String),

    /// Instance status may only move forward
    #[error("invalid status transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    /// Backing store unreachable or failing
    #[error("store error: {0}")]
    Store(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

impl From<sqlx::Error> for EngineError {
    fn from(err: sqlx::Error) -> Self {
        EngineError::Store(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EngineError::DefinitionMissing("wf-1".to_string());
        assert_eq!(err.to_string(), "Critical: Workflow definition wf-1 missing.");

        let err = EngineError::StepMissing("s9".to_string());
        assert_eq!(err.to_string(), "Step definition for s9 missing.");

        let err = EngineError::InvalidTransition {
            from: "COMPLETED".to_string(),
            to: "RUNNING".to_string(),
        };
        assert_eq!(err.to_string(), "invalid status transition from COMPLETED to RUNNING");
    }

    #[test]
    fn test_serde_error_converts() {
        let parse: std::result::Result<serde_json::Value, _> = serde_json::from_str("{");
        let err: EngineError = parse.unwrap_err().into();
        assert!(matches!(err, EngineError::Serialization(_)));
    }
}
