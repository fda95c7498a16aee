/// HTTP API Layer
///
/// This module provides the REST API endpoints for definition management
/// and workflow execution. It handles:
/// - Definition CRUD operations
/// - Triggering workflows by id or name
/// - Instance status lookup

use crate::{error::EngineError, runtime::engine::ExecutionEngine};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use std::sync::Arc;

// Definition management endpoints (POST/GET/PUT/DELETE)
pub mod definitions;

// Trigger and instance query endpoints
pub mod instances;

// Re-export router builders
pub use definitions::create_definition_routes;
pub use instances::create_instance_routes;

/// Application state shared by every handler
#[derive(Clone)]
pub struct AppState {
    /// Execution engine; also owns the definition and function registries
    pub engine: Arc<ExecutionEngine>,
}

impl IntoResponse for EngineError {
    fn into_response(self) -> Response {
        let status = match &self {
            EngineError::NotFound(_) => StatusCode::NOT_FOUND,
            EngineError::Conflict(_) => StatusCode::CONFLICT,
            EngineError::Validation(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            tracing::error!("❌ Request failed: {}", self);
        }

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
