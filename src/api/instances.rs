/// Workflow trigger and instance query endpoints
///
/// Triggering answers 202 with the PENDING instance as soon as it is stored;
/// progress is observed by polling the instance.

use crate::{
    api::AppState,
    error::{EngineError, Result},
    instance::types::WorkflowInstance,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::Value;

/// Optional trigger body
#[derive(Debug, Default, Deserialize)]
struct TriggerRequest {
    #[serde(default)]
    payload: Option<Value>,
}

/// Create trigger and instance routes
pub fn create_instance_routes() -> Router<AppState> {
    Router::new()
        .route("/workflows/{id_or_name}/trigger", post(trigger_workflow))
        .route("/workflows/instances/{instance_id}", get(get_instance))
}

/// Trigger a workflow by definition id or name
///
/// POST /workflows/{idOrName}/trigger
/// Body (optional): { "payload": { ... } }
async fn trigger_workflow(
    State(state): State<AppState>,
    Path(id_or_name): Path<String>,
    body: String,
) -> Result<(StatusCode, Json<WorkflowInstance>)> {
    tracing::info!("📥 Trigger request received for: {}", id_or_name);
    tracing::debug!("📄 Request body: {}", body);

    let request: TriggerRequest = if body.trim().is_empty() {
        TriggerRequest::default()
    } else {
        serde_json::from_str(&body).map_err(|e| {
            tracing::warn!("❌ Invalid trigger body for {}: {}", id_or_name, e);
            EngineError::Validation(format!("invalid JSON body: {}", e))
        })?
    };

    let instance = state.engine.trigger(&id_or_name, request.payload).await?;
    tracing::info!(
        "🚀 Triggered {} as instance {}",
        instance.workflow_definition_name,
        instance.instance_id
    );

    Ok((StatusCode::ACCEPTED, Json(instance)))
}

/// GET /workflows/instances/{instanceId}
async fn get_instance(
    State(state): State<AppState>,
    Path(instance_id): Path<String>,
) -> Result<Json<WorkflowInstance>> {
    Ok(Json(state.engine.get_instance(&instance_id).await?))
}
