/// Definition management REST API endpoints
///
/// CRUD over workflow definitions. Changes land in the hot registry
/// immediately and apply to every instance triggered afterwards.

use crate::{
    api::AppState,
    error::{EngineError, Result},
    workflow::types::{DefinitionRequest, WorkflowDefinition},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};

/// Create definition management routes
pub fn create_definition_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/workflows/definitions",
            get(list_definitions).post(create_definition),
        )
        .route(
            "/workflows/definitions/{id}",
            get(get_definition)
                .put(replace_definition)
                .delete(delete_definition),
        )
}

/// Parse a definition body by hand so malformed JSON maps to 400
fn parse_request(body: &str) -> Result<DefinitionRequest> {
    serde_json::from_str(body).map_err(|e| {
        tracing::warn!("❌ Invalid definition body: {}", e);
        EngineError::Validation(format!("invalid JSON body: {}", e))
    })
}

/// Create a new definition
///
/// POST /workflows/definitions
/// Body: { "name": "...", "startAt": "...", "steps": { "<id>": { ... } } }
async fn create_definition(
    State(state): State<AppState>,
    body: String,
) -> Result<(StatusCode, Json<WorkflowDefinition>)> {
    let request = parse_request(&body)?;
    let definition = state.engine.definitions().create(request).await?;
    state.engine.functions().warn_unresolved(&definition);

    Ok((StatusCode::CREATED, Json(definition)))
}

/// List all definitions, ordered by name
///
/// GET /workflows/definitions
async fn list_definitions(State(state): State<AppState>) -> Result<Json<Vec<WorkflowDefinition>>> {
    Ok(Json(state.engine.definitions().list().await?))
}

/// GET /workflows/definitions/{id}
async fn get_definition(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<WorkflowDefinition>> {
    state
        .engine
        .definitions()
        .get_by_id(&id)
        .await?
        .map(Json)
        .ok_or_else(|| EngineError::NotFound(format!("Workflow definition with ID \"{}\" not found.", id)))
}

/// Replace a definition wholesale
///
/// PUT /workflows/definitions/{id}
async fn replace_definition(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: String,
) -> Result<Json<WorkflowDefinition>> {
    let request = parse_request(&body)?;
    let definition = state.engine.definitions().replace(&id, request).await?;
    state.engine.functions().warn_unresolved(&definition);

    Ok(Json(definition))
}

/// DELETE /workflows/definitions/{id}
async fn delete_definition(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    state.engine.definitions().delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
