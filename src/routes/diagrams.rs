//! Layout preview and diagram import routes.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::command::{CommandError, Created};
use crate::config::LayoutOverrides;
use crate::error::ErrorCode;
use crate::layout::center_layout;
use crate::services::import::{self, ImportRequest, LayoutPreview};
use crate::state::AppState;
use crate::store::{Connector, DiagramId, Shape, StoreError};

/// JSON error body shared by every route.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
    pub retryable: bool,
}

type ApiError = (StatusCode, Json<ErrorBody>);

#[derive(Deserialize)]
pub struct LayoutBody {
    pub diagram_type: String,
    pub dsl: String,
    #[serde(default)]
    pub layout: Option<LayoutOverrides>,
    /// Re-center the preview's bounding box on the origin.
    #[serde(default)]
    pub center: bool,
}

#[derive(Deserialize)]
pub struct RestoreBody {
    #[serde(default)]
    pub shapes: Vec<Shape>,
    #[serde(default)]
    pub connectors: Vec<Connector>,
}

#[derive(Serialize)]
pub struct UndoResponse {
    pub undone: Option<String>,
}

/// `POST /api/layout`: dry-run layout, no store mutation.
pub async fn layout_preview(
    State(state): State<AppState>,
    Json(body): Json<LayoutBody>,
) -> Result<Json<LayoutPreview>, ApiError> {
    let mut preview = import::preview(&body.diagram_type, &body.dsl, &state.layout, body.layout.as_ref())
        .map_err(|e| command_error_to_response(&CommandError::Format(e)))?;
    if body.center {
        center_layout(&mut preview.nodes);
    }
    Ok(Json(preview))
}

/// `POST /api/diagrams/{id}/import`: create content, or replace `preview_id`.
pub async fn import_diagram(
    State(state): State<AppState>,
    Path(diagram_id): Path<DiagramId>,
    Json(body): Json<ImportRequest>,
) -> Result<Json<Created>, ApiError> {
    import::import(&state, diagram_id, body)
        .await
        .map(Json)
        .map_err(|e| command_error_to_response(&e))
}

/// `POST /api/diagrams/{id}/restore`: put shapes and connectors back under their ids.
pub async fn restore_snapshot(
    State(state): State<AppState>,
    Path(diagram_id): Path<DiagramId>,
    Json(body): Json<RestoreBody>,
) -> Result<Json<serde_json::Value>, ApiError> {
    import::restore(&state, diagram_id, body.shapes, body.connectors)
        .await
        .map_err(|e| command_error_to_response(&e))?;
    Ok(Json(serde_json::json!({ "ok": true })))
}

/// `POST /api/diagrams/{id}/undo`: revert the latest command on this diagram.
pub async fn undo(
    State(state): State<AppState>,
    Path(diagram_id): Path<DiagramId>,
) -> Result<Json<UndoResponse>, ApiError> {
    let undone = import::undo(&state, diagram_id)
        .await
        .map_err(|e| command_error_to_response(&e))?;
    Ok(Json(UndoResponse { undone }))
}

pub(crate) fn command_error_to_status(err: &CommandError) -> StatusCode {
    match err {
        CommandError::Format(_) => StatusCode::BAD_REQUEST,
        CommandError::Store(StoreError::DiagramNotFound(_)) => StatusCode::NOT_FOUND,
        CommandError::Store(_) => StatusCode::BAD_GATEWAY,
    }
}

pub(crate) fn error_body(err: &CommandError) -> ErrorBody {
    ErrorBody { code: err.error_code(), message: err.to_string(), retryable: err.retryable() }
}

fn command_error_to_response(err: &CommandError) -> ApiError {
    let status = command_error_to_status(err);
    if status.is_server_error() {
        warn!(error = %err, code = err.error_code(), "diagram request failed");
    }
    (status, Json(error_body(err)))
}

#[cfg(test)]
#[path = "diagrams_test.rs"]
mod tests;
