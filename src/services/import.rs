//! Layout preview, import, restore and undo for one diagram.
//!
//! DESIGN
//! ======
//! Preview is pure: parse, lay out and project without touching the store.
//! Everything that mutates goes through the diagram's [`CommandQueue`] so
//! concurrent requests against one diagram are applied one at a time and can
//! be undone in reverse order.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::command::{
    Command, CommandError, Created, CreateDiagramCommand, Origin, RestoreSnapshotCommand, UpdatePreviewCommand,
};
use crate::config::{LayoutConfig, LayoutOverrides};
use crate::dsl::{Diagnostic, DiagramKind, FormatError, parse_with_diagnostics};
use crate::layout::{LayoutNode, layout_diagram};
use crate::projection::{ConnectorRef, project};
use crate::state::AppState;
use crate::store::{Connector, DiagramId, Shape, ShapeId};

// =============================================================================
// TYPES
// =============================================================================

/// Positioned result of a dry-run layout.
#[derive(Debug, Clone, Serialize)]
pub struct LayoutPreview {
    pub diagram_type: DiagramKind,
    pub nodes: Vec<LayoutNode>,
    pub connectors: Vec<ConnectorRef>,
    /// Lines the lenient parser skipped.
    pub diagnostics: Vec<Diagnostic>,
    /// Connections dropped because an endpoint was unknown.
    pub dropped_connections: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImportRequest {
    pub diagram_type: String,
    pub dsl: String,
    #[serde(default)]
    pub origin: Option<Origin>,
    #[serde(default)]
    pub layout: Option<LayoutOverrides>,
    /// Container of an earlier import to replace.
    #[serde(default)]
    pub preview_id: Option<ShapeId>,
}

/// Resolve a caller-supplied diagram type name.
///
/// # Errors
///
/// Returns [`FormatError::UnknownDiagramType`] for anything but the two families.
pub fn resolve_kind(name: &str) -> Result<DiagramKind, FormatError> {
    DiagramKind::from_name(name).ok_or_else(|| FormatError::UnknownDiagramType(name.to_owned()))
}

fn effective_layout(base: &LayoutConfig, overrides: Option<&LayoutOverrides>) -> LayoutConfig {
    overrides.map_or(*base, |o| base.with_overrides(o))
}

// =============================================================================
// OPERATIONS
// =============================================================================

/// Dry-run layout of DSL text.
///
/// # Errors
///
/// Returns a [`FormatError`] for an unknown type name or a bad header.
pub fn preview(
    diagram_type: &str,
    dsl: &str,
    base: &LayoutConfig,
    overrides: Option<&LayoutOverrides>,
) -> Result<LayoutPreview, FormatError> {
    let kind = resolve_kind(diagram_type)?;
    let (diagram, diagnostics) = parse_with_diagnostics(dsl, kind)?;
    let nodes = layout_diagram(&diagram, &effective_layout(base, overrides));
    let projection = project(&diagram, &nodes);
    Ok(LayoutPreview {
        diagram_type: kind,
        nodes,
        connectors: projection.connectors,
        diagnostics,
        dropped_connections: projection.dropped.len(),
    })
}

/// Import DSL text into `diagram`, replacing `preview_id` when given.
///
/// # Errors
///
/// Returns a [`CommandError`] for malformed input or a store failure.
pub async fn import(state: &AppState, diagram: DiagramId, req: ImportRequest) -> Result<Created, CommandError> {
    let kind = resolve_kind(&req.diagram_type)?;
    let config = effective_layout(&state.layout, req.layout.as_ref());

    let cmd: Box<dyn Command> = match req.preview_id {
        Some(preview) => Box::new(UpdatePreviewCommand::new(diagram, preview, kind, req.dsl, config)),
        None => Box::new(CreateDiagramCommand::new(diagram, kind, req.dsl, req.origin.unwrap_or_default(), config)),
    };

    let created = state.queue(diagram).await.run(cmd).await?;
    let created = created.unwrap_or_default();
    info!(%diagram, kind = kind.as_str(), shapes = created.shape_ids.len(), "import: done");
    Ok(created)
}

/// Restore shapes and connectors under their existing identifiers.
///
/// # Errors
///
/// Returns a [`CommandError`] if the store rejects the snapshot.
pub async fn restore(
    state: &AppState,
    diagram: DiagramId,
    shapes: Vec<Shape>,
    connectors: Vec<Connector>,
) -> Result<(), CommandError> {
    let cmd = Box::new(RestoreSnapshotCommand::new(diagram, shapes, connectors));
    state.queue(diagram).await.run(cmd).await?;
    Ok(())
}

/// Undo the latest command on `diagram`. `None` when there is nothing to undo.
///
/// # Errors
///
/// Returns a [`CommandError`] if reverting hits a store failure.
pub async fn undo(state: &AppState, diagram: DiagramId) -> Result<Option<String>, CommandError> {
    let Some(queue) = state.existing_queue(diagram).await else {
        return Ok(None);
    };
    queue.undo_last().await
}

#[cfg(test)]
#[path = "import_test.rs"]
mod tests;
