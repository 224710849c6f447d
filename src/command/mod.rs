//! Undoable import operations against a [`DiagramStore`].
//!
//! DESIGN
//! ======
//! One [`Command`] capability, three strategies: create from pasted DSL,
//! replace an existing preview, and bulk restore with known identifiers.
//! Callers hold `Box<dyn Command>` and never branch on the concrete type.
//!
//! Commands hold store identifiers only. The DSL-local `NodeId` space ends at
//! projection; from there on shapes are addressed by index until the store
//! assigns `ShapeId`s, which are read off the tail of each returned diagram.
//!
//! A store error mid-sequence is propagated as-is. Whatever was created before
//! the failure stays in the store; nothing is rolled back.

pub mod create;
pub mod history;
pub mod restore;
pub mod update;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub use create::CreateDiagramCommand;
pub use history::CommandQueue;
pub use restore::RestoreSnapshotCommand;
pub use update::UpdatePreviewCommand;

use crate::config::LayoutConfig;
use crate::dsl::{DiagramKind, FormatError, parse};
use crate::error::ErrorCode;
use crate::layout::{Rect, layout_diagram};
use crate::projection::{Projection, ReferenceError, ShapeRef, project};
use crate::store::{ConnectorId, Diagram, DiagramId, DiagramStore, NewConnector, NewShape, Shape, ShapeId, ShapePatch, StoreError};

/// Shape kind of the summary container that tracks one import.
pub const CONTAINER_KIND: &str = "diagram_container";

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ErrorCode for CommandError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Format(e) => e.error_code(),
            Self::Store(e) => e.error_code(),
        }
    }

    fn retryable(&self) -> bool {
        match self {
            Self::Format(e) => e.retryable(),
            Self::Store(e) => e.retryable(),
        }
    }
}

// =============================================================================
// COMMAND TRAIT
// =============================================================================

/// An atomic, undoable user action.
///
/// `undo` before `execute`, or a second `undo`, logs a warning and does nothing.
#[async_trait::async_trait]
pub trait Command: Send + Sync {
    fn description(&self) -> String;

    /// # Errors
    ///
    /// Fails on malformed DSL (before any store mutation) or on a store error.
    async fn execute(&mut self, store: &dyn DiagramStore) -> Result<(), CommandError>;

    /// # Errors
    ///
    /// Returns the first store error hit while reverting.
    async fn undo(&mut self, store: &dyn DiagramStore) -> Result<(), CommandError>;

    /// What the last `execute` created, if this command creates content.
    fn created(&self) -> Option<&Created> {
        None
    }
}

// =============================================================================
// SHARED TYPES
// =============================================================================

/// Where the summary container's top-left corner goes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Origin {
    pub x: f64,
    pub y: f64,
}

/// Identifiers created by one import, tracked for undo.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Created {
    pub container_id: Option<ShapeId>,
    pub shape_ids: Vec<ShapeId>,
    pub connector_ids: Vec<ConnectorId>,
}

/// Parse, lay out and project one DSL text. Pure; touches no store.
///
/// # Errors
///
/// Returns a [`FormatError`] when the header does not match `kind`.
pub fn prepare(kind: DiagramKind, source: &str, config: &LayoutConfig) -> Result<Projection, FormatError> {
    let diagram = parse(source, kind)?;
    let layout = layout_diagram(&diagram, config);
    Ok(project(&diagram, &layout))
}

// =============================================================================
// CREATE PIPELINE
// =============================================================================

/// Everything needed to write one projection into a diagram.
pub(crate) struct Import<'a> {
    pub diagram_id: DiagramId,
    pub kind: DiagramKind,
    pub source: &'a str,
    pub origin: Origin,
    pub config: &'a LayoutConfig,
}

/// Create shapes, parent links, connectors and the summary container.
pub(crate) async fn create_content(
    store: &dyn DiagramStore,
    import: &Import<'_>,
    mut projection: Projection,
) -> Result<Created, StoreError> {
    let diagram = import.diagram_id;
    let pad = import.config.container_padding;
    projection.move_to(import.origin.x + pad, import.origin.y + pad);

    // 1. Shapes, in index order.
    let new_shapes: Vec<NewShape> = projection.shapes.iter().map(shape_payload).collect();
    let shape_ids = if store.supports_batch() {
        add_shapes_batched(store, diagram, new_shapes).await?
    } else {
        add_shapes_sequential(store, diagram, new_shapes).await?
    };

    // 2. Parent links, after every shape exists.
    for s in &projection.shapes {
        let Some(parent) = s.parent_index else {
            continue;
        };
        let patch = ShapePatch { parent_id: Some(shape_ids[parent]) };
        if store.update_shape(diagram, shape_ids[s.index], patch).await?.is_none() {
            warn!(%diagram, shape = %shape_ids[s.index], "command: parent link target vanished");
        }
    }

    // 3. Connectors, endpoints resolved through the index map.
    let mut new_connectors = Vec::with_capacity(projection.connectors.len());
    for c in &projection.connectors {
        let from = shape_ids.get(c.from_shape_index).ok_or(ReferenceError::UnknownShapeIndex(c.from_shape_index));
        let to = shape_ids.get(c.to_shape_index).ok_or(ReferenceError::UnknownShapeIndex(c.to_shape_index));
        match (from, to) {
            (Ok(&from_shape), Ok(&to_shape)) => new_connectors.push(NewConnector {
                from_shape,
                to_shape,
                source_dir: c.source_dir,
                target_dir: c.target_dir,
                bidirectional: c.bidirectional,
                label: c.label.clone(),
            }),
            (Err(e), _) | (_, Err(e)) => warn!(%diagram, error = %e, "command: skipped connector"),
        }
    }
    let connector_ids = if store.supports_batch() {
        add_connectors_batched(store, diagram, new_connectors).await?
    } else {
        add_connectors_sequential(store, diagram, new_connectors).await?
    };

    // 4. Summary container.
    let content = projection
        .bounds()
        .unwrap_or(Rect { x: import.origin.x + pad, y: import.origin.y + pad, width: 0.0, height: 0.0 });
    let frame = content.inflate(pad);
    let container = NewShape {
        kind: CONTAINER_KIND.to_owned(),
        x: frame.x,
        y: frame.y,
        width: frame.width,
        height: frame.height,
        parent_id: None,
        props: serde_json::json!({
            "shapeIds": shape_ids,
            "connectorIds": connector_ids,
            "diagramType": import.kind.as_str(),
            "source": import.source,
        }),
    };
    let doc = store.add_shape(diagram, container).await?;
    let container_id = tail_shape_ids(&doc, 1)?.first().copied();

    debug!(%diagram, shapes = shape_ids.len(), connectors = connector_ids.len(), "command: content created");
    Ok(Created { container_id, shape_ids, connector_ids })
}

/// Delete container, then connectors, then shapes.
pub(crate) async fn remove_content(store: &dyn DiagramStore, diagram: DiagramId, created: &Created) -> Result<(), StoreError> {
    if let Some(container) = created.container_id {
        store.delete_shape(diagram, container).await?;
    }
    if !created.connector_ids.is_empty() {
        store.delete_connectors(diagram, &created.connector_ids).await?;
    }
    if !created.shape_ids.is_empty() {
        store.delete_shapes(diagram, &created.shape_ids).await?;
    }
    Ok(())
}

/// Tracked ids recorded in a container's `props`, `None` if it is not a container.
#[must_use]
pub fn container_members(shape: &Shape) -> Option<(Vec<ShapeId>, Vec<ConnectorId>)> {
    if shape.kind != CONTAINER_KIND {
        return None;
    }
    let shapes = serde_json::from_value(shape.props.get("shapeIds")?.clone()).ok()?;
    let connectors = serde_json::from_value(shape.props.get("connectorIds")?.clone()).ok()?;
    Some((shapes, connectors))
}

fn shape_payload(s: &ShapeRef) -> NewShape {
    let mut props = serde_json::json!({ "label": s.label });
    if let Some(icon) = &s.icon {
        props["icon"] = serde_json::Value::String(icon.clone());
    }
    NewShape {
        kind: s.kind.keyword().to_owned(),
        x: s.x,
        y: s.y,
        width: s.width,
        height: s.height,
        parent_id: None,
        props,
    }
}

// =============================================================================
// ID HARVESTING
// =============================================================================

fn tail_shape_ids(doc: &Diagram, n: usize) -> Result<Vec<ShapeId>, StoreError> {
    let found = doc.shapes.len();
    if found < n {
        return Err(StoreError::MissingCreatedIds { expected: n, found });
    }
    Ok(doc.shapes[found - n..].iter().map(|s| s.id).collect())
}

fn tail_connector_ids(doc: &Diagram, n: usize) -> Result<Vec<ConnectorId>, StoreError> {
    let found = doc.connectors.len();
    if found < n {
        return Err(StoreError::MissingCreatedIds { expected: n, found });
    }
    Ok(doc.connectors[found - n..].iter().map(|c| c.id).collect())
}

async fn add_shapes_batched(
    store: &dyn DiagramStore,
    diagram: DiagramId,
    shapes: Vec<NewShape>,
) -> Result<Vec<ShapeId>, StoreError> {
    if shapes.is_empty() {
        return Ok(Vec::new());
    }
    let n = shapes.len();
    let doc = store.add_shapes_batch(diagram, shapes).await?;
    tail_shape_ids(&doc, n)
}

async fn add_shapes_sequential(
    store: &dyn DiagramStore,
    diagram: DiagramId,
    shapes: Vec<NewShape>,
) -> Result<Vec<ShapeId>, StoreError> {
    let mut ids = Vec::with_capacity(shapes.len());
    for shape in shapes {
        let doc = store.add_shape(diagram, shape).await?;
        ids.extend(tail_shape_ids(&doc, 1)?);
    }
    Ok(ids)
}

async fn add_connectors_batched(
    store: &dyn DiagramStore,
    diagram: DiagramId,
    connectors: Vec<NewConnector>,
) -> Result<Vec<ConnectorId>, StoreError> {
    if connectors.is_empty() {
        return Ok(Vec::new());
    }
    let n = connectors.len();
    let doc = store.add_connectors_batch(diagram, connectors).await?;
    tail_connector_ids(&doc, n)
}

async fn add_connectors_sequential(
    store: &dyn DiagramStore,
    diagram: DiagramId,
    connectors: Vec<NewConnector>,
) -> Result<Vec<ConnectorId>, StoreError> {
    let mut ids = Vec::with_capacity(connectors.len());
    for connector in connectors {
        let doc = store.add_connector(diagram, connector).await?;
        ids.extend(tail_connector_ids(&doc, 1)?);
    }
    Ok(ids)
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
