//! Positioned graph -> store creation payloads keyed by positional index.
//!
//! DESIGN
//! ======
//! Nothing here knows about store identifiers. Shapes are addressed by their
//! declaration index, and connectors name their endpoints by the same index.
//! The command layer owns the `index -> ShapeId` map once the store answers.
//!
//! Connections whose endpoints cannot be resolved are dropped here, so a typo
//! in one edge never fails the whole import.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::dsl::{DiagramKind, Direction, NodeId, NodeKind, ParsedDiagram};
use crate::layout::{LayoutNode, Rect, hierarchy};

// =============================================================================
// TYPES
// =============================================================================

/// One shape to create, positioned in layout space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeRef {
    pub index: usize,
    pub kind: NodeKind,
    pub label: String,
    pub icon: Option<String>,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub parent_index: Option<usize>,
}

impl ShapeRef {
    #[must_use]
    pub fn rect(&self) -> Rect {
        Rect { x: self.x, y: self.y, width: self.width, height: self.height }
    }
}

/// One connector to create, endpoints given as shape indices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectorRef {
    pub from_shape_index: usize,
    pub to_shape_index: usize,
    pub source_dir: Option<Direction>,
    pub target_dir: Option<Direction>,
    pub bidirectional: bool,
    pub label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReferenceError {
    #[error("connection references unknown node `{0}`")]
    UnknownNode(NodeId),
    #[error("connection references shape index {0}, which was never laid out")]
    UnknownShapeIndex(usize),
}

impl crate::error::ErrorCode for ReferenceError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::UnknownNode(_) => "E_REFERENCE_NODE",
            Self::UnknownShapeIndex(_) => "E_REFERENCE_INDEX",
        }
    }
}

/// Creation payloads for one import.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    pub shapes: Vec<ShapeRef>,
    pub connectors: Vec<ConnectorRef>,
    /// Connections skipped because an endpoint did not resolve.
    #[serde(skip)]
    pub dropped: Vec<ReferenceError>,
}

impl Projection {
    /// Bounding box of all shapes, `None` when there are none.
    #[must_use]
    pub fn bounds(&self) -> Option<Rect> {
        let mut rects = self.shapes.iter().map(ShapeRef::rect);
        let first = rects.next()?;
        Some(rects.fold(first, |acc, r| {
            let x = acc.x.min(r.x);
            let y = acc.y.min(r.y);
            Rect { x, y, width: acc.right().max(r.right()) - x, height: acc.bottom().max(r.bottom()) - y }
        }))
    }

    /// Move the content so its bounding box starts at `(x, y)`.
    pub fn move_to(&mut self, x: f64, y: f64) {
        let Some(b) = self.bounds() else {
            return;
        };
        let (dx, dy) = (x - b.x, y - b.y);
        for s in &mut self.shapes {
            s.x += dx;
            s.y += dy;
        }
    }
}

// =============================================================================
// PROJECT
// =============================================================================

/// Turn a parsed diagram and its index-aligned layout into creation payloads.
///
/// Parent links follow the same rules the containment layout applies, so a
/// shape is never linked to a parent it was not laid out inside.
#[must_use]
pub fn project(diagram: &ParsedDiagram, layout: &[LayoutNode]) -> Projection {
    let parents = match diagram.kind {
        DiagramKind::Architecture => hierarchy::parent_indices(&diagram.nodes),
        DiagramKind::Flow => vec![None; diagram.nodes.len()],
    };

    let shapes: Vec<ShapeRef> = layout
        .iter()
        .enumerate()
        .map(|(index, n)| ShapeRef {
            index,
            kind: n.node.kind,
            label: n.node.label.clone(),
            icon: n.node.icon.clone(),
            x: n.x,
            y: n.y,
            width: n.width,
            height: n.height,
            parent_index: parents.get(index).copied().flatten(),
        })
        .collect();

    let mut connectors = Vec::with_capacity(diagram.connections.len());
    let mut dropped = Vec::new();
    for c in &diagram.connections {
        let resolved = resolve(diagram, &c.source, shapes.len())
            .and_then(|from| resolve(diagram, &c.target, shapes.len()).map(|to| (from, to)));
        match resolved {
            Ok((from, to)) => connectors.push(ConnectorRef {
                from_shape_index: from,
                to_shape_index: to,
                source_dir: c.source_dir,
                target_dir: c.target_dir,
                bidirectional: c.bidirectional,
                label: c.label.clone(),
            }),
            Err(e) => {
                warn!(source = %c.source, target = %c.target, error = %e, "projection: dropped connection");
                dropped.push(e);
            }
        }
    }

    Projection { shapes, connectors, dropped }
}

fn resolve(diagram: &ParsedDiagram, id: &NodeId, shape_count: usize) -> Result<usize, ReferenceError> {
    let idx = diagram.node_index(id).ok_or_else(|| ReferenceError::UnknownNode(id.clone()))?;
    if idx >= shape_count {
        return Err(ReferenceError::UnknownShapeIndex(idx));
    }
    Ok(idx)
}
