//! Layout engines: parsed graph -> absolutely positioned nodes.
//!
//! Two deterministic, rule-based engines, one per DSL family:
//! - [`flow`]: left-to-right rows with gateway branches fanning downward.
//! - [`hierarchy`]: groups auto-sized around a fixed-column grid of children.
//!
//! Both are pure functions of their input. Shared geometry lives here.

pub mod flow;
pub mod hierarchy;

use serde::{Deserialize, Serialize};

use crate::config::LayoutConfig;
use crate::dsl::{DiagramKind, ParsedDiagram, ParsedNode};

/// Axis-aligned box.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    #[must_use]
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    #[must_use]
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// True when `other` lies entirely inside this box (edges may touch).
    #[must_use]
    pub fn contains(&self, other: &Rect) -> bool {
        const EPS: f64 = 1e-6;
        other.x >= self.x - EPS
            && other.y >= self.y - EPS
            && other.right() <= self.right() + EPS
            && other.bottom() <= self.bottom() + EPS
    }

    /// Grow the box by `margin` on every side.
    #[must_use]
    pub fn inflate(&self, margin: f64) -> Rect {
        Rect { x: self.x - margin, y: self.y - margin, width: self.width + 2.0 * margin, height: self.height + 2.0 * margin }
    }
}

/// A parsed node with its computed box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutNode {
    #[serde(flatten)]
    pub node: ParsedNode,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl LayoutNode {
    #[must_use]
    pub fn new(node: ParsedNode, width: f64, height: f64) -> Self {
        Self { node, x: 0.0, y: 0.0, width, height }
    }

    #[must_use]
    pub fn rect(&self) -> Rect {
        Rect { x: self.x, y: self.y, width: self.width, height: self.height }
    }
}

/// Lay out a parsed diagram with the engine matching its family.
///
/// Output is index-aligned with `diagram.nodes`.
#[must_use]
pub fn layout_diagram(diagram: &ParsedDiagram, config: &LayoutConfig) -> Vec<LayoutNode> {
    match diagram.kind {
        DiagramKind::Flow => flow::layout(&diagram.nodes, &diagram.connections, config),
        DiagramKind::Architecture => hierarchy::layout(&diagram.nodes, config),
    }
}

/// Bounding box of all nodes, `None` when empty.
#[must_use]
pub fn bounds(nodes: &[LayoutNode]) -> Option<Rect> {
    let first = nodes.first()?;
    let (mut min_x, mut min_y) = (first.x, first.y);
    let (mut max_x, mut max_y) = (first.x + first.width, first.y + first.height);
    for n in &nodes[1..] {
        min_x = min_x.min(n.x);
        min_y = min_y.min(n.y);
        max_x = max_x.max(n.x + n.width);
        max_y = max_y.max(n.y + n.height);
    }
    Some(Rect { x: min_x, y: min_y, width: max_x - min_x, height: max_y - min_y })
}

/// Shift every node by `(dx, dy)`.
pub fn translate(nodes: &mut [LayoutNode], dx: f64, dy: f64) {
    for n in nodes {
        n.x += dx;
        n.y += dy;
    }
}

/// Re-center the whole layout's bounding box on the origin.
pub fn center_layout(nodes: &mut [LayoutNode]) {
    let Some(b) = bounds(nodes) else {
        return;
    };
    let cx = b.x + b.width / 2.0;
    let cy = b.y + b.height / 2.0;
    translate(nodes, -cx, -cy);
}
