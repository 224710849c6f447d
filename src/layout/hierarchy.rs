//! Containment layout for architecture diagrams.
//!
//! DESIGN
//! ======
//! Two passes over the group forest. Sizes are computed bottom-up (a group is
//! its children's grid plus padding, floored at the minimum container size),
//! then positions top-down, because placing a nested group needs its final
//! size. Children sit in a grid of at most `max_columns` columns, each centered
//! in its cell.
//!
//! A declared parent only counts if it exists, is a group, and does not close a
//! parent cycle. Anything else becomes a top-level node.

use std::collections::HashMap;

use crate::config::LayoutConfig;
use crate::dsl::ParsedNode;

use super::LayoutNode;

const LEAF_SIZE: f64 = 80.0;

/// Lay out a group forest. Output is index-aligned with `nodes`.
#[must_use]
pub fn layout(nodes: &[ParsedNode], config: &LayoutConfig) -> Vec<LayoutNode> {
    let tree = Tree::build(nodes);

    let mut sizes = vec![(0.0, 0.0); nodes.len()];
    for &root in &tree.roots {
        measure(root, &tree, nodes, config, &mut sizes);
    }

    let mut out: Vec<LayoutNode> = nodes
        .iter()
        .zip(&sizes)
        .map(|(n, &(w, h))| LayoutNode::new(n.clone(), w, h))
        .collect();

    let (groups, orphans): (Vec<usize>, Vec<usize>) = tree
        .roots
        .iter()
        .copied()
        .partition(|&i| nodes[i].kind.is_container());

    let mut x = 0.0;
    let mut tallest: f64 = 0.0;
    for &g in &groups {
        place(g, x, 0.0, &tree, &sizes, config, &mut out);
        x += out[g].width + config.group_spacing;
        tallest = tallest.max(out[g].height);
    }

    if !orphans.is_empty() {
        let y = if groups.is_empty() { 0.0 } else { tallest + config.orphan_row_spacing };
        let grid = Grid::measure(&orphans, &sizes, config.max_columns);
        grid.place(&orphans, 0.0, y, &sizes, config, &mut |i, cx, cy| {
            place(i, cx, cy, &tree, &sizes, config, &mut out);
        });
    }

    out
}

// =============================================================================
// TREE
// =============================================================================

struct Tree {
    /// Children per node, declaration order.
    children: Vec<Vec<usize>>,
    /// Nodes without a valid parent, declaration order.
    roots: Vec<usize>,
}

impl Tree {
    fn build(nodes: &[ParsedNode]) -> Self {
        let mut children = vec![Vec::new(); nodes.len()];
        let mut roots = Vec::new();
        for (i, p) in parent_indices(nodes).iter().enumerate() {
            match p {
                Some(p) => children[*p].push(i),
                None => roots.push(i),
            }
        }
        Self { children, roots }
    }
}

/// Effective parent of every node, index-aligned with `nodes`.
///
/// `None` when the declared parent is missing, not a group, the node itself,
/// or part of a parent cycle through this node.
#[must_use]
pub fn parent_indices(nodes: &[ParsedNode]) -> Vec<Option<usize>> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    for (i, n) in nodes.iter().enumerate() {
        index.entry(n.id.as_str()).or_insert(i);
    }

    let declared: Vec<Option<usize>> = nodes
        .iter()
        .enumerate()
        .map(|(i, n)| {
            let p = *index.get(n.parent.as_ref()?.as_str())?;
            (p != i && nodes[p].kind.is_container()).then_some(p)
        })
        .collect();

    (0..nodes.len())
        .map(|i| if on_cycle(i, &declared) { None } else { declared[i] })
        .collect()
}

/// True if following parents from `start` leads back to `start`.
fn on_cycle(start: usize, parent: &[Option<usize>]) -> bool {
    let mut seen = vec![false; parent.len()];
    let mut cur = parent[start];
    while let Some(p) = cur {
        if p == start {
            return true;
        }
        if seen[p] {
            // Cycle above us, not through us.
            return false;
        }
        seen[p] = true;
        cur = parent[p];
    }
    false
}

// =============================================================================
// SIZE PASS (bottom-up)
// =============================================================================

fn measure(idx: usize, tree: &Tree, nodes: &[ParsedNode], config: &LayoutConfig, sizes: &mut [(f64, f64)]) {
    if !nodes[idx].kind.is_container() {
        sizes[idx] = (LEAF_SIZE, LEAF_SIZE);
        return;
    }

    let kids = &tree.children[idx];
    if kids.is_empty() {
        sizes[idx] = (config.min_container_width, config.min_container_height);
        return;
    }

    for &k in kids {
        measure(k, tree, nodes, config, sizes);
    }
    let grid = Grid::measure(kids, sizes, config.max_columns);
    let pad = config.group_padding;
    sizes[idx] = (
        (grid.width(config) + pad.horizontal()).max(config.min_container_width),
        (grid.height(config) + pad.vertical()).max(config.min_container_height),
    );
}

// =============================================================================
// POSITION PASS (top-down)
// =============================================================================

fn place(
    idx: usize,
    x: f64,
    y: f64,
    tree: &Tree,
    sizes: &[(f64, f64)],
    config: &LayoutConfig,
    out: &mut [LayoutNode],
) {
    out[idx].x = x;
    out[idx].y = y;

    let kids = &tree.children[idx];
    if kids.is_empty() {
        return;
    }

    let grid = Grid::measure(kids, sizes, config.max_columns);
    let pad = config.group_padding;
    let (w, h) = sizes[idx];

    // Center the grid inside the padded area when the minimum size left slack.
    let origin_x = x + pad.left + ((w - pad.horizontal() - grid.width(config)) / 2.0).max(0.0);
    let origin_y = y + pad.top + ((h - pad.vertical() - grid.height(config)) / 2.0).max(0.0);

    grid.place(kids, origin_x, origin_y, sizes, config, &mut |i, cx, cy| {
        place(i, cx, cy, tree, sizes, config, &mut *out);
    });
}

// =============================================================================
// GRID
// =============================================================================

/// Column widths and row heights for one sibling set.
struct Grid {
    columns: usize,
    col_widths: Vec<f64>,
    row_heights: Vec<f64>,
}

impl Grid {
    fn measure(items: &[usize], sizes: &[(f64, f64)], max_columns: usize) -> Self {
        let columns = max_columns.max(1).min(items.len()).max(1);
        let rows = items.len().div_ceil(columns);
        let mut col_widths = vec![0.0_f64; columns];
        let mut row_heights = vec![0.0_f64; rows];
        for (pos, &i) in items.iter().enumerate() {
            let (w, h) = sizes[i];
            col_widths[pos % columns] = col_widths[pos % columns].max(w);
            row_heights[pos / columns] = row_heights[pos / columns].max(h);
        }
        Self { columns, col_widths, row_heights }
    }

    fn width(&self, config: &LayoutConfig) -> f64 {
        #[allow(clippy::cast_precision_loss)]
        let gaps = self.col_widths.len().saturating_sub(1) as f64 * config.horizontal_spacing;
        self.col_widths.iter().sum::<f64>() + gaps
    }

    fn height(&self, config: &LayoutConfig) -> f64 {
        #[allow(clippy::cast_precision_loss)]
        let gaps = self.row_heights.len().saturating_sub(1) as f64 * config.vertical_spacing;
        self.row_heights.iter().sum::<f64>() + gaps
    }

    /// Compute each item's centered cell position and hand it to `visit`.
    fn place(
        &self,
        items: &[usize],
        origin_x: f64,
        origin_y: f64,
        sizes: &[(f64, f64)],
        config: &LayoutConfig,
        visit: &mut dyn FnMut(usize, f64, f64),
    ) {
        for (pos, &i) in items.iter().enumerate() {
            let (col, row) = (pos % self.columns, pos / self.columns);
            #[allow(clippy::cast_precision_loss)]
            let cell_x = origin_x + self.col_widths[..col].iter().sum::<f64>() + col as f64 * config.horizontal_spacing;
            #[allow(clippy::cast_precision_loss)]
            let cell_y = origin_y + self.row_heights[..row].iter().sum::<f64>() + row as f64 * config.vertical_spacing;
            let (w, h) = sizes[i];
            visit(i, cell_x + (self.col_widths[col] - w) / 2.0, cell_y + (self.row_heights[row] - h) / 2.0);
        }
    }
}

#[cfg(test)]
#[path = "hierarchy_test.rs"]
mod tests;
