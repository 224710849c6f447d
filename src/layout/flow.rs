//! Row/branch layout for process flows.
//!
//! DESIGN
//! ======
//! Flow reads left to right. Every row keeps its own X cursor. A gateway keeps
//! its longest branch on its own row and pushes every shorter branch onto a new
//! row below, seeded at the column where the continuing branch starts, so all
//! branches of one gateway begin in the same column.
//!
//! The walk threads an explicit `Placement` (cursors + visited set) instead of
//! shared state: a node is placed by the first branch that reaches it, which is
//! also what terminates cycles and converging branches.

use std::collections::HashMap;

use crate::config::LayoutConfig;
use crate::dsl::{NodeKind, ParsedConnection, ParsedNode};

use super::LayoutNode;

const EVENT_SIZE: f64 = 40.0;
const GATEWAY_SIZE: f64 = 60.0;
const TASK_MIN_WIDTH: f64 = 120.0;
const TASK_HEIGHT: f64 = 60.0;
const LABEL_CHAR_WIDTH: f64 = 8.0;
const LABEL_PADDING: f64 = 24.0;

/// Lay out a flow graph. Output is index-aligned with `nodes`.
#[must_use]
pub fn layout(nodes: &[ParsedNode], connections: &[ParsedConnection], config: &LayoutConfig) -> Vec<LayoutNode> {
    if nodes.is_empty() {
        return Vec::new();
    }

    let graph = Adjacency::build(nodes, connections);
    let mut out: Vec<LayoutNode> = nodes
        .iter()
        .map(|n| {
            let (w, h) = node_size(n);
            LayoutNode::new(n.clone(), w, h)
        })
        .collect();
    let widths: Vec<f64> = out.iter().map(|n| n.width).collect();

    let mut placement = Placement::new(nodes.len());
    for start in start_nodes(nodes, &graph) {
        if placement.row_of[start].is_some() {
            continue;
        }
        // Each further start begins its own row below the previous ones.
        let row = placement.alloc_row(0.0);
        walk(start, row, &graph, &widths, config, &mut placement);
    }

    // Unreached nodes share one row below everything else.
    if placement.row_of.iter().any(Option::is_none) {
        let row = placement.alloc_row(0.0);
        for idx in 0..nodes.len() {
            if placement.row_of[idx].is_none() {
                placement.place(idx, row, widths[idx], config.horizontal_spacing);
            }
        }
    }

    let rows = compact_rows(&placement.row_of);
    for (idx, n) in out.iter_mut().enumerate() {
        n.x = placement.x[idx];
        #[allow(clippy::cast_precision_loss)]
        let y = rows[idx] as f64 * config.vertical_spacing;
        n.y = y;
    }

    center_rows(&mut out, &rows);
    out
}

/// Default box for a flow node.
#[must_use]
pub fn node_size(node: &ParsedNode) -> (f64, f64) {
    match node.kind {
        NodeKind::Start | NodeKind::End => (EVENT_SIZE, EVENT_SIZE),
        NodeKind::Gateway => (GATEWAY_SIZE, GATEWAY_SIZE),
        NodeKind::Task | NodeKind::Group | NodeKind::Service => {
            #[allow(clippy::cast_precision_loss)]
            let text_w = node.label.chars().count() as f64 * LABEL_CHAR_WIDTH + LABEL_PADDING;
            (text_w.max(TASK_MIN_WIDTH), TASK_HEIGHT)
        }
    }
}

// =============================================================================
// GRAPH
// =============================================================================

/// Forward/backward adjacency by declaration index. Duplicate edges collapse.
struct Adjacency {
    outgoing: Vec<Vec<usize>>,
    incoming: Vec<Vec<usize>>,
}

impl Adjacency {
    fn build(nodes: &[ParsedNode], connections: &[ParsedConnection]) -> Self {
        let index: HashMap<&str, usize> = nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.id.as_str(), i))
            .collect();

        let mut outgoing = vec![Vec::new(); nodes.len()];
        let mut incoming = vec![Vec::new(); nodes.len()];
        for c in connections {
            let (Some(&s), Some(&t)) = (index.get(c.source.as_str()), index.get(c.target.as_str())) else {
                continue;
            };
            if !outgoing[s].contains(&t) {
                outgoing[s].push(t);
                incoming[t].push(s);
            }
        }
        Self { outgoing, incoming }
    }
}

/// Nodes with no incoming edge, explicit `start` nodes first.
/// Falls back to the first declared node when every node has a predecessor.
fn start_nodes(nodes: &[ParsedNode], graph: &Adjacency) -> Vec<usize> {
    let mut starts: Vec<usize> = (0..nodes.len())
        .filter(|&i| graph.incoming[i].is_empty())
        .collect();
    if starts.is_empty() {
        starts.push(0);
    }
    starts.sort_by_key(|&i| nodes[i].kind != NodeKind::Start);
    starts
}

/// Number of nodes reachable from `from`, itself included.
///
/// Revisits within this one computation count zero, which bounds cycles.
fn branch_length(from: usize, graph: &Adjacency) -> usize {
    let mut seen = vec![false; graph.outgoing.len()];
    let mut stack = vec![from];
    let mut count = 0;
    while let Some(idx) = stack.pop() {
        if seen[idx] {
            continue;
        }
        seen[idx] = true;
        count += 1;
        stack.extend(graph.outgoing[idx].iter().rev().filter(|&&t| !seen[t]));
    }
    count
}

// =============================================================================
// PLACEMENT
// =============================================================================

/// Mutable walk state: per-row X cursors plus the first-writer-wins visited set.
struct Placement {
    cursors: Vec<f64>,
    row_of: Vec<Option<usize>>,
    x: Vec<f64>,
}

impl Placement {
    fn new(len: usize) -> Self {
        Self { cursors: Vec::new(), row_of: vec![None; len], x: vec![0.0; len] }
    }

    /// A new row below every row allocated so far.
    fn alloc_row(&mut self, seed_x: f64) -> usize {
        self.cursors.push(seed_x);
        self.cursors.len() - 1
    }

    fn place(&mut self, idx: usize, row: usize, width: f64, spacing: f64) {
        self.row_of[idx] = Some(row);
        self.x[idx] = self.cursors[row];
        self.cursors[row] += width + spacing;
    }
}

fn walk(
    start: usize,
    row: usize,
    graph: &Adjacency,
    widths: &[f64],
    config: &LayoutConfig,
    placement: &mut Placement,
) {
    let mut current = start;
    loop {
        if placement.row_of[current].is_some() {
            return;
        }
        placement.place(current, row, widths[current], config.horizontal_spacing);

        let next: Vec<usize> = graph.outgoing[current]
            .iter()
            .copied()
            .filter(|&t| placement.row_of[t].is_none())
            .collect();

        match next.as_slice() {
            [] => return,
            [only] => current = *only,
            _ => {
                branch(&next, row, graph, widths, config, placement);
                return;
            }
        }
    }
}

/// Gateway rule: longest branch stays on `row`, the rest get new rows seeded
/// at the column where the longest branch starts.
fn branch(
    targets: &[usize],
    row: usize,
    graph: &Adjacency,
    widths: &[f64],
    config: &LayoutConfig,
    placement: &mut Placement,
) {
    let mut ranked: Vec<(usize, usize)> = targets.iter().map(|&t| (t, branch_length(t, graph))).collect();
    // Stable: equal lengths keep declaration order.
    ranked.sort_by(|a, b| b.1.cmp(&a.1));

    let branch_x = placement.cursors[row];
    let others: Vec<(usize, usize)> = ranked[1..]
        .iter()
        .map(|&(t, _)| (t, placement.alloc_row(branch_x)))
        .collect();

    walk(ranked[0].0, row, graph, widths, config, placement);
    for (target, target_row) in others {
        walk(target, target_row, graph, widths, config, placement);
    }
}

/// Map allocated rows to dense indices, dropping rows that ended up empty
/// (a branch whose first node was claimed by a longer sibling).
fn compact_rows(row_of: &[Option<usize>]) -> Vec<usize> {
    let max_row = row_of.iter().flatten().copied().max().unwrap_or(0);
    let mut used = vec![false; max_row + 1];
    for r in row_of.iter().flatten() {
        used[*r] = true;
    }
    let mut dense = vec![0; max_row + 1];
    let mut next = 0;
    for (r, is_used) in used.iter().enumerate() {
        if *is_used {
            dense[r] = next;
            next += 1;
        }
    }
    row_of.iter().map(|r| r.map_or(0, |r| dense[r])).collect()
}

/// Vertically center each node against the tallest node on its row.
///
/// Rows are grouped by index, not by Y, so any `vertical_spacing` keeps them apart.
fn center_rows(nodes: &mut [LayoutNode], rows: &[usize]) {
    let row_count = rows.iter().max().map_or(0, |r| r + 1);
    let mut tallest = vec![0.0_f64; row_count];
    for (n, &r) in nodes.iter().zip(rows) {
        tallest[r] = tallest[r].max(n.height);
    }
    for (n, &r) in nodes.iter_mut().zip(rows) {
        n.y += (tallest[r] - n.height) / 2.0;
    }
}

#[cfg(test)]
#[path = "flow_test.rs"]
mod tests;
