//! Line-oriented parser for the flow and architecture DSL families.
//!
//! Each line after the header is tried as a connection first, then as a node
//! definition. Lines matching neither are skipped so partially supported input
//! still imports; [`parse_with_diagnostics`] reports what was skipped.

use tracing::debug;

use super::ast::{Diagnostic, DiagramKind, Direction, NodeId, NodeKind, ParsedConnection, ParsedDiagram, ParsedNode};

const COMMENT_MARKER: &str = "%%";

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormatError {
    #[error("empty input: expected `{expected}` header")]
    Empty { expected: &'static str },
    #[error("expected `{expected}` header, found `{found}`")]
    MissingHeader { expected: &'static str, found: String },
    #[error("unsupported diagram type: {0}")]
    UnknownDiagramType(String),
}

impl crate::error::ErrorCode for FormatError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Empty { .. } | Self::MissingHeader { .. } => "E_FORMAT_HEADER",
            Self::UnknownDiagramType(_) => "E_FORMAT_DIAGRAM_TYPE",
        }
    }
}

// =============================================================================
// ENTRY POINTS
// =============================================================================

/// Parse DSL text of the given family.
///
/// Unrecognized lines are skipped and only logged at debug level.
///
/// # Errors
///
/// Returns a [`FormatError`] if the first non-comment line is not the family header.
pub fn parse(input: &str, kind: DiagramKind) -> Result<ParsedDiagram, FormatError> {
    let (diagram, skipped) = parse_with_diagnostics(input, kind)?;
    for d in &skipped {
        debug!(line = d.line, text = %d.text, "dsl: skipped unrecognized line");
    }
    Ok(diagram)
}

/// Parse DSL text and also return every line the lenient grammar skipped.
///
/// The diagram is identical to what [`parse`] returns; authoring tools can use
/// the diagnostics to flag typos.
///
/// # Errors
///
/// Returns a [`FormatError`] if the first non-comment line is not the family header.
pub fn parse_with_diagnostics(
    input: &str,
    kind: DiagramKind,
) -> Result<(ParsedDiagram, Vec<Diagnostic>), FormatError> {
    let lines: Vec<(usize, &str)> = input
        .lines()
        .enumerate()
        .map(|(i, l)| (i + 1, l.trim()))
        .filter(|(_, l)| !l.is_empty() && !l.starts_with(COMMENT_MARKER))
        .collect();

    let expected = kind.header();
    let Some(&(_, header)) = lines.first() else {
        return Err(FormatError::Empty { expected });
    };
    if header != expected {
        return Err(FormatError::MissingHeader { expected, found: header.to_owned() });
    }

    let mut graph = GraphBuilder::default();
    let mut skipped = Vec::new();

    for &(line_no, line) in &lines[1..] {
        match kind {
            DiagramKind::Architecture => {
                if !parse_architecture_statement(line, &mut graph) {
                    skipped.push(Diagnostic { line: line_no, text: line.to_owned() });
                }
            }
            DiagramKind::Flow => {
                for stmt in split_statements(line) {
                    if !parse_flow_statement(stmt, &mut graph) {
                        skipped.push(Diagnostic { line: line_no, text: stmt.to_owned() });
                    }
                }
            }
        }
    }

    let diagram = ParsedDiagram { kind, nodes: graph.nodes, connections: graph.connections };
    Ok((diagram, skipped))
}

// =============================================================================
// GRAPH BUILDER
// =============================================================================

#[derive(Default)]
struct GraphBuilder {
    nodes: Vec<ParsedNode>,
    connections: Vec<ParsedConnection>,
}

impl GraphBuilder {
    fn position(&self, id: &str) -> Option<usize> {
        self.nodes.iter().position(|n| n.id.as_str() == id)
    }

    /// Declare a flow node on first reference from an edge.
    fn ensure_flow_node(&mut self, id: &str) {
        if self.position(id).is_none() {
            self.nodes.push(ParsedNode {
                id: NodeId::from(id),
                label: id.to_owned(),
                kind: implicit_flow_kind(id),
                icon: None,
                parent: None,
            });
        }
    }

    /// Flow node lines refine an implicit (or earlier) declaration in place.
    fn define_flow_node(&mut self, node: ParsedNode) {
        match self.position(node.id.as_str()) {
            Some(idx) => {
                let existing = &mut self.nodes[idx];
                existing.kind = node.kind;
                existing.label = node.label;
            }
            None => self.nodes.push(node),
        }
    }

    /// Architecture definitions are first-wins; a duplicate is reported as skipped.
    fn define_architecture_node(&mut self, node: ParsedNode) -> bool {
        if self.position(node.id.as_str()).is_some() {
            return false;
        }
        self.nodes.push(node);
        true
    }
}

fn implicit_flow_kind(id: &str) -> NodeKind {
    match id {
        "start" => NodeKind::Start,
        "end" => NodeKind::End,
        _ => NodeKind::Task,
    }
}

// =============================================================================
// ARCHITECTURE FAMILY
// =============================================================================

fn parse_architecture_statement(line: &str, graph: &mut GraphBuilder) -> bool {
    if let Some(conn) = parse_architecture_edge(line) {
        graph.connections.push(conn);
        return true;
    }
    if let Some(node) = parse_architecture_node(line) {
        return graph.define_architecture_node(node);
    }
    false
}

/// `<id>(:<dir>)? <arrow> (<dir>:)?<id>` with arrow one of `-->`, `<--`, `<-->`.
fn parse_architecture_edge(line: &str) -> Option<ParsedConnection> {
    let mut tokens = line.split_whitespace();
    let (left, arrow, right) = (tokens.next()?, tokens.next()?, tokens.next()?);
    if tokens.next().is_some() {
        return None;
    }

    let (left_id, left_dir) = match left.split_once(':') {
        Some((id, dir)) => (id, Some(parse_direction(dir)?)),
        None => (left, None),
    };
    let (right_dir, right_id) = match right.split_once(':') {
        Some((dir, id)) => (Some(parse_direction(dir)?), id),
        None => (None, right),
    };
    if !is_identifier(left_id) || !is_identifier(right_id) {
        return None;
    }

    let (source, source_dir, target, target_dir, bidirectional) = match arrow {
        "-->" => (left_id, left_dir, right_id, right_dir, false),
        "<--" => (right_id, right_dir, left_id, left_dir, false),
        "<-->" => (left_id, left_dir, right_id, right_dir, true),
        _ => return None,
    };

    Some(ParsedConnection {
        source: NodeId::from(source),
        target: NodeId::from(target),
        source_dir,
        target_dir,
        bidirectional,
        label: None,
    })
}

/// `{group|service} <id>(<icon>)[<label>]` with optional ` in <parent>`.
fn parse_architecture_node(line: &str) -> Option<ParsedNode> {
    let (keyword, rest) = line.split_once(char::is_whitespace)?;
    let kind = match keyword {
        "group" => NodeKind::Group,
        "service" => NodeKind::Service,
        _ => return None,
    };

    let (id, rest) = take_identifier(rest.trim_start())?;
    let (icon, rest) = take_delimited(rest, '(', ')')?;
    let (label, rest) = take_delimited(rest, '[', ']')?;

    let rest = rest.trim();
    let parent = if rest.is_empty() {
        None
    } else {
        let parent = rest.strip_prefix("in")?;
        if !parent.starts_with(char::is_whitespace) {
            return None;
        }
        let parent = parent.trim();
        if !is_identifier(parent) {
            return None;
        }
        Some(NodeId::from(parent))
    };

    if icon.trim().is_empty() {
        return None;
    }
    let label = if label.trim().is_empty() { id.to_owned() } else { label.trim().to_owned() };

    Some(ParsedNode { id: NodeId::from(id), label, kind, icon: Some(icon.trim().to_owned()), parent })
}

fn parse_direction(raw: &str) -> Option<Direction> {
    let mut chars = raw.chars();
    let dir = Direction::from_char(chars.next()?)?;
    if chars.next().is_some() {
        return None;
    }
    Some(dir)
}

// =============================================================================
// FLOW FAMILY
// =============================================================================

fn parse_flow_statement(stmt: &str, graph: &mut GraphBuilder) -> bool {
    if let Some((source, target, label)) = parse_flow_edge(stmt) {
        graph.ensure_flow_node(source);
        graph.ensure_flow_node(target);
        graph.connections.push(ParsedConnection {
            source: NodeId::from(source),
            target: NodeId::from(target),
            source_dir: None,
            target_dir: None,
            bidirectional: false,
            label,
        });
        return true;
    }
    if let Some(node) = parse_flow_node(stmt) {
        graph.define_flow_node(node);
        return true;
    }
    false
}

/// `<id> --> <id>` or `<id> -->|<label>| <id>`.
fn parse_flow_edge(stmt: &str) -> Option<(&str, &str, Option<String>)> {
    let idx = stmt.find("-->")?;
    let source = stmt[..idx].trim();
    let mut rest = stmt[idx + 3..].trim_start();

    let mut label = None;
    if let Some(after_bar) = rest.strip_prefix('|') {
        let (text, tail) = after_bar.split_once('|')?;
        let text = text.trim();
        if !text.is_empty() {
            label = Some(text.to_owned());
        }
        rest = tail;
    }

    let target = rest.trim();
    if !is_identifier(source) || !is_identifier(target) {
        return None;
    }
    Some((source, target, label))
}

/// `<kind> <id>` with optional `[<label>]`.
fn parse_flow_node(stmt: &str) -> Option<ParsedNode> {
    let (keyword, rest) = stmt.split_once(char::is_whitespace)?;
    let kind = match keyword {
        "start" => NodeKind::Start,
        "end" => NodeKind::End,
        "task" => NodeKind::Task,
        "gateway" => NodeKind::Gateway,
        _ => return None,
    };

    let (id, rest) = take_identifier(rest.trim_start())?;
    let (label, rest) = if rest.starts_with('[') {
        let (label, rest) = take_delimited(rest, '[', ']')?;
        (label.trim(), rest)
    } else {
        ("", rest)
    };
    if !rest.trim().is_empty() {
        return None;
    }

    let label = if label.is_empty() { id.to_owned() } else { label.to_owned() };
    Some(ParsedNode { id: NodeId::from(id), label, kind, icon: None, parent: None })
}

/// Split a flow line on `;` outside of `[...]` labels and `|...|` edge labels.
fn split_statements(line: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut depth = 0usize;
    let mut in_bars = false;
    let mut start = 0;

    for (i, c) in line.char_indices() {
        match c {
            '[' if !in_bars => depth += 1,
            ']' if !in_bars => depth = depth.saturating_sub(1),
            '|' if depth == 0 => in_bars = !in_bars,
            ';' if depth == 0 && !in_bars => {
                out.push(line[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    out.push(line[start..].trim());
    out.retain(|s| !s.is_empty());
    out
}

// =============================================================================
// LEXING HELPERS
// =============================================================================

fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

fn is_identifier(s: &str) -> bool {
    !s.is_empty() && s.chars().all(is_identifier_char)
}

/// Split the leading identifier off `input`.
fn take_identifier(input: &str) -> Option<(&str, &str)> {
    let end = input
        .char_indices()
        .find(|&(_, c)| !is_identifier_char(c))
        .map_or(input.len(), |(i, _)| i);
    if end == 0 {
        return None;
    }
    Some((&input[..end], &input[end..]))
}

/// Take `<open>...<close>` from the start of `input`, returning the inner text.
fn take_delimited(input: &str, open: char, close: char) -> Option<(&str, &str)> {
    let inner = input.strip_prefix(open)?;
    let end = inner.find(close)?;
    Some((&inner[..end], &inner[end + close.len_utf8()..]))
}
