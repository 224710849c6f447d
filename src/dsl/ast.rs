//! Parsed graph types shared by every DSL family.

use std::fmt;

use serde::{Deserialize, Serialize};

/// DSL-local node identifier. Unique within one parse, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which DSL family a text belongs to. Selects grammar and layout engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagramKind {
    /// Process flow (`bpmn` header): start/end events, tasks, gateways.
    Flow,
    /// Hierarchical containment (`architecture-beta` header): groups and services.
    Architecture,
}

impl DiagramKind {
    /// The sentinel the first non-comment line must equal.
    #[must_use]
    pub fn header(self) -> &'static str {
        match self {
            Self::Flow => "bpmn",
            Self::Architecture => "architecture-beta",
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Flow => "flow",
            Self::Architecture => "architecture",
        }
    }

    /// Resolve a caller-supplied type name. Accepts the family name or its header.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "flow" | "bpmn" => Some(Self::Flow),
            "architecture" | "architecture-beta" => Some(Self::Architecture),
            _ => None,
        }
    }
}

/// Node vocabulary across both families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Start,
    End,
    Task,
    Gateway,
    /// Container; auto-sizes around its children.
    Group,
    /// Leaf inside (or outside) a group.
    Service,
}

impl NodeKind {
    #[must_use]
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::End => "end",
            Self::Task => "task",
            Self::Gateway => "gateway",
            Self::Group => "group",
            Self::Service => "service",
        }
    }

    #[must_use]
    pub fn is_container(self) -> bool {
        matches!(self, Self::Group)
    }
}

/// Compass side a connector attaches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    N,
    S,
    E,
    W,
}

impl Direction {
    #[must_use]
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'N' => Some(Self::N),
            'S' => Some(Self::S),
            'E' => Some(Self::E),
            'W' => Some(Self::W),
            _ => None,
        }
    }
}

/// A node definition, explicit or implied by a connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedNode {
    pub id: NodeId,
    pub label: String,
    pub kind: NodeKind,
    pub icon: Option<String>,
    pub parent: Option<NodeId>,
}

/// A directed edge between two nodes. `source` is always the arrow's origin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedConnection {
    pub source: NodeId,
    pub target: NodeId,
    pub source_dir: Option<Direction>,
    pub target_dir: Option<Direction>,
    pub bidirectional: bool,
    pub label: Option<String>,
}

/// Output of one parse, in source-line order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedDiagram {
    pub kind: DiagramKind,
    pub nodes: Vec<ParsedNode>,
    pub connections: Vec<ParsedConnection>,
}

impl ParsedDiagram {
    /// Position of a node in declaration order.
    #[must_use]
    pub fn node_index(&self, id: &NodeId) -> Option<usize> {
        self.nodes.iter().position(|n| &n.id == id)
    }
}

/// A line the lenient parser skipped. Surfaced only through strict diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// 1-based line number in the input text.
    pub line: usize,
    pub text: String,
}
