//! Diagram DSL parser.
//!
//! Parses the `bpmn` flow family and the `architecture-beta` containment family
//! into a flat, source-ordered list of nodes and connections. Declaration order
//! is the index space used later by projection, so it must be preserved.

pub mod ast;
pub mod parse;

pub use ast::{Diagnostic, DiagramKind, Direction, NodeId, NodeKind, ParsedConnection, ParsedDiagram, ParsedNode};
pub use parse::{FormatError, parse, parse_with_diagnostics};

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
