//! Diagram document store: the shape/connector CRUD surface imports write to.
//!
//! DESIGN
//! ======
//! The document service is an external collaborator, so it is consumed through
//! the [`DiagramStore`] trait. [`MemoryStore`] backs tests and the standalone
//! server; [`HttpStore`] talks to a remote REST diagram service.
//!
//! Mutations answer with the whole updated [`Diagram`]. Update and delete
//! answer `None` when the target does not exist. Created entries are appended,
//! so the ids of a batch are the tail of the returned list in creation order.

pub mod http;
pub mod memory;

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use http::HttpStore;
pub use memory::MemoryStore;

use crate::dsl::Direction;

// =============================================================================
// IDENTIFIERS
// =============================================================================

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

uuid_id!(
    /// A diagram document.
    DiagramId
);
uuid_id!(
    /// Store-assigned shape identifier.
    ShapeId
);
uuid_id!(
    /// Store-assigned connector identifier.
    ConnectorId
);

// =============================================================================
// DOCUMENT
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    pub id: ShapeId,
    pub kind: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub parent_id: Option<ShapeId>,
    #[serde(default)]
    pub props: serde_json::Value,
}

impl Shape {
    #[must_use]
    pub fn from_new(id: ShapeId, new: NewShape) -> Self {
        Self {
            id,
            kind: new.kind,
            x: new.x,
            y: new.y,
            width: new.width,
            height: new.height,
            parent_id: new.parent_id,
            props: new.props,
        }
    }
}

/// Shape creation payload; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewShape {
    pub kind: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<ShapeId>,
    #[serde(default)]
    pub props: serde_json::Value,
}

/// Partial shape update. Only set fields are applied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShapePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<ShapeId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connector {
    pub id: ConnectorId,
    pub from_shape: ShapeId,
    pub to_shape: ShapeId,
    #[serde(default)]
    pub source_dir: Option<Direction>,
    #[serde(default)]
    pub target_dir: Option<Direction>,
    #[serde(default)]
    pub bidirectional: bool,
    #[serde(default)]
    pub label: Option<String>,
}

impl Connector {
    #[must_use]
    pub fn from_new(id: ConnectorId, new: NewConnector) -> Self {
        Self {
            id,
            from_shape: new.from_shape,
            to_shape: new.to_shape,
            source_dir: new.source_dir,
            target_dir: new.target_dir,
            bidirectional: new.bidirectional,
            label: new.label,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewConnector {
    pub from_shape: ShapeId,
    pub to_shape: ShapeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_dir: Option<Direction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_dir: Option<Direction>,
    #[serde(default)]
    pub bidirectional: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// A diagram document: shapes and connectors in insertion order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagram {
    pub id: DiagramId,
    #[serde(default)]
    pub shapes: Vec<Shape>,
    #[serde(default)]
    pub connectors: Vec<Connector>,
}

impl Diagram {
    #[must_use]
    pub fn new(id: DiagramId) -> Self {
        Self { id, shapes: Vec::new(), connectors: Vec::new() }
    }

    #[must_use]
    pub fn shape(&self, id: ShapeId) -> Option<&Shape> {
        self.shapes.iter().find(|s| s.id == id)
    }

    #[must_use]
    pub fn connector(&self, id: ConnectorId) -> Option<&Connector> {
        self.connectors.iter().find(|c| c.id == id)
    }
}

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("diagram not found: {0}")]
    DiagramNotFound(DiagramId),

    #[error("store request failed: {0}")]
    Request(String),

    #[error("store response error: status {status}")]
    Response { status: u16, body: String },

    #[error("store response parse failed: {0}")]
    Parse(String),

    /// The store answered a creation with fewer entries than were created.
    #[error("store returned {found} entries, expected at least {expected} new ones")]
    MissingCreatedIds { expected: usize, found: usize },

    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

impl crate::error::ErrorCode for StoreError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::DiagramNotFound(_) => "E_DIAGRAM_NOT_FOUND",
            Self::Request(_) => "E_STORE_REQUEST",
            Self::Response { .. } => "E_STORE_RESPONSE",
            Self::Parse(_) => "E_STORE_PARSE",
            Self::MissingCreatedIds { .. } => "E_STORE_MISSING_IDS",
            Self::HttpClientBuild(_) => "E_HTTP_CLIENT_BUILD",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Request(_) | Self::Response { status: 429 | 500..=599, .. })
    }
}

// =============================================================================
// STORE TRAIT
// =============================================================================

/// Shape/connector CRUD against one diagram document service.
///
/// The batch and bulk-delete methods default to sequential calls; stores that
/// can do better override them and report [`DiagramStore::supports_batch`].
#[async_trait::async_trait]
pub trait DiagramStore: Send + Sync {
    /// Whether `add_*_batch` is a single round trip.
    fn supports_batch(&self) -> bool {
        false
    }

    /// # Errors
    ///
    /// Returns a [`StoreError`] if the store cannot be reached or answers badly.
    async fn get_diagram(&self, diagram: DiagramId) -> Result<Option<Diagram>, StoreError>;

    /// # Errors
    ///
    /// Returns a [`StoreError`] if the store rejects the shape.
    async fn add_shape(&self, diagram: DiagramId, shape: NewShape) -> Result<Diagram, StoreError>;

    /// Create several shapes; their ids are the tail of the returned list.
    ///
    /// # Errors
    ///
    /// Returns the first [`StoreError`] hit.
    async fn add_shapes_batch(&self, diagram: DiagramId, shapes: Vec<NewShape>) -> Result<Diagram, StoreError> {
        let mut last = None;
        for shape in shapes {
            last = Some(self.add_shape(diagram, shape).await?);
        }
        match last {
            Some(d) => Ok(d),
            None => Ok(self.get_diagram(diagram).await?.unwrap_or_else(|| Diagram::new(diagram))),
        }
    }

    /// # Errors
    ///
    /// Returns a [`StoreError`] on transport or protocol failure.
    async fn update_shape(
        &self,
        diagram: DiagramId,
        shape: ShapeId,
        patch: ShapePatch,
    ) -> Result<Option<Diagram>, StoreError>;

    /// # Errors
    ///
    /// Returns a [`StoreError`] on transport or protocol failure.
    async fn delete_shape(&self, diagram: DiagramId, shape: ShapeId) -> Result<Option<Diagram>, StoreError>;

    /// Delete several shapes. `None` when none of them existed.
    ///
    /// # Errors
    ///
    /// Returns the first [`StoreError`] hit.
    async fn delete_shapes(&self, diagram: DiagramId, shapes: &[ShapeId]) -> Result<Option<Diagram>, StoreError> {
        let mut last = None;
        for &shape in shapes {
            if let Some(d) = self.delete_shape(diagram, shape).await? {
                last = Some(d);
            }
        }
        Ok(last)
    }

    /// # Errors
    ///
    /// Returns a [`StoreError`] on transport or protocol failure.
    async fn get_shape(&self, diagram: DiagramId, shape: ShapeId) -> Result<Option<Shape>, StoreError>;

    /// Insert shapes with caller-fixed ids, replacing any with the same id.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] on transport or protocol failure.
    async fn restore_shapes(&self, diagram: DiagramId, shapes: Vec<Shape>) -> Result<Diagram, StoreError>;

    /// # Errors
    ///
    /// Returns a [`StoreError`] if the store rejects the connector.
    async fn add_connector(&self, diagram: DiagramId, connector: NewConnector) -> Result<Diagram, StoreError>;

    /// Create several connectors; their ids are the tail of the returned list.
    ///
    /// # Errors
    ///
    /// Returns the first [`StoreError`] hit.
    async fn add_connectors_batch(
        &self,
        diagram: DiagramId,
        connectors: Vec<NewConnector>,
    ) -> Result<Diagram, StoreError> {
        let mut last = None;
        for connector in connectors {
            last = Some(self.add_connector(diagram, connector).await?);
        }
        match last {
            Some(d) => Ok(d),
            None => Ok(self.get_diagram(diagram).await?.unwrap_or_else(|| Diagram::new(diagram))),
        }
    }

    /// # Errors
    ///
    /// Returns a [`StoreError`] on transport or protocol failure.
    async fn delete_connector(
        &self,
        diagram: DiagramId,
        connector: ConnectorId,
    ) -> Result<Option<Diagram>, StoreError>;

    /// Delete several connectors. `None` when none of them existed.
    ///
    /// # Errors
    ///
    /// Returns the first [`StoreError`] hit.
    async fn delete_connectors(
        &self,
        diagram: DiagramId,
        connectors: &[ConnectorId],
    ) -> Result<Option<Diagram>, StoreError> {
        let mut last = None;
        for &connector in connectors {
            if let Some(d) = self.delete_connector(diagram, connector).await? {
                last = Some(d);
            }
        }
        Ok(last)
    }

    /// Insert connectors with caller-fixed ids, replacing any with the same id.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] on transport or protocol failure.
    async fn restore_connectors(&self, diagram: DiagramId, connectors: Vec<Connector>) -> Result<Diagram, StoreError>;
}
