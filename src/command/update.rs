//! Replace an existing preview with freshly imported content.
//!
//! The old container's `props` name every shape and connector it tracks.
//! Those are snapshotted and deleted, and the new content takes the old
//! container's origin. Undo removes the new content and restores the
//! snapshot under its original identifiers.

use tracing::{info, warn};

use super::{
    Command, CommandError, Created, Import, Origin, container_members, create_content, prepare, remove_content,
};
use crate::config::LayoutConfig;
use crate::dsl::DiagramKind;
use crate::store::{Connector, DiagramId, DiagramStore, Shape, ShapeId, StoreError};

/// The preview that was replaced, captured before deletion.
#[derive(Debug, Clone)]
struct Snapshot {
    container: Shape,
    shapes: Vec<Shape>,
    connectors: Vec<Connector>,
}

pub struct UpdatePreviewCommand {
    diagram_id: DiagramId,
    preview_id: ShapeId,
    kind: DiagramKind,
    source: String,
    config: LayoutConfig,
    created: Option<Created>,
    replaced: Option<Snapshot>,
}

impl UpdatePreviewCommand {
    #[must_use]
    pub fn new(
        diagram_id: DiagramId,
        preview_id: ShapeId,
        kind: DiagramKind,
        source: String,
        config: LayoutConfig,
    ) -> Self {
        Self { diagram_id, preview_id, kind, source, config, created: None, replaced: None }
    }

    /// Snapshot and delete the old preview.
    ///
    /// `None` when it no longer exists or is not a diagram container; nothing is deleted then.
    async fn take_preview(&self, store: &dyn DiagramStore) -> Result<Option<Snapshot>, StoreError> {
        let diagram = self.diagram_id;
        let Some(container) = store.get_shape(diagram, self.preview_id).await? else {
            return Ok(None);
        };
        let Some((shape_ids, connector_ids)) = container_members(&container) else {
            warn!(%diagram, preview = %self.preview_id, kind = %container.kind, "update: target is not a diagram container");
            return Ok(None);
        };

        let doc = store.get_diagram(diagram).await?;
        let (shapes, connectors) = match &doc {
            Some(doc) => (
                doc.shapes.iter().filter(|s| shape_ids.contains(&s.id)).cloned().collect(),
                doc.connectors.iter().filter(|c| connector_ids.contains(&c.id)).cloned().collect(),
            ),
            None => (Vec::new(), Vec::new()),
        };

        if !connector_ids.is_empty() {
            store.delete_connectors(diagram, &connector_ids).await?;
        }
        if !shape_ids.is_empty() {
            store.delete_shapes(diagram, &shape_ids).await?;
        }
        store.delete_shape(diagram, container.id).await?;

        Ok(Some(Snapshot { container, shapes, connectors }))
    }
}

#[async_trait::async_trait]
impl Command for UpdatePreviewCommand {
    fn description(&self) -> String {
        format!("update {} diagram preview", self.kind.as_str())
    }

    async fn execute(&mut self, store: &dyn DiagramStore) -> Result<(), CommandError> {
        if self.created.is_some() {
            warn!(diagram = %self.diagram_id, "update: already executed; ignoring");
            return Ok(());
        }

        // Parse before touching the old preview so bad input changes nothing.
        let projection = prepare(self.kind, &self.source, &self.config)?;

        let replaced = self.take_preview(store).await?;
        let origin = match &replaced {
            Some(s) => Origin { x: s.container.x, y: s.container.y },
            None => {
                warn!(diagram = %self.diagram_id, preview = %self.preview_id, "update: no preview to replace; creating at origin");
                Origin::default()
            }
        };
        self.replaced = replaced;

        let import = Import {
            diagram_id: self.diagram_id,
            kind: self.kind,
            source: &self.source,
            origin,
            config: &self.config,
        };
        let created = create_content(store, &import, projection).await?;

        info!(
            diagram = %self.diagram_id,
            replaced = self.replaced.is_some(),
            shapes = created.shape_ids.len(),
            "update: preview replaced"
        );
        self.created = Some(created);
        Ok(())
    }

    async fn undo(&mut self, store: &dyn DiagramStore) -> Result<(), CommandError> {
        let Some(created) = &self.created else {
            warn!(diagram = %self.diagram_id, "update: nothing to undo");
            return Ok(());
        };
        remove_content(store, self.diagram_id, created).await?;
        self.created = None;

        if let Some(snapshot) = self.replaced.take() {
            store.restore_shapes(self.diagram_id, snapshot.shapes).await?;
            store.restore_connectors(self.diagram_id, snapshot.connectors).await?;
            store.restore_shapes(self.diagram_id, vec![snapshot.container]).await?;
        }
        info!(diagram = %self.diagram_id, "update: undone");
        Ok(())
    }

    fn created(&self) -> Option<&Created> {
        self.created.as_ref()
    }
}
