//! Bulk import of shapes and connectors whose identifiers are already known.

use tracing::{info, warn};

use super::{Command, CommandError};
use crate::store::{Connector, ConnectorId, DiagramId, DiagramStore, Shape, ShapeId};

pub struct RestoreSnapshotCommand {
    diagram_id: DiagramId,
    shapes: Vec<Shape>,
    connectors: Vec<Connector>,
    restored: bool,
}

impl RestoreSnapshotCommand {
    #[must_use]
    pub fn new(diagram_id: DiagramId, shapes: Vec<Shape>, connectors: Vec<Connector>) -> Self {
        Self { diagram_id, shapes, connectors, restored: false }
    }
}

#[async_trait::async_trait]
impl Command for RestoreSnapshotCommand {
    fn description(&self) -> String {
        format!("restore {} shapes and {} connectors", self.shapes.len(), self.connectors.len())
    }

    async fn execute(&mut self, store: &dyn DiagramStore) -> Result<(), CommandError> {
        if !self.shapes.is_empty() {
            store.restore_shapes(self.diagram_id, self.shapes.clone()).await?;
        }
        if !self.connectors.is_empty() {
            store.restore_connectors(self.diagram_id, self.connectors.clone()).await?;
        }
        self.restored = true;
        info!(diagram = %self.diagram_id, shapes = self.shapes.len(), connectors = self.connectors.len(), "restore: applied");
        Ok(())
    }

    async fn undo(&mut self, store: &dyn DiagramStore) -> Result<(), CommandError> {
        if !self.restored {
            warn!(diagram = %self.diagram_id, "restore: nothing to undo");
            return Ok(());
        }
        let connector_ids: Vec<ConnectorId> = self.connectors.iter().map(|c| c.id).collect();
        let shape_ids: Vec<ShapeId> = self.shapes.iter().map(|s| s.id).collect();
        if !connector_ids.is_empty() {
            store.delete_connectors(self.diagram_id, &connector_ids).await?;
        }
        if !shape_ids.is_empty() {
            store.delete_shapes(self.diagram_id, &shape_ids).await?;
        }
        self.restored = false;
        info!(diagram = %self.diagram_id, "restore: undone");
        Ok(())
    }
}
