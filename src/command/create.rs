//! Create-from-paste: import DSL text as new content.

use tracing::{info, warn};

use super::{Command, CommandError, Created, Import, Origin, create_content, prepare, remove_content};
use crate::config::LayoutConfig;
use crate::dsl::DiagramKind;
use crate::store::{DiagramId, DiagramStore};

pub struct CreateDiagramCommand {
    diagram_id: DiagramId,
    kind: DiagramKind,
    source: String,
    origin: Origin,
    config: LayoutConfig,
    created: Option<Created>,
}

impl CreateDiagramCommand {
    #[must_use]
    pub fn new(diagram_id: DiagramId, kind: DiagramKind, source: String, origin: Origin, config: LayoutConfig) -> Self {
        Self { diagram_id, kind, source, origin, config, created: None }
    }
}

#[async_trait::async_trait]
impl Command for CreateDiagramCommand {
    fn description(&self) -> String {
        format!("import {} diagram", self.kind.as_str())
    }

    async fn execute(&mut self, store: &dyn DiagramStore) -> Result<(), CommandError> {
        if self.created.is_some() {
            warn!(diagram = %self.diagram_id, "create: already executed; ignoring");
            return Ok(());
        }

        let projection = prepare(self.kind, &self.source, &self.config)?;
        let import = Import {
            diagram_id: self.diagram_id,
            kind: self.kind,
            source: &self.source,
            origin: self.origin,
            config: &self.config,
        };
        let created = create_content(store, &import, projection).await?;

        info!(
            diagram = %self.diagram_id,
            kind = self.kind.as_str(),
            shapes = created.shape_ids.len(),
            connectors = created.connector_ids.len(),
            "create: imported"
        );
        self.created = Some(created);
        Ok(())
    }

    async fn undo(&mut self, store: &dyn DiagramStore) -> Result<(), CommandError> {
        let Some(created) = &self.created else {
            warn!(diagram = %self.diagram_id, "create: nothing to undo");
            return Ok(());
        };
        remove_content(store, self.diagram_id, created).await?;
        self.created = None;
        info!(diagram = %self.diagram_id, "create: undone");
        Ok(())
    }

    fn created(&self) -> Option<&Created> {
        self.created.as_ref()
    }
}
