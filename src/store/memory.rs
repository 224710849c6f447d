//! In-process diagram store.
//!
//! Diagrams live in a `RwLock<HashMap>` and are created on first write.
//! Deletes never cascade: removing a shape leaves its connectors in place.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use super::{
    Connector, ConnectorId, Diagram, DiagramId, DiagramStore, NewConnector, NewShape, Shape, ShapeId, ShapePatch,
    StoreError,
};

#[derive(Clone)]
pub struct MemoryStore {
    diagrams: Arc<RwLock<HashMap<DiagramId, Diagram>>>,
    batching: bool,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self { diagrams: Arc::new(RwLock::new(HashMap::new())), batching: true }
    }

    /// Toggle whether this store advertises batch creation.
    #[must_use]
    pub fn with_batching(mut self, batching: bool) -> Self {
        self.batching = batching;
        self
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Insert or replace by id, keeping the position of a replaced entry.
fn upsert<T, K: PartialEq>(items: &mut Vec<T>, item: T, key: impl Fn(&T) -> K) {
    let k = key(&item);
    match items.iter().position(|existing| key(existing) == k) {
        Some(pos) => items[pos] = item,
        None => items.push(item),
    }
}

#[async_trait::async_trait]
impl DiagramStore for MemoryStore {
    fn supports_batch(&self) -> bool {
        self.batching
    }

    async fn get_diagram(&self, diagram: DiagramId) -> Result<Option<Diagram>, StoreError> {
        Ok(self.diagrams.read().await.get(&diagram).cloned())
    }

    async fn add_shape(&self, diagram: DiagramId, shape: NewShape) -> Result<Diagram, StoreError> {
        self.add_shapes_batch(diagram, vec![shape]).await
    }

    async fn add_shapes_batch(&self, diagram: DiagramId, shapes: Vec<NewShape>) -> Result<Diagram, StoreError> {
        let mut diagrams = self.diagrams.write().await;
        let doc = diagrams.entry(diagram).or_insert_with(|| Diagram::new(diagram));
        doc.shapes.extend(shapes.into_iter().map(|s| Shape::from_new(ShapeId::new(), s)));
        Ok(doc.clone())
    }

    async fn update_shape(
        &self,
        diagram: DiagramId,
        shape: ShapeId,
        patch: ShapePatch,
    ) -> Result<Option<Diagram>, StoreError> {
        let mut diagrams = self.diagrams.write().await;
        let Some(doc) = diagrams.get_mut(&diagram) else {
            return Ok(None);
        };
        let Some(target) = doc.shapes.iter_mut().find(|s| s.id == shape) else {
            return Ok(None);
        };
        if let Some(parent) = patch.parent_id {
            target.parent_id = Some(parent);
        }
        Ok(Some(doc.clone()))
    }

    async fn delete_shape(&self, diagram: DiagramId, shape: ShapeId) -> Result<Option<Diagram>, StoreError> {
        self.delete_shapes(diagram, &[shape]).await
    }

    async fn delete_shapes(&self, diagram: DiagramId, shapes: &[ShapeId]) -> Result<Option<Diagram>, StoreError> {
        let mut diagrams = self.diagrams.write().await;
        let Some(doc) = diagrams.get_mut(&diagram) else {
            return Ok(None);
        };
        let before = doc.shapes.len();
        doc.shapes.retain(|s| !shapes.contains(&s.id));
        Ok((doc.shapes.len() < before).then(|| doc.clone()))
    }

    async fn get_shape(&self, diagram: DiagramId, shape: ShapeId) -> Result<Option<Shape>, StoreError> {
        let diagrams = self.diagrams.read().await;
        Ok(diagrams.get(&diagram).and_then(|d| d.shape(shape)).cloned())
    }

    async fn restore_shapes(&self, diagram: DiagramId, shapes: Vec<Shape>) -> Result<Diagram, StoreError> {
        let mut diagrams = self.diagrams.write().await;
        let doc = diagrams.entry(diagram).or_insert_with(|| Diagram::new(diagram));
        for shape in shapes {
            upsert(&mut doc.shapes, shape, |s| s.id);
        }
        Ok(doc.clone())
    }

    async fn add_connector(&self, diagram: DiagramId, connector: NewConnector) -> Result<Diagram, StoreError> {
        self.add_connectors_batch(diagram, vec![connector]).await
    }

    async fn add_connectors_batch(
        &self,
        diagram: DiagramId,
        connectors: Vec<NewConnector>,
    ) -> Result<Diagram, StoreError> {
        let mut diagrams = self.diagrams.write().await;
        let doc = diagrams.entry(diagram).or_insert_with(|| Diagram::new(diagram));
        doc.connectors
            .extend(connectors.into_iter().map(|c| Connector::from_new(ConnectorId::new(), c)));
        Ok(doc.clone())
    }

    async fn delete_connector(
        &self,
        diagram: DiagramId,
        connector: ConnectorId,
    ) -> Result<Option<Diagram>, StoreError> {
        self.delete_connectors(diagram, &[connector]).await
    }

    async fn delete_connectors(
        &self,
        diagram: DiagramId,
        connectors: &[ConnectorId],
    ) -> Result<Option<Diagram>, StoreError> {
        let mut diagrams = self.diagrams.write().await;
        let Some(doc) = diagrams.get_mut(&diagram) else {
            return Ok(None);
        };
        let before = doc.connectors.len();
        doc.connectors.retain(|c| !connectors.contains(&c.id));
        Ok((doc.connectors.len() < before).then(|| doc.clone()))
    }

    async fn restore_connectors(&self, diagram: DiagramId, connectors: Vec<Connector>) -> Result<Diagram, StoreError> {
        let mut diagrams = self.diagrams.write().await;
        let doc = diagrams.entry(diagram).or_insert_with(|| Diagram::new(diagram));
        for connector in connectors {
            upsert(&mut doc.connectors, connector, |c| c.id);
        }
        Ok(doc.clone())
    }
}

#[cfg(test)]
#[path = "memory_test.rs"]
mod tests;
