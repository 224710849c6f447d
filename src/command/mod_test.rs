use super::*;
use crate::store::{Connector, MemoryStore};
use std::sync::{Arc, Mutex};

// =========================================================================
// RecordingStore
// =========================================================================

/// Memory store that logs every call and can fail one operation on demand.
struct RecordingStore {
    inner: MemoryStore,
    calls: Mutex<Vec<&'static str>>,
    fail_on: Option<&'static str>,
}

impl RecordingStore {
    fn new(batching: bool) -> Self {
        Self { inner: MemoryStore::new().with_batching(batching), calls: Mutex::new(Vec::new()), fail_on: None }
    }

    fn failing(op: &'static str) -> Self {
        Self { fail_on: Some(op), ..Self::new(true) }
    }

    fn record(&self, op: &'static str) -> Result<(), StoreError> {
        self.calls.lock().unwrap().push(op);
        if self.fail_on == Some(op) {
            return Err(StoreError::Request(format!("injected failure in {op}")));
        }
        Ok(())
    }

    fn count(&self, op: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| **c == op).count()
    }

    fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl DiagramStore for RecordingStore {
    fn supports_batch(&self) -> bool {
        self.inner.supports_batch()
    }

    async fn get_diagram(&self, diagram: DiagramId) -> Result<Option<Diagram>, StoreError> {
        self.record("get_diagram")?;
        self.inner.get_diagram(diagram).await
    }

    async fn add_shape(&self, diagram: DiagramId, shape: NewShape) -> Result<Diagram, StoreError> {
        self.record("add_shape")?;
        self.inner.add_shape(diagram, shape).await
    }

    async fn add_shapes_batch(&self, diagram: DiagramId, shapes: Vec<NewShape>) -> Result<Diagram, StoreError> {
        self.record("add_shapes_batch")?;
        self.inner.add_shapes_batch(diagram, shapes).await
    }

    async fn update_shape(
        &self,
        diagram: DiagramId,
        shape: ShapeId,
        patch: ShapePatch,
    ) -> Result<Option<Diagram>, StoreError> {
        self.record("update_shape")?;
        self.inner.update_shape(diagram, shape, patch).await
    }

    async fn delete_shape(&self, diagram: DiagramId, shape: ShapeId) -> Result<Option<Diagram>, StoreError> {
        self.record("delete_shape")?;
        self.inner.delete_shape(diagram, shape).await
    }

    async fn delete_shapes(&self, diagram: DiagramId, shapes: &[ShapeId]) -> Result<Option<Diagram>, StoreError> {
        self.record("delete_shapes")?;
        self.inner.delete_shapes(diagram, shapes).await
    }

    async fn get_shape(&self, diagram: DiagramId, shape: ShapeId) -> Result<Option<Shape>, StoreError> {
        self.record("get_shape")?;
        self.inner.get_shape(diagram, shape).await
    }

    async fn restore_shapes(&self, diagram: DiagramId, shapes: Vec<Shape>) -> Result<Diagram, StoreError> {
        self.record("restore_shapes")?;
        self.inner.restore_shapes(diagram, shapes).await
    }

    async fn add_connector(&self, diagram: DiagramId, connector: NewConnector) -> Result<Diagram, StoreError> {
        self.record("add_connector")?;
        self.inner.add_connector(diagram, connector).await
    }

    async fn add_connectors_batch(
        &self,
        diagram: DiagramId,
        connectors: Vec<NewConnector>,
    ) -> Result<Diagram, StoreError> {
        self.record("add_connectors_batch")?;
        self.inner.add_connectors_batch(diagram, connectors).await
    }

    async fn delete_connector(
        &self,
        diagram: DiagramId,
        connector: ConnectorId,
    ) -> Result<Option<Diagram>, StoreError> {
        self.record("delete_connector")?;
        self.inner.delete_connector(diagram, connector).await
    }

    async fn delete_connectors(
        &self,
        diagram: DiagramId,
        connectors: &[ConnectorId],
    ) -> Result<Option<Diagram>, StoreError> {
        self.record("delete_connectors")?;
        self.inner.delete_connectors(diagram, connectors).await
    }

    async fn restore_connectors(&self, diagram: DiagramId, connectors: Vec<Connector>) -> Result<Diagram, StoreError> {
        self.record("restore_connectors")?;
        self.inner.restore_connectors(diagram, connectors).await
    }
}

// =========================================================================
// Helpers
// =========================================================================

const FLOW: &str = "bpmn\nstart --> a; a --> end";
const ARCH: &str = "architecture-beta\n\
    group api(cloud)[API]\n\
    service db(database)[DB] in api\n\
    service web(server)[Web] in api\n\
    web:R --> L:db\n\
    db:E --> W:web\n\
    web --> ghost";

fn create(diagram: DiagramId, kind: DiagramKind, source: &str) -> CreateDiagramCommand {
    CreateDiagramCommand::new(diagram, kind, source.to_owned(), Origin::default(), LayoutConfig::default())
}

async fn snapshot(store: &dyn DiagramStore, diagram: DiagramId) -> Option<Diagram> {
    store.get_diagram(diagram).await.unwrap()
}

async fn counts(store: &dyn DiagramStore, diagram: DiagramId) -> (usize, usize) {
    snapshot(store, diagram).await.map_or((0, 0), |d| (d.shapes.len(), d.connectors.len()))
}

// =========================================================================
// CreateDiagramCommand
// =========================================================================

#[tokio::test]
async fn create_then_undo_restores_counts() {
    let store = RecordingStore::new(true);
    let diagram = DiagramId::new();
    let mut cmd = create(diagram, DiagramKind::Flow, FLOW);

    cmd.execute(&store).await.unwrap();
    assert_eq!(counts(&store, diagram).await, (4, 2));
    let created = cmd.created().unwrap().clone();
    assert_eq!(created.shape_ids.len(), 3);
    assert_eq!(created.connector_ids.len(), 2);
    assert!(created.container_id.is_some());

    cmd.undo(&store).await.unwrap();
    assert_eq!(counts(&store, diagram).await, (0, 0));
    assert!(cmd.created().is_none());
}

#[tokio::test]
async fn undo_before_execute_and_repeated_undo_are_noops() {
    let store = RecordingStore::new(true);
    let diagram = DiagramId::new();
    let mut cmd = create(diagram, DiagramKind::Flow, FLOW);

    cmd.undo(&store).await.unwrap();
    assert_eq!(store.total_calls(), 0);

    cmd.execute(&store).await.unwrap();
    cmd.undo(&store).await.unwrap();
    let after_first = store.total_calls();
    cmd.undo(&store).await.unwrap();
    assert_eq!(store.total_calls(), after_first);
}

#[tokio::test]
async fn reexecute_after_undo_creates_new_ids() {
    let store = RecordingStore::new(true);
    let diagram = DiagramId::new();
    let mut cmd = create(diagram, DiagramKind::Flow, FLOW);

    cmd.execute(&store).await.unwrap();
    let first = cmd.created().unwrap().clone();
    cmd.undo(&store).await.unwrap();
    cmd.execute(&store).await.unwrap();
    let second = cmd.created().unwrap().clone();

    assert_eq!(first.shape_ids.len(), second.shape_ids.len());
    assert!(first.shape_ids.iter().all(|id| !second.shape_ids.contains(id)));
    assert_eq!(counts(&store, diagram).await, (4, 2));
}

#[tokio::test]
async fn unresolved_connection_is_dropped_rest_imports() {
    let store = RecordingStore::new(true);
    let diagram = DiagramId::new();
    let mut cmd = create(diagram, DiagramKind::Architecture, ARCH);

    cmd.execute(&store).await.unwrap();
    // web:R is not a direction, so only `db:E --> W:web` survives parsing; `ghost` is dropped.
    assert_eq!(counts(&store, diagram).await, (4, 1));
}

#[tokio::test]
async fn batch_store_uses_one_call_per_kind() {
    let store = RecordingStore::new(true);
    let diagram = DiagramId::new();
    create(diagram, DiagramKind::Flow, FLOW).execute(&store).await.unwrap();

    assert_eq!(store.count("add_shapes_batch"), 1);
    assert_eq!(store.count("add_connectors_batch"), 1);
    // Only the summary container goes through the single-shape call.
    assert_eq!(store.count("add_shape"), 1);
    assert_eq!(store.count("add_connector"), 0);
}

#[tokio::test]
async fn non_batch_store_creates_sequentially() {
    let store = RecordingStore::new(false);
    let diagram = DiagramId::new();
    let mut cmd = create(diagram, DiagramKind::Flow, FLOW);
    cmd.execute(&store).await.unwrap();

    assert_eq!(store.count("add_shapes_batch"), 0);
    assert_eq!(store.count("add_shape"), 4);
    assert_eq!(store.count("add_connector"), 2);

    let doc = snapshot(&store, diagram).await.unwrap();
    let created = cmd.created().unwrap();
    let ids: Vec<ShapeId> = doc.shapes[..3].iter().map(|s| s.id).collect();
    assert_eq!(ids, created.shape_ids);
}

#[tokio::test]
async fn parents_are_linked_after_creation() {
    let store = RecordingStore::new(true);
    let diagram = DiagramId::new();
    let mut cmd = create(diagram, DiagramKind::Architecture, ARCH);
    cmd.execute(&store).await.unwrap();

    let created = cmd.created().unwrap();
    let doc = snapshot(&store, diagram).await.unwrap();
    let group = created.shape_ids[0];
    assert_eq!(doc.shape(created.shape_ids[1]).unwrap().parent_id, Some(group));
    assert_eq!(doc.shape(created.shape_ids[2]).unwrap().parent_id, Some(group));
    assert_eq!(doc.shape(group).unwrap().parent_id, None);
    assert_eq!(store.count("update_shape"), 2);
}

#[tokio::test]
async fn container_tracks_members_and_wraps_content() {
    let store = MemoryStore::new();
    let diagram = DiagramId::new();
    let mut cmd = CreateDiagramCommand::new(
        diagram,
        DiagramKind::Architecture,
        ARCH.to_owned(),
        Origin { x: 300.0, y: -50.0 },
        LayoutConfig::default(),
    );
    cmd.execute(&store).await.unwrap();

    let created = cmd.created().unwrap();
    let container = store.get_shape(diagram, created.container_id.unwrap()).await.unwrap().unwrap();
    assert_eq!(container.kind, CONTAINER_KIND);
    assert!((container.x - 300.0).abs() < 1e-9);
    assert!((container.y + 50.0).abs() < 1e-9);
    assert_eq!(container.props["diagramType"], "architecture");
    assert_eq!(container.props["source"], ARCH);

    let (shape_ids, connector_ids) = container_members(&container).unwrap();
    assert_eq!(shape_ids, created.shape_ids);
    assert_eq!(connector_ids, created.connector_ids);

    let frame = Rect { x: container.x, y: container.y, width: container.width, height: container.height };
    let doc = store.get_diagram(diagram).await.unwrap().unwrap();
    for id in &shape_ids {
        let s = doc.shape(*id).unwrap();
        assert!(frame.contains(&Rect { x: s.x, y: s.y, width: s.width, height: s.height }));
    }
}

#[tokio::test]
async fn shape_props_carry_label_and_icon() {
    let store = MemoryStore::new();
    let diagram = DiagramId::new();
    let mut cmd = create(diagram, DiagramKind::Architecture, ARCH);
    cmd.execute(&store).await.unwrap();

    let db = store.get_shape(diagram, cmd.created().unwrap().shape_ids[1]).await.unwrap().unwrap();
    assert_eq!(db.kind, "service");
    assert_eq!(db.props["label"], "DB");
    assert_eq!(db.props["icon"], "database");
}

#[tokio::test]
async fn format_error_touches_no_store() {
    let store = RecordingStore::new(true);
    let mut cmd = create(DiagramId::new(), DiagramKind::Flow, "graph TD\na --> b");
    let err = cmd.execute(&store).await.unwrap_err();
    assert!(matches!(err, CommandError::Format(FormatError::MissingHeader { .. })));
    assert_eq!(err.error_code(), "E_FORMAT_HEADER");
    assert_eq!(store.total_calls(), 0);
}

#[tokio::test]
async fn store_failure_propagates() {
    let store = RecordingStore::failing("add_connectors_batch");
    let mut cmd = create(DiagramId::new(), DiagramKind::Flow, FLOW);
    let err = cmd.execute(&store).await.unwrap_err();
    assert!(matches!(err, CommandError::Store(StoreError::Request(_))));
    assert!(err.retryable());
    assert!(cmd.created().is_none());
}

#[test]
fn container_members_rejects_plain_shapes() {
    let shape = Shape {
        id: ShapeId::new(),
        kind: "task".into(),
        x: 0.0,
        y: 0.0,
        width: 1.0,
        height: 1.0,
        parent_id: None,
        props: serde_json::json!({ "shapeIds": [] , "connectorIds": [] }),
    };
    assert!(container_members(&shape).is_none());
}

// =========================================================================
// UpdatePreviewCommand
// =========================================================================

#[tokio::test]
async fn update_replaces_preview_at_same_origin_and_undo_restores_it() {
    let store = MemoryStore::new();
    let diagram = DiagramId::new();
    let mut first = CreateDiagramCommand::new(
        diagram,
        DiagramKind::Flow,
        FLOW.to_owned(),
        Origin { x: 100.0, y: 200.0 },
        LayoutConfig::default(),
    );
    first.execute(&store).await.unwrap();
    let old = first.created().unwrap().clone();
    let old_container = old.container_id.unwrap();
    let before = store.get_diagram(diagram).await.unwrap().unwrap();

    let mut update = UpdatePreviewCommand::new(
        diagram,
        old_container,
        DiagramKind::Flow,
        "bpmn\nstart --> a; a --> b; b --> end".to_owned(),
        LayoutConfig::default(),
    );
    update.execute(&store).await.unwrap();

    let doc = store.get_diagram(diagram).await.unwrap().unwrap();
    assert_eq!((doc.shapes.len(), doc.connectors.len()), (5, 3));
    assert!(old.shape_ids.iter().all(|id| doc.shape(*id).is_none()));
    let new_container = doc.shape(update.created().unwrap().container_id.unwrap()).unwrap();
    assert!((new_container.x - 100.0).abs() < 1e-9);
    assert!((new_container.y - 200.0).abs() < 1e-9);

    update.undo(&store).await.unwrap();
    let after = store.get_diagram(diagram).await.unwrap().unwrap();
    let mut want: Vec<ShapeId> = before.shapes.iter().map(|s| s.id).collect();
    let mut got: Vec<ShapeId> = after.shapes.iter().map(|s| s.id).collect();
    want.sort();
    got.sort();
    assert_eq!(got, want);
    assert_eq!(after.connectors.len(), before.connectors.len());
    assert_eq!(after.shape(old_container), before.shape(old_container));
}

#[tokio::test]
async fn update_with_missing_preview_creates_at_origin() {
    let store = MemoryStore::new();
    let diagram = DiagramId::new();
    let mut update =
        UpdatePreviewCommand::new(diagram, ShapeId::new(), DiagramKind::Flow, FLOW.to_owned(), LayoutConfig::default());
    update.execute(&store).await.unwrap();

    let container = store
        .get_shape(diagram, update.created().unwrap().container_id.unwrap())
        .await
        .unwrap()
        .unwrap();
    assert!(container.x.abs() < 1e-9 && container.y.abs() < 1e-9);

    update.undo(&store).await.unwrap();
    assert!(store.get_diagram(diagram).await.unwrap().unwrap().shapes.is_empty());
}

#[tokio::test]
async fn update_with_bad_dsl_keeps_old_preview() {
    let store = MemoryStore::new();
    let diagram = DiagramId::new();
    let mut first = create(diagram, DiagramKind::Flow, FLOW);
    first.execute(&store).await.unwrap();
    let container = first.created().unwrap().container_id.unwrap();

    let mut update =
        UpdatePreviewCommand::new(diagram, container, DiagramKind::Flow, "nope".to_owned(), LayoutConfig::default());
    assert!(update.execute(&store).await.is_err());
    assert!(store.get_shape(diagram, container).await.unwrap().is_some());
}

// =========================================================================
// RestoreSnapshotCommand
// =========================================================================

#[tokio::test]
async fn restore_uses_fixed_ids_and_undo_removes_them() {
    let source = MemoryStore::new();
    let diagram = DiagramId::new();
    create(diagram, DiagramKind::Flow, FLOW).execute(&source).await.unwrap();
    let saved = source.get_diagram(diagram).await.unwrap().unwrap();

    let target = RecordingStore::new(true);
    let mut cmd = RestoreSnapshotCommand::new(diagram, saved.shapes.clone(), saved.connectors.clone());
    cmd.execute(&target).await.unwrap();

    let doc = snapshot(&target, diagram).await.unwrap();
    assert_eq!(doc.shapes, saved.shapes);
    assert_eq!(doc.connectors, saved.connectors);
    assert_eq!(target.count("restore_shapes"), 1);
    assert_eq!(target.count("restore_connectors"), 1);

    cmd.undo(&target).await.unwrap();
    assert_eq!(counts(&target, diagram).await, (0, 0));
    let calls = target.total_calls();
    cmd.undo(&target).await.unwrap();
    assert_eq!(target.total_calls(), calls);
}

// =========================================================================
// CommandQueue
// =========================================================================

#[tokio::test]
async fn queue_runs_and_undoes_in_lifo_order() {
    let store = Arc::new(MemoryStore::new());
    let diagram = DiagramId::new();
    let queue = CommandQueue::new(diagram, store.clone());

    let created = queue.run(Box::new(create(diagram, DiagramKind::Flow, FLOW))).await.unwrap();
    assert_eq!(created.unwrap().shape_ids.len(), 3);
    queue.run(Box::new(create(diagram, DiagramKind::Architecture, ARCH))).await.unwrap();
    assert_eq!(queue.depth().await, 2);

    assert_eq!(queue.undo_last().await.unwrap().as_deref(), Some("import architecture diagram"));
    assert_eq!(counts(store.as_ref(), diagram).await, (4, 2));
    assert_eq!(queue.undo_last().await.unwrap().as_deref(), Some("import flow diagram"));
    assert_eq!(counts(store.as_ref(), diagram).await, (0, 0));
    assert_eq!(queue.undo_last().await.unwrap(), None);
}

#[tokio::test]
async fn failed_command_is_not_pushed() {
    let store = Arc::new(MemoryStore::new());
    let diagram = DiagramId::new();
    let queue = CommandQueue::new(diagram, store);

    let result = queue.run(Box::new(create(diagram, DiagramKind::Flow, "architecture-beta"))).await;
    assert!(result.is_err());
    assert_eq!(queue.depth().await, 0);
}

#[tokio::test]
async fn restore_through_queue_reports_no_created_ids() {
    let store = Arc::new(MemoryStore::new());
    let diagram = DiagramId::new();
    let queue = CommandQueue::new(diagram, store);
    let created = queue
        .run(Box::new(RestoreSnapshotCommand::new(diagram, Vec::new(), Vec::new())))
        .await
        .unwrap();
    assert!(created.is_none());
}

#[tokio::test]
async fn queue_depth_stops_at_cap_and_drops_oldest() {
    let store = Arc::new(MemoryStore::new());
    let diagram = DiagramId::new();
    let queue = CommandQueue::new(diagram, store.clone()).with_max_depth(3);

    for _ in 0..10 {
        queue.run(Box::new(create(diagram, DiagramKind::Flow, FLOW))).await.unwrap();
    }
    assert_eq!(queue.depth().await, 3);

    for _ in 0..3 {
        assert!(queue.undo_last().await.unwrap().is_some());
    }
    assert_eq!(queue.undo_last().await.unwrap(), None);
    // The seven evicted imports stay: three shapes plus a container each.
    assert_eq!(counts(store.as_ref(), diagram).await.0, 7 * 4);
}

#[tokio::test]
async fn zero_depth_is_clamped_to_one() {
    let store = Arc::new(MemoryStore::new());
    let diagram = DiagramId::new();
    let queue = CommandQueue::new(diagram, store).with_max_depth(0);
    queue.run(Box::new(create(diagram, DiagramKind::Flow, FLOW))).await.unwrap();
    queue.run(Box::new(create(diagram, DiagramKind::Flow, FLOW))).await.unwrap();
    assert_eq!(queue.depth().await, 1);
}
