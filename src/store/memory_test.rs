use super::*;
use serde_json::json;

fn new_shape(kind: &str, x: f64) -> NewShape {
    NewShape { kind: kind.into(), x, y: 0.0, width: 10.0, height: 10.0, parent_id: None, props: json!({}) }
}

fn link(from: ShapeId, to: ShapeId) -> NewConnector {
    NewConnector { from_shape: from, to_shape: to, source_dir: None, target_dir: None, bidirectional: false, label: None }
}

#[tokio::test]
async fn first_write_creates_diagram() {
    let store = MemoryStore::new();
    let id = DiagramId::new();
    assert!(store.get_diagram(id).await.unwrap().is_none());

    let doc = store.add_shape(id, new_shape("task", 1.0)).await.unwrap();
    assert_eq!(doc.id, id);
    assert_eq!(doc.shapes.len(), 1);
    assert_eq!(store.get_diagram(id).await.unwrap(), Some(doc));
}

#[tokio::test]
async fn batch_appends_in_order() {
    let store = MemoryStore::new();
    let id = DiagramId::new();
    store.add_shape(id, new_shape("existing", 0.0)).await.unwrap();

    let doc = store
        .add_shapes_batch(id, vec![new_shape("a", 1.0), new_shape("b", 2.0)])
        .await
        .unwrap();
    let kinds: Vec<&str> = doc.shapes.iter().map(|s| s.kind.as_str()).collect();
    assert_eq!(kinds, ["existing", "a", "b"]);
}

#[tokio::test]
async fn update_and_delete_unknown_targets_answer_none() {
    let store = MemoryStore::new();
    let id = DiagramId::new();
    let ghost = ShapeId::new();

    assert!(store.update_shape(id, ghost, ShapePatch::default()).await.unwrap().is_none());
    assert!(store.delete_shape(id, ghost).await.unwrap().is_none());

    store.add_shape(id, new_shape("a", 0.0)).await.unwrap();
    assert!(store.delete_shape(id, ghost).await.unwrap().is_none());
    assert!(store.delete_connector(id, ConnectorId::new()).await.unwrap().is_none());
}

#[tokio::test]
async fn update_sets_parent() {
    let store = MemoryStore::new();
    let id = DiagramId::new();
    let doc = store
        .add_shapes_batch(id, vec![new_shape("group", 0.0), new_shape("service", 1.0)])
        .await
        .unwrap();
    let (parent, child) = (doc.shapes[0].id, doc.shapes[1].id);

    let doc = store
        .update_shape(id, child, ShapePatch { parent_id: Some(parent) })
        .await
        .unwrap()
        .unwrap();
    assert_eq!(doc.shape(child).unwrap().parent_id, Some(parent));
    assert_eq!(store.get_shape(id, child).await.unwrap().unwrap().parent_id, Some(parent));
}

#[tokio::test]
async fn bulk_delete_ignores_missing_ids() {
    let store = MemoryStore::new();
    let id = DiagramId::new();
    let doc = store
        .add_shapes_batch(id, vec![new_shape("a", 0.0), new_shape("b", 1.0)])
        .await
        .unwrap();
    let a = doc.shapes[0].id;

    let doc = store.delete_shapes(id, &[a, ShapeId::new()]).await.unwrap().unwrap();
    assert_eq!(doc.shapes.len(), 1);
    assert_eq!(doc.shapes[0].kind, "b");
}

#[tokio::test]
async fn connectors_round_trip_through_restore() {
    let store = MemoryStore::new();
    let id = DiagramId::new();
    let doc = store
        .add_shapes_batch(id, vec![new_shape("a", 0.0), new_shape("b", 1.0)])
        .await
        .unwrap();
    let (a, b) = (doc.shapes[0].id, doc.shapes[1].id);

    let doc = store.add_connector(id, link(a, b)).await.unwrap();
    let saved = doc.connectors[0].clone();

    store.delete_connectors(id, &[saved.id]).await.unwrap().unwrap();
    let doc = store.restore_connectors(id, vec![saved.clone()]).await.unwrap();
    assert_eq!(doc.connector(saved.id), Some(&saved));
    assert_eq!(doc.connectors, vec![saved]);
}

#[tokio::test]
async fn restore_replaces_in_place() {
    let store = MemoryStore::new();
    let id = DiagramId::new();
    let doc = store
        .add_shapes_batch(id, vec![new_shape("a", 0.0), new_shape("b", 1.0)])
        .await
        .unwrap();

    let mut changed = doc.shapes[0].clone();
    changed.x = 99.0;
    let doc = store.restore_shapes(id, vec![changed]).await.unwrap();
    assert_eq!(doc.shapes.len(), 2);
    assert!((doc.shapes[0].x - 99.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn batching_can_be_disabled() {
    assert!(MemoryStore::new().supports_batch());
    assert!(!MemoryStore::new().with_batching(false).supports_batch());
}
