use super::*;
use crate::state::test_helpers;

fn request(diagram_type: &str, dsl: &str) -> ImportRequest {
    ImportRequest { diagram_type: diagram_type.into(), dsl: dsl.into(), origin: None, layout: None, preview_id: None }
}

// =========================================================================
// preview
// =========================================================================

#[test]
fn preview_lays_out_and_reports_diagnostics() {
    let p = preview("flow", "bpmn\nstart --> a\nthis is noise\na --> end", &LayoutConfig::default(), None).unwrap();
    assert_eq!(p.diagram_type, DiagramKind::Flow);
    assert_eq!(p.nodes.len(), 3);
    assert_eq!(p.connectors.len(), 2);
    assert_eq!(p.diagnostics.len(), 1);
    assert_eq!(p.diagnostics[0].line, 3);
    assert_eq!(p.dropped_connections, 0);
}

#[test]
fn preview_counts_dropped_connections() {
    let p = preview("architecture", "architecture-beta\nservice a(s)[A]\na --> ghost", &LayoutConfig::default(), None)
        .unwrap();
    assert_eq!(p.connectors.len(), 0);
    assert_eq!(p.dropped_connections, 1);
}

#[test]
fn preview_applies_overrides() {
    let overrides = LayoutOverrides { horizontal_spacing: Some(10.0), ..LayoutOverrides::default() };
    let p = preview("bpmn", "bpmn\ntask a\ntask b\na --> b", &LayoutConfig::default(), Some(&overrides)).unwrap();
    let b = p.nodes.iter().find(|n| n.node.id.as_str() == "b").unwrap();
    assert!((b.x - 130.0).abs() < 1e-9);
}

#[test]
fn unknown_type_is_format_error() {
    let err = preview("sequence", "sequenceDiagram", &LayoutConfig::default(), None).unwrap_err();
    assert_eq!(err, FormatError::UnknownDiagramType("sequence".into()));
}

#[test]
fn resolve_kind_accepts_names_and_headers() {
    assert_eq!(resolve_kind("architecture-beta").unwrap(), DiagramKind::Architecture);
    assert_eq!(resolve_kind(" Flow ").unwrap(), DiagramKind::Flow);
    assert!(resolve_kind("").is_err());
}

// =========================================================================
// import / undo
// =========================================================================

#[tokio::test]
async fn import_then_undo_round_trips_store() {
    let state = test_helpers::test_app_state();
    let diagram = DiagramId::new();

    let created = import(&state, diagram, request("flow", "bpmn\nstart --> a; a --> end")).await.unwrap();
    assert_eq!(created.shape_ids.len(), 3);
    assert_eq!(created.connector_ids.len(), 2);
    let doc = state.store.get_diagram(diagram).await.unwrap().unwrap();
    assert_eq!(doc.shapes.len(), 4);

    assert_eq!(undo(&state, diagram).await.unwrap().as_deref(), Some("import flow diagram"));
    let doc = state.store.get_diagram(diagram).await.unwrap().unwrap();
    assert!(doc.shapes.is_empty() && doc.connectors.is_empty());
    assert_eq!(undo(&state, diagram).await.unwrap(), None);
}

#[tokio::test]
async fn undo_on_untouched_diagram_is_none() {
    let state = test_helpers::test_app_state();
    assert_eq!(undo(&state, DiagramId::new()).await.unwrap(), None);
}

#[tokio::test]
async fn import_with_preview_id_replaces_content() {
    let state = test_helpers::test_app_state();
    let diagram = DiagramId::new();
    let first = import(&state, diagram, request("flow", "bpmn\nstart --> end")).await.unwrap();

    let mut req = request("flow", "bpmn\nstart --> a; a --> b; b --> end");
    req.preview_id = first.container_id;
    let second = import(&state, diagram, req).await.unwrap();

    let doc = state.store.get_diagram(diagram).await.unwrap().unwrap();
    assert_eq!(doc.shapes.len(), second.shape_ids.len() + 1);
    assert!(doc.shape(first.container_id.unwrap()).is_none());

    undo(&state, diagram).await.unwrap();
    let doc = state.store.get_diagram(diagram).await.unwrap().unwrap();
    assert!(doc.shape(first.container_id.unwrap()).is_some());
    assert_eq!(doc.shapes.len(), first.shape_ids.len() + 1);
}

#[tokio::test]
async fn import_honors_origin() {
    let state = test_helpers::test_app_state();
    let diagram = DiagramId::new();
    let mut req = request("architecture", "architecture-beta\nservice a(s)[A]");
    req.origin = Some(Origin { x: -400.0, y: 75.0 });
    let created = import(&state, diagram, req).await.unwrap();

    let container = state.store.get_shape(diagram, created.container_id.unwrap()).await.unwrap().unwrap();
    assert!((container.x + 400.0).abs() < 1e-9);
    assert!((container.y - 75.0).abs() < 1e-9);
}

#[tokio::test]
async fn bad_header_fails_without_queueing() {
    let state = test_helpers::test_app_state();
    let diagram = DiagramId::new();
    let err = import(&state, diagram, request("flow", "graph LR\na --> b")).await.unwrap_err();
    assert!(matches!(err, CommandError::Format(FormatError::MissingHeader { .. })));
    assert_eq!(state.queue(diagram).await.depth().await, 0);
}

#[tokio::test]
async fn restore_then_undo() {
    let state = test_helpers::test_app_state();
    let diagram = DiagramId::new();
    let shape = Shape {
        id: ShapeId::new(),
        kind: "task".into(),
        x: 1.0,
        y: 2.0,
        width: 120.0,
        height: 60.0,
        parent_id: None,
        props: serde_json::json!({ "label": "kept" }),
    };
    restore(&state, diagram, vec![shape.clone()], Vec::new()).await.unwrap();
    assert_eq!(state.store.get_shape(diagram, shape.id).await.unwrap(), Some(shape.clone()));

    assert!(undo(&state, diagram).await.unwrap().is_some());
    assert!(state.store.get_shape(diagram, shape.id).await.unwrap().is_none());
}
