//! Graph Lifecycle Integration Tests
//!
//! Tests the engine end to end through its public API:
//! - Registration and node creation
//! - Cancellable lifecycle events
//! - Namespaced and one-shot listeners
//! - Snap guide ingestion from widget callbacks
//! - Configuration round trips and change forwarding

use std::cell::RefCell;
use std::rc::Rc;

use nodeboard_core::{
    AddNodeOptions, BackgroundOptions, BackgroundPosition, Callback, Component, DragPosition,
    Event, Graph, GraphError, GraphOptions, InteractionEvent, ListenOptions, RecordingRenderer,
    RegisterOptions, RenderCall, SnapLine, SnaplineData,
};
use serde_json::{json, Value};

/// Create a graph with a `box` type registered at the default size.
fn box_graph() -> Graph {
    let mut graph = Graph::new(GraphOptions::new("#app")).expect("graph");
    graph
        .register_node("box", RegisterOptions::new(Component::new("box")))
        .expect("register");
    graph
}

/// Collect the names of every event delivered to the listeners of `names`.
fn event_log(graph: &Graph, names: &[&str]) -> Rc<RefCell<Vec<String>>> {
    let log = Rc::new(RefCell::new(Vec::new()));
    for name in names {
        let sink = Rc::clone(&log);
        graph.on(
            name,
            move |event: &Event| {
                sink.borrow_mut().push(event.name().to_string());
                Ok(())
            },
            ListenOptions::default(),
        );
    }
    log
}

fn shown(position: &str) -> SnapLine {
    SnapLine {
        display: true,
        position: position.to_string(),
        ..SnapLine::default()
    }
}

// ============================================================================
// Node Lifecycle Tests
// ============================================================================

#[test]
fn test_register_then_add_uses_type_defaults() {
    let mut graph = box_graph();
    let node = graph
        .add_node(AddNodeOptions::new("box"))
        .expect("add")
        .expect("not cancelled");

    assert_eq!(node.id, "node-1");
    assert_eq!(node.component, "box");
    assert_eq!(node.position(), (0.0, 0.0));
    assert_eq!(node.size(), (100.0, 100.0));
    assert!(node.data().is_empty());
    assert_eq!(graph.nodes(), [node].as_slice());
}

#[test]
fn test_box_lifecycle_add_move_remove() {
    let mut graph = box_graph();
    let node = graph
        .add_node(AddNodeOptions::new("box"))
        .expect("add")
        .expect("not cancelled");
    assert_eq!(node.id, "node-1");
    assert_eq!(node.position(), (0.0, 0.0));
    assert_eq!(node.size(), (100.0, 100.0));

    graph
        .update_node_by_id("node-1", json!({"x": 50, "y": 20}))
        .expect("update");
    let moved = graph.get_node_by_id("node-1").expect("node");
    assert_eq!(moved.position(), (50.0, 20.0));
    assert_eq!(moved.size(), (100.0, 100.0));

    graph.remove_node_by_id("node-1").expect("removed");
    assert_eq!(graph.node_count(), 0);
    assert!(graph.get_node_by_id("node-1").is_none());
}

#[test]
fn test_add_emits_before_add_then_add_then_cell_add() {
    let mut graph = box_graph();
    let log = event_log(&graph, &["node:beforeadd", "node:add", "cell:add"]);

    graph.add_node(AddNodeOptions::new("box")).expect("add");

    assert_eq!(
        *log.borrow(),
        ["node:beforeadd", "node:add", "cell:add"].map(String::from)
    );
}

#[test]
fn test_cancelled_add_leaves_graph_untouched() {
    let mut graph = box_graph();
    graph.on(
        "node:beforeadd",
        |event: &Event| {
            event.stop_propagation();
            Ok(())
        },
        ListenOptions::default(),
    );
    let log = event_log(&graph, &["node:add", "cell:add"]);

    let result = graph.add_node(AddNodeOptions::new("box")).expect("add");

    assert!(result.is_none());
    assert_eq!(graph.node_count(), 0);
    assert!(log.borrow().is_empty());
}

#[test]
fn test_generated_ids_never_reuse_removed_ones() {
    let mut graph = box_graph();
    for _ in 0..3 {
        graph.add_node(AddNodeOptions::new("box")).expect("add");
    }
    graph.remove_node_by_id("node-3").expect("removed");

    let next = graph
        .add_node(AddNodeOptions::new("box"))
        .expect("add")
        .expect("node");

    assert_eq!(next.id, "node-4");
}

#[test]
fn test_partial_update_merges_nested_data() {
    let mut graph = box_graph();
    let data = json!({"label": "start", "style": {"fill": "red"}});
    graph
        .add_node(AddNodeOptions::new("box").with_data(data.as_object().cloned().expect("map")))
        .expect("add");

    graph
        .update_node_by_id("node-1", json!({"x": 40, "data": {"style": {"stroke": "blue"}}}))
        .expect("update");

    let node = graph.get_node_by_id("node-1").expect("node");
    assert_eq!(node.x, 40.0);
    assert_eq!(node.width, 100.0);
    assert_eq!(
        Value::Object(node.data.clone()),
        json!({"label": "start", "style": {"fill": "red", "stroke": "blue"}})
    );
}

#[test]
fn test_unknown_type_is_rejected() {
    let mut graph = box_graph();
    let err = graph
        .add_node(AddNodeOptions::new("circle"))
        .expect_err("unregistered");
    assert!(matches!(err, GraphError::UnregisteredType(_)));
    assert_eq!(err.to_string(), "Node type 'circle' is not registered");
}

// ============================================================================
// Listener Tests
// ============================================================================

#[test]
fn test_namespaced_off_keeps_other_listeners() {
    let mut graph = box_graph();
    let hits = Rc::new(RefCell::new(Vec::new()));
    for name in ["node:add.ui", "node:add.audit", "node:add"] {
        let sink = Rc::clone(&hits);
        graph.on(
            name,
            move |_: &Event| {
                sink.borrow_mut().push(name);
                Ok(())
            },
            ListenOptions::default(),
        );
    }

    graph.off("node:add.ui");
    graph.add_node(AddNodeOptions::new("box")).expect("add");

    assert_eq!(*hits.borrow(), ["node:add.audit", "node:add"]);
}

#[test]
fn test_once_listener_fires_a_single_time() {
    let mut graph = box_graph();
    let count = Rc::new(RefCell::new(0));
    let sink = Rc::clone(&count);
    graph.once("node:add", move |_: &Event| {
        *sink.borrow_mut() += 1;
        Ok(())
    });

    graph.add_node(AddNodeOptions::new("box")).expect("add");
    graph.add_node(AddNodeOptions::new("box")).expect("add");

    assert_eq!(*count.borrow(), 1);
    assert!(!graph.events().has_listeners("node:add"));
}

#[test]
fn test_off_callback_removes_only_that_callback() {
    let graph = box_graph();
    let hits = Rc::new(RefCell::new(0));
    let sink = Rc::clone(&hits);
    let counted = Callback::new(move |_: &Event| {
        *sink.borrow_mut() += 1;
        Ok(())
    });
    graph.on("ping", counted.clone(), ListenOptions::default());
    graph.on("ping", |_: &Event| Ok(()), ListenOptions::default());

    graph.off_callback("ping", &counted);
    graph.trigger("ping", Value::Null);

    assert_eq!(*hits.borrow(), 0);
    assert_eq!(graph.events().get_all_listeners()["ping"].len(), 1);
}

#[test]
fn test_failing_listener_does_not_stop_dispatch() {
    let mut graph = box_graph();
    graph.on(
        "node:add",
        |_: &Event| Err("listener failed".into()),
        ListenOptions::default(),
    );
    let log = event_log(&graph, &["node:add"]);

    let node = graph.add_node(AddNodeOptions::new("box")).expect("add");

    assert!(node.is_some());
    assert_eq!(log.borrow().len(), 1);
}

#[test]
fn test_events_carry_graph_context() {
    let mut graph = box_graph();
    let seen = Rc::new(RefCell::new(None));
    let sink = Rc::clone(&seen);
    graph.on(
        "node:add",
        move |event: &Event| {
            *sink.borrow_mut() = event.get("container").cloned();
            Ok(())
        },
        ListenOptions::default(),
    );

    graph.add_node(AddNodeOptions::new("box")).expect("add");

    assert_eq!(*seen.borrow(), Some(json!("#app")));
}

// ============================================================================
// Snap Guide Tests
// ============================================================================

#[test]
fn test_center_guide_wins_after_drag_callback() {
    let mut graph = box_graph();
    graph.add_node(AddNodeOptions::new("box")).expect("add");

    let guides = SnaplineData {
        v_line: [shown("10px"), shown("110px"), shown("60px")],
        h_line: [shown("0px"), SnapLine::default(), SnapLine::default()],
    };
    graph
        .handle_interaction("node-1", &InteractionEvent::RefLineParams(guides))
        .expect("guides");

    let data = graph.snapline_data();
    assert_eq!(
        data.v_line.iter().map(|l| l.display).collect::<Vec<_>>(),
        [false, false, true]
    );
    assert!(data.h_line[0].display);
    assert_eq!(graph.guide_overlay().len(), 2);

    graph
        .handle_interaction(
            "node-1",
            &InteractionEvent::DragStop(DragPosition { x: 25.0, y: 30.0 }),
        )
        .expect("drag stop");

    assert!(!graph.snapline_data().any_displayed());
    assert_eq!(
        graph.get_node_by_id("node-1").expect("node").position(),
        (25.0, 30.0)
    );
}

// ============================================================================
// Configuration Tests
// ============================================================================

#[test]
fn test_config_round_trip_and_forwarding() {
    let mut graph = box_graph();
    let log = event_log(&graph, &["config:change"]);

    graph
        .config_mut()
        .set("snapline.className", json!("guide"))
        .expect("set");
    graph
        .config_mut()
        .set_mapping(json!({"width": 1024}))
        .expect("merge");

    assert_eq!(graph.config().get("snapline.className"), Some(&json!("guide")));
    assert_eq!(graph.config().get("snapline.tolerance"), Some(&json!(5.0)));
    assert_eq!(graph.config().width(), 1024.0);
    assert_eq!(log.borrow().len(), 2);
    assert!(graph.config().validate().valid);
}

#[test]
fn test_background_flows_to_renderer() {
    let recorder = RecordingRenderer::new();
    let options = GraphOptions {
        width: Some(640.0),
        ..GraphOptions::new("#board")
    };
    let mut graph = Graph::with_renderer(options, Box::new(recorder.clone())).expect("graph");

    let style = graph
        .draw_background(&BackgroundOptions {
            image: Some("grid.png".to_string()),
            position: Some(BackgroundPosition::Pixels { x: 10.0, y: 20.0 }),
            ..BackgroundOptions::default()
        })
        .expect("draw");

    assert_eq!(style.background_image, "url(grid.png)");
    assert_eq!(style.background_position.as_deref(), Some("10px 20px"));
    assert_eq!(style.background_color, "transparent");

    let calls = recorder.calls();
    assert!(matches!(
        &calls[0],
        RenderCall::Mount { target, width, .. } if target.as_str() == "#board" && *width == 640.0
    ));
    assert!(matches!(
        calls.last(),
        Some(RenderCall::PaintBackground { style: painted }) if *painted == style
    ));
}

#[test]
fn test_destroy_reports_and_tears_down() {
    let mut graph = box_graph();
    graph.add_node(AddNodeOptions::new("box")).expect("add");
    let log = event_log(&graph, &["beforedestroy", "destroy"]);

    assert!(graph.destroy());

    assert_eq!(*log.borrow(), ["beforedestroy", "destroy"].map(String::from));
    assert!(graph.is_destroyed());
    assert_eq!(graph.node_count(), 0);
    assert!(graph.events().get_all_listeners().is_empty());
}
