//! Visit order, wiring and readiness.

use std::sync::Arc;

use flowgraph::{
    Edge, EventKind, GraphDescriptor, MemorySink, NodeDescriptor, NodeTag, NullSink, RunConfig,
    RunController, RunError,
};
use serde_json::json;

use crate::common::{drive, obj, registry, started_nodes};

fn controller(graph: GraphDescriptor, sink: Arc<MemorySink>, config: RunConfig) -> RunController {
    RunController::new(Arc::new(graph), registry(), sink, config).unwrap()
}

/// **Scenario**: In a diamond with every input supplied, each node is visited exactly once.
#[tokio::test]
async fn diamond_visits_each_node_once() {
    let mut g = GraphDescriptor::new();
    g.add_node(NodeDescriptor::new("a", "passthrough").with_configuration(obj(json!({"v": 1}))))
        .add_node(NodeDescriptor::new("b", "passthrough"))
        .add_node(NodeDescriptor::new("c", "passthrough"))
        .add_node(NodeDescriptor::new("d", "passthrough"))
        .add_edge(Edge::wildcard("a", "b"))
        .add_edge(Edge::wildcard("a", "c"))
        .add_edge(Edge::wildcard("b", "d"))
        .add_edge(Edge::wildcard("c", "d"));
    let sink = Arc::new(MemorySink::new());
    let mut run = controller(g, sink.clone(), RunConfig::default());
    let (_, summary) = drive(&mut run, &Default::default()).await.unwrap();

    assert_eq!(started_nodes(&sink.events()), vec!["a", "b", "c", "d"]);
    assert_eq!(run.state().commits(), 4);
    assert_eq!(summary.steps, 4);
    assert!(summary.is_complete());
}

/// **Scenario**: Two edges into the same port: the later-declared edge's value wins.
#[tokio::test]
async fn last_write_wins() {
    let mut g = GraphDescriptor::new();
    g.add_node(NodeDescriptor::new("a", "passthrough").with_configuration(obj(json!({"x": 1}))))
        .add_node(NodeDescriptor::new("b", "passthrough").with_configuration(obj(json!({"x": 2}))))
        .add_node(NodeDescriptor::new("c", "passthrough"))
        .add_edge(Edge::new("a", "c", "x", "x"))
        .add_edge(Edge::new("b", "c", "x", "x"));
    let mut run = controller(g, Arc::new(MemorySink::new()), RunConfig::default());
    drive(&mut run, &Default::default()).await.unwrap();
    assert_eq!(run.state().outputs("c").unwrap()["x"], json!(2));
}

/// **Scenario**: A wildcard edge carries every non-null output.
#[tokio::test]
async fn wildcard_drops_nulls() {
    let mut g = GraphDescriptor::new();
    g.add_node(
        NodeDescriptor::new("a", "passthrough")
            .with_configuration(obj(json!({"a": 1, "b": null, "c": 3}))),
    )
    .add_node(NodeDescriptor::new("out", "output"))
    .add_edge(Edge::wildcard("a", "out"));
    let mut run = controller(g, Arc::new(MemorySink::new()), RunConfig::default());
    let (outputs, _) = drive(&mut run, &Default::default()).await.unwrap();
    assert_eq!(outputs.len(), 1);
    assert_eq!(outputs[0].outputs, obj(json!({"a": 1, "c": 3})));
}

fn unfed_port(config: Option<serde_json::Value>) -> GraphDescriptor {
    let mut node = NodeDescriptor::new("n", "passthrough");
    if let Some(config) = config {
        node = node.with_configuration(obj(config));
    }
    let mut g = GraphDescriptor::new();
    g.add_node(NodeDescriptor::new("src", "passthrough").with_configuration(obj(json!({"z": 1}))))
        .add_node(node)
        .add_edge(Edge::new("src", "n", "z", "z"))
        .add_edge(Edge::new("src", "n", "q", "q"));
    g
}

/// **Scenario**: A configured value satisfies a required port that nothing wires.
#[tokio::test]
async fn configuration_satisfies_readiness() {
    let sink = Arc::new(MemorySink::new());
    let mut run = controller(unfed_port(Some(json!({"q": 5}))), sink.clone(), RunConfig::default());
    let (_, summary) = drive(&mut run, &Default::default()).await.unwrap();
    assert!(summary.is_complete());
    assert!(!sink.kinds().contains(&EventKind::Skip));
    assert_eq!(run.state().outputs("n").unwrap()["q"], json!(5));
}

/// **Scenario**: An unfed required port skips the node; the summary reports it as incomplete.
#[tokio::test]
async fn missing_input_is_incomplete() {
    let sink = Arc::new(MemorySink::new());
    let mut run = controller(unfed_port(None), sink.clone(), RunConfig::default());
    let (_, summary) = drive(&mut run, &Default::default()).await.unwrap();

    assert!(sink.kinds().contains(&EventKind::Skip));
    assert!(!run.state().has_committed("n"));
    assert_eq!(summary.incomplete.len(), 1);
    assert_eq!(summary.incomplete[0].node, "n");
    assert_eq!(summary.incomplete[0].missing, vec!["q".to_string()]);
    assert!(matches!(
        summary.ensure_complete(),
        Err(RunError::Incomplete(missing)) if missing.len() == 1
    ));
}

fn tagged() -> GraphDescriptor {
    let mut g = GraphDescriptor::new();
    g.add_node(NodeDescriptor::new("a", "passthrough").with_configuration(obj(json!({"x": 1}))))
        .add_node(NodeDescriptor::new("b", "passthrough").with_tag(NodeTag::start("alt")))
        .add_edge(Edge::new("a", "b", "x", "x"));
    g
}

/// **Scenario**: A start label seeds only nodes tagged for it, and they run without their heads.
#[tokio::test]
async fn start_label_selects_entries() {
    let sink = Arc::new(MemorySink::new());
    let mut run = controller(tagged(), sink.clone(), RunConfig::default().with_start_label("alt"));
    let (_, summary) = drive(&mut run, &Default::default()).await.unwrap();
    assert_eq!(started_nodes(&sink.events()), vec!["b"]);
    assert!(summary.is_complete());

    let sink = Arc::new(MemorySink::new());
    let mut run = controller(tagged(), sink.clone(), RunConfig::default());
    drive(&mut run, &Default::default()).await.unwrap();
    assert_eq!(started_nodes(&sink.events()), vec!["a", "b"]);
}

/// **Scenario**: A run taking more steps than allowed stops with StepLimit.
#[tokio::test]
async fn step_limit_stops_run() {
    let mut g = GraphDescriptor::new();
    g.add_node(NodeDescriptor::new("a", "passthrough"))
        .add_node(NodeDescriptor::new("b", "passthrough"))
        .add_node(NodeDescriptor::new("c", "passthrough"))
        .add_edge(Edge::wildcard("a", "b"))
        .add_edge(Edge::wildcard("b", "c"));
    let mut run = RunController::new(
        Arc::new(g),
        registry(),
        Arc::new(NullSink),
        RunConfig::default().with_max_steps(Some(2)),
    )
    .unwrap();
    assert!(matches!(
        drive(&mut run, &Default::default()).await,
        Err(RunError::StepLimit(2))
    ));
}
