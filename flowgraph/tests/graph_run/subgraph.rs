//! Running graphs inside graphs: invoke, map, lambda, bubbling.

use std::sync::Arc;

use flowgraph::{
    Edge, EventKind, GraphDescriptor, InvocationPath, MemorySink, NodeDescriptor, RunConfig,
    RunController, RunStop,
};
use flowgraph::run::FORWARDED_EVENTS;
use flowgraph::values::error_message;
use serde_json::json;

use crate::common::{drive, obj, registry};

/// `in -> out`, passing every input through.
fn echo() -> GraphDescriptor {
    let mut g = GraphDescriptor::new().with_title("echo");
    g.add_node(NodeDescriptor::new("in", "input"))
        .add_node(NodeDescriptor::new("out", "output"))
        .add_edge(Edge::wildcard("in", "out"));
    g
}

fn invoking(inner_name: &str, inner: GraphDescriptor) -> GraphDescriptor {
    let mut g = GraphDescriptor::new();
    g.add_node(NodeDescriptor::new("start", "input"))
        .add_node(
            NodeDescriptor::new("call", "invoke")
                .with_configuration(obj(json!({"path": format!("#{}", inner_name)}))),
        )
        .add_node(NodeDescriptor::new("out", "output"))
        .add_edge(Edge::wildcard("start", "call"))
        .add_edge(Edge::wildcard("call", "out"))
        .add_graph(inner_name, inner);
    g
}

/// **Scenario**: An invoke node runs a named subgraph and passes its outputs on.
#[tokio::test]
async fn invoke_runs_named_subgraph() {
    let sink = Arc::new(MemorySink::new());
    let mut run =
        RunController::new(Arc::new(invoking("echo", echo())), registry(), sink.clone(), RunConfig::default())
            .unwrap();
    let (outputs, summary) = drive(&mut run, &obj(json!({"n": 7}))).await.unwrap();
    assert!(summary.is_complete());
    assert_eq!(outputs.len(), 1);
    assert_eq!(outputs[0].outputs, obj(json!({"n": 7})));
}

/// **Scenario**: Inner events are forwarded by kind, under the invoking node's path.
#[tokio::test]
async fn inner_events_are_forwarded_under_outer_path() {
    let sink = Arc::new(MemorySink::new());
    let mut run =
        RunController::new(Arc::new(invoking("echo", echo())), registry(), sink.clone(), RunConfig::default())
            .unwrap();
    drive(&mut run, &obj(json!({"n": 7}))).await.unwrap();

    let events = sink.events();
    // `call` is the second invocation of the outer run; the inner run reports
    // its graph events at that path and its node events beneath it.
    let call_path = InvocationPath::from(vec![2]);
    let inner: Vec<_> = events.iter().filter(|e| e.path.depth() == 2).collect();
    assert!(!inner.is_empty());
    assert!(inner.iter().all(|e| e.path.starts_with(&call_path)));
    assert!(inner.iter().all(|e| FORWARDED_EVENTS.contains(&e.kind())));
    assert!(!inner.iter().any(|e| e.kind() == EventKind::Edge));
    let graph_starts: Vec<_> = events
        .iter()
        .filter(|e| e.kind() == EventKind::GraphStart)
        .map(|e| e.path.clone())
        .collect();
    assert_eq!(graph_starts, vec![InvocationPath::new(), call_path]);
}

/// **Scenario**: A failure inside a subgraph reaches the outer graph as a routable `$error` output.
#[tokio::test]
async fn inner_failure_crosses_boundary_as_error_output() {
    let mut inner = GraphDescriptor::new();
    inner
        .add_node(NodeDescriptor::new("in", "input"))
        .add_node(NodeDescriptor::new("bad", "fail"))
        .add_node(NodeDescriptor::new("out", "output"))
        .add_edge(Edge::wildcard("in", "bad"))
        .add_edge(Edge::wildcard("bad", "out"));
    let mut outer = invoking("broken", inner);
    outer
        .add_node(NodeDescriptor::new("report", "output"))
        .add_edge(Edge::new("call", "report", "$error", "error"));

    let mut run =
        RunController::new(Arc::new(outer), registry(), Arc::new(MemorySink::new()), RunConfig::default())
            .unwrap();
    let (outputs, _) = drive(&mut run, &obj(json!({"n": 1}))).await.unwrap();
    assert_eq!(outputs.len(), 1);
    assert_eq!(outputs[0].node, "report");
    let message = outputs[0].outputs["error"]["error"]["message"].as_str().unwrap();
    assert!(message.contains("boom"));
}

/// **Scenario**: A subgraph whose output node is never fed fails the invoking node instead of returning `{}`.
#[tokio::test]
async fn unfed_inner_output_fails_the_call() {
    let mut inner = GraphDescriptor::new();
    inner
        .add_node(NodeDescriptor::new("in", "input"))
        .add_node(NodeDescriptor::new("out", "output"))
        .add_edge(Edge::new("in", "out", "y", "y"));
    let mut run = RunController::new(
        Arc::new(invoking("partial", inner)),
        registry(),
        Arc::new(MemorySink::new()),
        RunConfig::default(),
    )
    .unwrap();
    let (outputs, _) = drive(&mut run, &obj(json!({"x": 1}))).await.unwrap();

    let call = run.state().outputs("call").unwrap();
    let message = error_message(call).unwrap();
    assert!(message.contains("incomplete"), "{}", message);
    // The failure travels the wildcard edge to the outer output.
    assert_eq!(outputs.len(), 1);
    assert!(error_message(&outputs[0].outputs).is_some());
}

/// **Scenario**: map over a list with a lambda-bound board collects per-element outputs in order.
#[tokio::test]
async fn map_with_lambda_bound_board() {
    let mut g = GraphDescriptor::new();
    g.add_node(NodeDescriptor::new("start", "input"))
        .add_node(
            NodeDescriptor::new("bind", "lambda")
                .with_configuration(obj(json!({"board": {"kind": "board", "path": "#echo"}}))),
        )
        .add_node(NodeDescriptor::new("each", "map"))
        .add_node(NodeDescriptor::new("out", "output"))
        .add_edge(Edge::new("start", "bind", "greeting", "greeting"))
        .add_edge(Edge::new("start", "each", "list", "list"))
        .add_edge(Edge::new("bind", "each", "board", "board"))
        .add_edge(Edge::new("each", "out", "list", "results"))
        .add_graph("echo", echo());

    let sink = Arc::new(MemorySink::new());
    let mut run = RunController::new(Arc::new(g), registry(), sink.clone(), RunConfig::default()).unwrap();
    let (outputs, summary) = drive(&mut run, &obj(json!({"greeting": "hi", "list": [10, 20]})))
        .await
        .unwrap();
    assert!(summary.is_complete());
    assert_eq!(
        outputs[0].outputs["results"],
        json!([
            {"greeting": "hi", "item": 10, "index": 0},
            {"greeting": "hi", "item": 20, "index": 1},
        ])
    );
    // Element runs report under `<map path>.<index>`.
    let map_path = InvocationPath::from(vec![3]);
    for index in 0..2 {
        let element = map_path.child(index);
        assert!(sink
            .events()
            .iter()
            .any(|e| e.kind() == EventKind::GraphStart && e.path.starts_with(&element)));
    }
}

/// **Scenario**: A subgraph input whose schema needs a key the caller did not pass bubbles to the outer caller.
#[tokio::test]
async fn missing_required_key_bubbles_out() {
    let mut inner = echo();
    inner.node_mut("in").unwrap().configuration = obj(json!({
        "schema": {"type": "object", "required": ["secret"]}
    }));
    let mut run = RunController::new(
        Arc::new(invoking("guarded", inner)),
        registry(),
        Arc::new(MemorySink::new()),
        RunConfig::default(),
    )
    .unwrap();

    assert!(matches!(run.run_until_stop().await.unwrap(), RunStop::Input(r) if r.node == "start"));
    run.provide_input(obj(json!({"n": 1}))).unwrap();
    match run.run_until_stop().await.unwrap() {
        RunStop::Input(request) => {
            assert!(request.bubbled);
            assert_eq!(request.node, "in");
            assert_eq!(request.required_keys(), vec!["secret".to_string()]);
            assert_eq!(request.path.depth(), 2);
        }
        other => panic!("expected bubbled Input, got {:?}", other),
    }
    run.provide_input(obj(json!({"secret": "s3"}))).unwrap();
    match run.run_until_stop().await.unwrap() {
        RunStop::Output(result) => {
            assert_eq!(result.outputs["secret"], json!("s3"));
            assert_eq!(result.outputs["n"], json!(1));
        }
        other => panic!("expected Output, got {:?}", other),
    }
}
