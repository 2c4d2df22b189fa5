//! Handler failures, structural errors and cancellation.

use std::sync::Arc;
use std::time::Duration;

use flowgraph::values::error_message;
use flowgraph::{
    Edge, EventKind, GraphDescriptor, MemorySink, NodeDescriptor, NullSink, RunConfig,
    RunController, RunError, RunPhase, StructuralError,
};

use crate::common::{drive, registry};

fn failing(routed: bool) -> GraphDescriptor {
    let mut g = GraphDescriptor::new();
    g.add_node(NodeDescriptor::new("f", "fail"))
        .add_node(NodeDescriptor::new("next", "passthrough"))
        .add_edge(Edge::new("f", "next", "text", "text"));
    if routed {
        g.add_node(NodeDescriptor::new("catch", "passthrough"))
            .add_edge(Edge::new("f", "catch", "$error", "error"));
    }
    g
}

/// **Scenario**: A "boom" handler commits sentinel outputs that an `$error` edge routes; it is not a skip.
#[tokio::test]
async fn routed_error_is_a_value() {
    let sink = Arc::new(MemorySink::new());
    let mut run =
        RunController::new(Arc::new(failing(true)), registry(), sink.clone(), RunConfig::default())
            .unwrap();
    let (_, summary) = drive(&mut run, &Default::default()).await.unwrap();

    let outputs = run.state().outputs("f").unwrap();
    assert!(error_message(outputs).unwrap().contains("boom"));
    assert!(run.state().has_committed("catch"));
    // The named `text` port has no value on failure.
    assert!(!run.state().has_committed("next"));
    assert!(!sink.kinds().contains(&EventKind::Skip));
    assert!(summary.is_complete());
}

/// **Scenario**: A wildcard edge delivers the sentinel downstream like any other output.
#[tokio::test]
async fn wildcard_edge_catches_error() {
    let mut g = GraphDescriptor::new();
    g.add_node(NodeDescriptor::new("f", "fail"))
        .add_node(NodeDescriptor::new("catch", "output"))
        .add_edge(Edge::wildcard("f", "catch"));
    let mut run =
        RunController::new(Arc::new(g), registry(), Arc::new(NullSink), RunConfig::default())
            .unwrap();
    let (outputs, summary) = drive(&mut run, &Default::default()).await.unwrap();

    assert_eq!(outputs.len(), 1);
    assert_eq!(outputs[0].node, "catch");
    assert!(error_message(&outputs[0].outputs).unwrap().contains("boom"));
    assert!(run.state().has_committed("catch"));
    assert!(summary.is_complete());
}

/// **Scenario**: When only named non-error edges leave the node, the failure ends the run with a handler error.
#[tokio::test]
async fn unrouted_error_ends_run() {
    let mut run =
        RunController::new(Arc::new(failing(false)), registry(), Arc::new(NullSink), RunConfig::default())
            .unwrap();
    match drive(&mut run, &Default::default()).await {
        Err(RunError::Handler { node, message }) => {
            assert_eq!(node, "f");
            assert!(message.contains("boom"));
        }
        other => panic!("expected handler error, got {:?}", other.map(|_| ())),
    }
    assert_eq!(run.phase(), RunPhase::Failed);
    assert!(matches!(
        run.run_until_stop().await,
        Err(RunError::InvalidState(_))
    ));
}

/// **Scenario**: Unregistered node types are rejected before the run starts.
#[test]
fn unknown_type_fails_validation() {
    let mut g = GraphDescriptor::new();
    g.add_node(NodeDescriptor::new("x", "teleport"));
    let err = RunController::new(Arc::new(g), registry(), Arc::new(NullSink), RunConfig::default())
        .err()
        .unwrap();
    assert!(matches!(
        err,
        RunError::Structural(StructuralError::UnknownNodeType { node_type, .. }) if node_type == "teleport"
    ));
}

/// **Scenario**: An edge naming a missing node is rejected before the run starts.
#[test]
fn dangling_edge_fails_validation() {
    let mut g = GraphDescriptor::new();
    g.add_node(NodeDescriptor::new("a", "passthrough"))
        .add_edge(Edge::wildcard("a", "ghost"));
    let err = RunController::new(Arc::new(g), registry(), Arc::new(NullSink), RunConfig::default())
        .err()
        .unwrap();
    assert!(matches!(
        err,
        RunError::Structural(StructuralError::DanglingEdge { .. })
    ));
}

/// **Scenario**: Cancelling while a handler is in flight ends the run with Cancelled.
#[tokio::test]
async fn cancellation_interrupts_handler() {
    let mut g = GraphDescriptor::new();
    g.add_node(NodeDescriptor::new("wait", "slow"));
    let mut run =
        RunController::new(Arc::new(g), registry(), Arc::new(NullSink), RunConfig::default()).unwrap();
    let token = run.cancellation_token();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        token.cancel();
    });
    let started = std::time::Instant::now();
    assert!(matches!(run.run_until_stop().await, Err(RunError::Cancelled)));
    assert!(started.elapsed() < Duration::from_secs(30));
}

/// **Scenario**: A token cancelled up front stops the run at the first step.
#[tokio::test]
async fn cancelled_before_first_step() {
    let mut g = GraphDescriptor::new();
    g.add_node(NodeDescriptor::new("a", "passthrough"));
    let token = tokio_util::sync::CancellationToken::new();
    token.cancel();
    let sink = Arc::new(MemorySink::new());
    let mut run = RunController::new(Arc::new(g), registry(), sink.clone(), RunConfig::default())
        .unwrap()
        .with_cancellation(token);
    assert!(matches!(run.run_until_stop().await, Err(RunError::Cancelled)));
    assert_eq!(sink.kinds(), vec![EventKind::GraphStart]);
}
