//! Save / resume tokens.

use std::sync::Arc;

use flowgraph::{
    CodecError, Edge, FsBlobStore, GraphDescriptor, InMemoryBlobStore, MemorySink, NodeDescriptor,
    RunConfig, RunController, RunError, RunStop,
};
use serde_json::{json, Value};

use crate::common::{drive, obj, registry, without_timestamps};

fn ask_twice() -> GraphDescriptor {
    let mut g = GraphDescriptor::new();
    g.add_node(NodeDescriptor::new("first", "input"))
        .add_node(NodeDescriptor::new("second", "input"))
        .add_node(NodeDescriptor::new("join", "passthrough"))
        .add_node(NodeDescriptor::new("out", "output"))
        .add_edge(Edge::new("first", "second", "text", "text"))
        .add_edge(Edge::new("first", "join", "text", "a"))
        .add_edge(Edge::new("second", "join", "more", "b"))
        .add_edge(Edge::wildcard("join", "out"));
    g
}

async fn suspended(sink: Arc<MemorySink>, config: RunConfig) -> RunController {
    let mut run = RunController::new(Arc::new(ask_twice()), registry(), sink, config).unwrap();
    assert!(matches!(run.run_until_stop().await.unwrap(), RunStop::Input(r) if r.node == "first"));
    run
}

/// **Scenario**: Resuming at an input suspension produces the same remaining events as an uninterrupted run.
#[tokio::test]
async fn resumed_run_emits_identical_events() {
    let answer = obj(json!({"text": "hi", "more": "there"}));

    let straight_sink = Arc::new(MemorySink::new());
    let mut straight = suspended(straight_sink.clone(), RunConfig::default()).await;
    let before = straight_sink.events().len();
    straight.provide_input(answer.clone()).unwrap();
    let (straight_outputs, _) = drive(&mut straight, &answer).await.unwrap();
    let straight_events = straight_sink.events()[before..].to_vec();

    let blobs = InMemoryBlobStore::new();
    let first = suspended(Arc::new(MemorySink::new()), RunConfig::default()).await;
    let token = first.save(&blobs).await.unwrap();
    drop(first);

    let resumed_sink = Arc::new(MemorySink::new());
    let mut resumed = RunController::resume(
        Arc::new(ask_twice()),
        registry(),
        resumed_sink.clone(),
        RunConfig::default(),
        &token,
        &blobs,
    )
    .await
    .unwrap();
    // The pending request is repeated after resume.
    assert!(matches!(resumed.run_until_stop().await.unwrap(), RunStop::Input(r) if r.node == "first"));
    resumed.provide_input(answer.clone()).unwrap();
    let (resumed_outputs, _) = drive(&mut resumed, &answer).await.unwrap();

    assert_eq!(
        without_timestamps(&resumed_sink.events()),
        without_timestamps(&straight_events)
    );
    assert_eq!(resumed_outputs, straight_outputs);
    assert_eq!(resumed_outputs[0].outputs, obj(json!({"a": "hi", "b": "there"})));
}

/// **Scenario**: A token from another version is refused with a descriptive error.
#[tokio::test]
async fn version_mismatch_fails_closed() {
    let blobs = InMemoryBlobStore::new();
    let run = suspended(Arc::new(MemorySink::new()), RunConfig::default()).await;
    let mut token: Value = serde_json::from_slice(&run.save(&blobs).await.unwrap()).unwrap();
    token["version"] = json!(99);
    let bytes = serde_json::to_vec(&token).unwrap();

    let err = RunController::resume(
        Arc::new(ask_twice()),
        registry(),
        Arc::new(MemorySink::new()),
        RunConfig::default(),
        &bytes,
        &blobs,
    )
    .await
    .err()
    .unwrap();
    assert!(matches!(
        err,
        RunError::Codec(CodecError::VersionMismatch { expected: 1, found: 99 })
    ));
    assert!(err.to_string().contains("99"));
}

/// **Scenario**: A token with a foreign schema tag is refused.
#[tokio::test]
async fn schema_mismatch_fails_closed() {
    let blobs = InMemoryBlobStore::new();
    let bytes = serde_json::to_vec(&json!({"schema": "other", "version": 1})).unwrap();
    let err = RunController::resume(
        Arc::new(ask_twice()),
        registry(),
        Arc::new(MemorySink::new()),
        RunConfig::default(),
        &bytes,
        &blobs,
    )
    .await
    .err()
    .unwrap();
    assert!(matches!(err, RunError::Codec(CodecError::SchemaMismatch(Some(s))) if s == "other"));
}

/// **Scenario**: Values over the threshold go to the filesystem store and come back on resume.
#[tokio::test]
async fn large_values_are_externalized() {
    let dir = tempfile::tempdir().unwrap();
    let blobs = FsBlobStore::new(dir.path());
    let config = RunConfig::default().with_blob_threshold(Some(16));
    let big = "x".repeat(200);

    let mut run = suspended(Arc::new(MemorySink::new()), config.clone()).await;
    run.provide_input(obj(json!({"text": big}))).unwrap();
    assert!(matches!(run.run_until_stop().await.unwrap(), RunStop::Input(r) if r.node == "second"));
    let token = run.save(&blobs).await.unwrap();

    assert!(!String::from_utf8_lossy(&token).contains(&big));
    assert!(std::fs::read_dir(dir.path()).unwrap().count() >= 1);

    let mut resumed = RunController::resume(
        Arc::new(ask_twice()),
        registry(),
        Arc::new(MemorySink::new()),
        config,
        &token,
        &blobs,
    )
    .await
    .unwrap();
    match resumed.run_until_stop().await.unwrap() {
        RunStop::Input(request) => assert_eq!(request.inputs["text"], json!(big)),
        other => panic!("expected Input, got {:?}", other),
    }
    resumed.provide_input(obj(json!({"more": "m"}))).unwrap();
    let (outputs, _) = drive(&mut resumed, &Default::default()).await.unwrap();
    assert_eq!(outputs[0].outputs["a"], json!(big));
}
