//! Shared helpers: a registry with test handlers and a driver that answers
//! every input request with fixed values.

use std::sync::Arc;
use std::time::Duration;

use flowgraph::{
    handler_fn, DiagnosticEvent, HandlerError, HandlerRegistry, OutputResult, RunController,
    RunError, RunStop, RunSummary, Values,
};
use serde_json::Value;

pub fn obj(value: Value) -> Values {
    value.as_object().cloned().expect("object literal")
}

/// Core kit plus `fail` (always errors with "boom") and `slow` (sleeps a minute).
pub fn registry() -> Arc<HandlerRegistry> {
    Arc::new(
        HandlerRegistry::new()
            .with_core_kit()
            .with_handler(
                "fail",
                handler_fn(|_, _| async { Err(HandlerError::ExecutionFailed("boom".into())) }),
            )
            .with_handler(
                "slow",
                handler_fn(|inputs, _| async move {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                    Ok(inputs)
                }),
            ),
    )
}

/// Runs to completion, answering each input request with `inputs`.
pub async fn drive(
    run: &mut RunController,
    inputs: &Values,
) -> Result<(Vec<OutputResult>, RunSummary), RunError> {
    let mut outputs = Vec::new();
    loop {
        match run.run_until_stop().await? {
            RunStop::Input(_) => run.provide_input(inputs.clone())?,
            RunStop::Output(result) => outputs.push(result),
            RunStop::Done(summary) => return Ok((outputs, summary)),
        }
    }
}

/// Node ids of `nodestart` events, in order.
pub fn started_nodes(events: &[DiagnosticEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match &e.data {
            flowgraph::EventData::NodeStart { node, .. } => Some(node.clone()),
            _ => None,
        })
        .collect()
}

/// Events as JSON with timestamps removed.
pub fn without_timestamps(events: &[DiagnosticEvent]) -> Vec<Value> {
    events
        .iter()
        .map(|e| {
            let mut value = serde_json::to_value(e).expect("event serializes");
            if let Some(map) = value.as_object_mut() {
                map.remove("timestamp");
            }
            value
        })
        .collect()
}
