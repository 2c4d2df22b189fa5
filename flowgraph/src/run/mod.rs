//! Running graphs: the controller state machine, its configuration, the stops
//! it yields and nested subgraph runs.

mod config;
mod controller;
mod stop;
mod subgraph;

use std::sync::Arc;

use crate::diagnostics::DiagnosticsSink;
use crate::error::RunError;
use crate::graph::GraphDescriptor;
use crate::invoke::HandlerRegistry;
use crate::values::Values;

pub use config::{RunConfig, DEFAULT_BLOB_THRESHOLD, DEFAULT_MAX_STEPS};
pub use controller::{RunController, RunPhase};
pub use stop::{InputRequest, OutputResult, RunStop, RunSummary};
pub use subgraph::{SubgraphInvoker, FORWARDED_EVENTS};

/// Runs `graph` once: every input request is answered with `inputs`, and the
/// first output set is returned.
///
/// Empty when the graph has no output node. A run whose output nodes were
/// never reached is `RunError::Incomplete`.
pub async fn run_once(
    graph: GraphDescriptor,
    registry: Arc<HandlerRegistry>,
    sink: Arc<dyn DiagnosticsSink>,
    inputs: Values,
) -> Result<Values, RunError> {
    let controller = RunController::new(Arc::new(graph), registry, sink, RunConfig::default())?;
    subgraph::drive_to_first_output(controller, &inputs, None, None).await
}
