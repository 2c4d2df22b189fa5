//! `invoke`: run a graph once and return its first output set.

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::error::HandlerError;
use crate::graph::GraphDescriptor;
use crate::invoke::{BoardCapability, NodeHandler, NodeHandlerContext};
use crate::run::SubgraphInvoker;
use crate::values::Values;

/// Runs the graph named by its `board` (capability) or `path` (`#name`)
/// input. Every other input is passed to the graph.
#[derive(Debug, Clone, Copy, Default)]
pub struct InvokeHandler;

#[async_trait]
impl NodeHandler for InvokeHandler {
    async fn invoke(&self, mut inputs: Values, ctx: NodeHandlerContext) -> Result<Values, HandlerError> {
        let graph = target_graph(&mut inputs, &ctx)?;
        debug!(
            node_id = %ctx.descriptor.id,
            title = graph.title.as_deref().unwrap_or(""),
            "invoking subgraph"
        );
        SubgraphInvoker::from_context(&ctx)
            .invoke(graph, inputs)
            .await
            .map_err(|e| HandlerError::Subgraph(e.to_string()))
    }
}

fn target_graph(inputs: &mut Values, ctx: &NodeHandlerContext) -> Result<GraphDescriptor, HandlerError> {
    if let Some(board) = inputs.remove("board") {
        return Ok(ctx.resolve_graph(&board)?);
    }
    match inputs.remove("path") {
        Some(Value::String(path)) => Ok(BoardCapability::reference(path).resolve(&ctx.graph)?),
        Some(other) => Err(HandlerError::InvalidInput(format!(
            "`path` must be a string, got {}",
            other
        ))),
        None => Err(HandlerError::InvalidInput(
            "invoke needs a `board` or `path` input".to_string(),
        )),
    }
}
