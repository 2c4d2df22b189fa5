//! `map`: run a board for every element of a list.

use async_trait::async_trait;
use futures::future::try_join_all;
use serde_json::Value;
use tracing::debug;

use crate::error::HandlerError;
use crate::invoke::{NodeHandler, NodeHandlerContext};
use crate::run::SubgraphInvoker;
use crate::values::{error_message, Values};

/// Runs `board` once per element of `list` with inputs `{item, index}`.
///
/// Runs are concurrent and independent; element `i` reports under the path
/// `<node path>.i`. Outputs are collected in list order on the `list` port.
/// Any failing element fails the whole node.
#[derive(Debug, Clone, Copy, Default)]
pub struct MapHandler;

#[async_trait]
impl NodeHandler for MapHandler {
    async fn invoke(&self, inputs: Values, ctx: NodeHandlerContext) -> Result<Values, HandlerError> {
        let list = match inputs.get("list") {
            Some(Value::Array(items)) => items.clone(),
            Some(other) => {
                return Err(HandlerError::InvalidInput(format!(
                    "`list` must be an array, got {}",
                    other
                )))
            }
            None => return Err(HandlerError::InvalidInput("map needs a `list` input".to_string())),
        };
        let board = inputs
            .get("board")
            .ok_or_else(|| HandlerError::InvalidInput("map needs a `board` input".to_string()))?;
        let graph = ctx.resolve_graph(board)?;
        debug!(node_id = %ctx.descriptor.id, items = list.len(), "mapping board over list");

        let runs = list.into_iter().enumerate().map(|(index, item)| {
            let invoker = SubgraphInvoker::from_context(&ctx).with_base_path(ctx.path.child(index));
            let graph = graph.clone();
            async move {
                let mut args = Values::new();
                args.insert("item".to_string(), item);
                args.insert("index".to_string(), Value::from(index));
                let outputs = invoker
                    .invoke(graph, args)
                    .await
                    .map_err(|e| HandlerError::Subgraph(e.to_string()))?;
                if let Some(message) = error_message(&outputs) {
                    return Err(HandlerError::ExecutionFailed(format!(
                        "element {}: {}",
                        index, message
                    )));
                }
                Ok(Value::Object(outputs))
            }
        });
        let results = try_join_all(runs).await?;

        let mut outputs = Values::new();
        outputs.insert("list".to_string(), Value::Array(results));
        Ok(outputs)
    }
}
