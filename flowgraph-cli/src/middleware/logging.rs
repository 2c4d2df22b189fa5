//! Logging middleware that traces node enter/exit around each handler call.

use std::time::Instant;

use async_trait::async_trait;
use flowgraph::invoke::InvokeFn;
use flowgraph::values::error_message;
use flowgraph::{HandlerError, NodeDescriptor, NodeMiddleware, Values};

/// Middleware that logs node enter/exit, with elapsed time, around each handler call.
///
/// Logs go through `tracing` (stderr in the binary) so stdout stays JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingMiddleware;

#[async_trait]
impl NodeMiddleware for LoggingMiddleware {
    async fn around_invoke(
        &self,
        node: &NodeDescriptor,
        inputs: Values,
        inner: InvokeFn,
    ) -> Result<Values, HandlerError> {
        tracing::debug!(node_id = %node.id, node_type = %node.node_type, inputs = inputs.len(), "enter node");
        let started = Instant::now();
        let result = inner(inputs).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(outputs) => match error_message(outputs) {
                Some(message) => {
                    tracing::warn!(node_id = %node.id, elapsed_ms, error = %message, "exit node with $error")
                }
                None => tracing::debug!(node_id = %node.id, elapsed_ms, outputs = outputs.len(), "exit node"),
            },
            Err(e) => tracing::warn!(node_id = %node.id, elapsed_ms, error = %e, "exit node with error"),
        }
        result
    }
}
