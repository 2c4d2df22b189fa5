//! Runs an embedded graph from inside a handler.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::diagnostics::{DiagnosticsSink, EventKind, FilteredSink};
use crate::error::RunError;
use crate::graph::GraphDescriptor;
use crate::invoke::{HandlerRegistry, InputRequester, NodeHandlerContext, OutputProvider};
use crate::path::InvocationPath;
use crate::run::config::RunConfig;
use crate::run::controller::RunController;
use crate::run::stop::{InputRequest, RunStop};
use crate::values::{error_outputs, merge, Values};

/// Inner events forwarded to the outer sink unless configured otherwise.
pub const FORWARDED_EVENTS: [EventKind; 4] = [
    EventKind::GraphStart,
    EventKind::NodeStart,
    EventKind::NodeEnd,
    EventKind::GraphEnd,
];

/// Runs a graph to its first output set on behalf of an outer node.
///
/// **Interaction**: Built from the outer [`NodeHandlerContext`]; inner paths
/// sit under the outer node's path, inner cancellation follows the outer
/// token, and input requests the inner graph cannot answer from its inputs
/// are bubbled through the outer requester.
#[derive(Clone)]
pub struct SubgraphInvoker {
    registry: Arc<HandlerRegistry>,
    sink: Arc<dyn DiagnosticsSink>,
    base_path: InvocationPath,
    cancel: CancellationToken,
    requester: Option<InputRequester>,
    output_provider: Option<OutputProvider>,
    forwarded: Vec<EventKind>,
}

impl SubgraphInvoker {
    pub fn from_context(ctx: &NodeHandlerContext) -> Self {
        Self {
            registry: ctx.registry.clone(),
            sink: ctx.sink.clone(),
            base_path: ctx.path.clone(),
            cancel: ctx.cancel.clone(),
            requester: ctx.requester.clone(),
            output_provider: ctx.output_provider.clone(),
            forwarded: FORWARDED_EVENTS.to_vec(),
        }
    }

    /// Replaces the set of inner event kinds reported to the outer sink.
    pub fn with_forwarded(mut self, kinds: impl IntoIterator<Item = EventKind>) -> Self {
        self.forwarded = kinds.into_iter().collect();
        self
    }

    pub fn with_base_path(mut self, path: InvocationPath) -> Self {
        self.base_path = path;
        self
    }

    /// Runs `graph` with `inputs` merged over its `args`.
    ///
    /// An inner handler failure comes back as `$error` outputs. Structural
    /// problems, cancellation, the step limit and an inner run left
    /// incomplete are errors.
    pub async fn invoke(&self, graph: GraphDescriptor, inputs: Values) -> Result<Values, RunError> {
        let args = merge(&graph.args, &inputs);
        let sink: Arc<dyn DiagnosticsSink> =
            Arc::new(FilteredSink::new(self.sink.clone(), self.forwarded.iter().copied()));
        let config = RunConfig::default().with_base_path(self.base_path.clone());
        let controller = RunController::new(Arc::new(graph), self.registry.clone(), sink, config)?
            .with_cancellation(self.cancel.child_token());
        let outcome = drive_to_first_output(
            controller,
            &args,
            self.requester.as_ref(),
            self.output_provider.as_ref(),
        )
        .await;
        match outcome {
            Err(RunError::Handler { message, .. }) => Ok(error_outputs(message)),
            other => other,
        }
    }
}

/// Drives `controller` until its first output node, answering input requests
/// with `args`. Returns empty values when the graph has no output node.
/// A run that ends with skipped nodes, or before any output node ran, is
/// `RunError::Incomplete`.
pub(crate) async fn drive_to_first_output(
    mut controller: RunController,
    args: &Values,
    requester: Option<&InputRequester>,
    output_provider: Option<&OutputProvider>,
) -> Result<Values, RunError> {
    loop {
        match controller.run_until_stop().await? {
            RunStop::Input(request) => {
                let values = match requester {
                    Some(requester) if needs_bubbling(&request, args) => {
                        let node = request.node.clone();
                        let answer = requester
                            .request(InputRequest {
                                bubbled: true,
                                ..request
                            })
                            .await
                            .map_err(|e| RunError::Handler {
                                node,
                                message: e.to_string(),
                            })?;
                        merge(args, &answer)
                    }
                    _ => args.clone(),
                };
                controller.provide_input(values)?;
            }
            RunStop::Output(result) if result.bubbled => {
                if let Some(provider) = output_provider {
                    let node = result.node.clone();
                    provider.provide(result).await.map_err(|e| RunError::Handler {
                        node,
                        message: e.to_string(),
                    })?;
                }
            }
            RunStop::Output(result) => return Ok(result.outputs),
            RunStop::Done(summary) => {
                summary.ensure_complete()?;
                let unreached = controller.unreached_outputs();
                if unreached.is_empty() {
                    return Ok(Values::new());
                }
                return Err(RunError::Incomplete(unreached));
            }
        }
    }
}

/// Requests raised by inner handlers always bubble; input nodes bubble when
/// their schema requires keys the supplied inputs lack.
fn needs_bubbling(request: &InputRequest, args: &Values) -> bool {
    request.bubbled
        || request
            .required_keys()
            .iter()
            .any(|key| !args.contains_key(key))
}
