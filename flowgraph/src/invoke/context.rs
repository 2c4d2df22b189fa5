//! Invocation context passed to node handlers.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use crate::diagnostics::DiagnosticsSink;
use crate::error::HandlerError;
use crate::graph::{GraphDescriptor, NodeDescriptor, StructuralError};
use crate::invoke::capability::BoardCapability;
use crate::invoke::HandlerRegistry;
use crate::path::InvocationPath;
use crate::run::{InputRequest, OutputResult};
use crate::values::Values;

/// Message from a running handler to the run driving it.
#[derive(Debug)]
pub enum HandlerRequest {
    Input {
        request: InputRequest,
        reply: oneshot::Sender<Values>,
    },
    Output {
        result: OutputResult,
        reply: oneshot::Sender<()>,
    },
}

/// Lets a handler ask the run for an external value (bubbling). The run
/// suspends until the caller answers.
#[derive(Debug, Clone)]
pub struct InputRequester {
    tx: mpsc::Sender<HandlerRequest>,
}

impl InputRequester {
    pub async fn request(&self, request: InputRequest) -> Result<Values, HandlerError> {
        let (reply, answer) = oneshot::channel();
        self.tx
            .send(HandlerRequest::Input { request, reply })
            .await
            .map_err(|_| HandlerError::InputUnavailable("run is no longer listening".into()))?;
        answer
            .await
            .map_err(|_| HandlerError::InputUnavailable("input request was dropped".into()))
    }
}

/// Lets a handler stream partial outputs to the caller before it returns.
#[derive(Debug, Clone)]
pub struct OutputProvider {
    tx: mpsc::Sender<HandlerRequest>,
}

impl OutputProvider {
    /// Delivers `result`; resolves once the caller has resumed the run.
    pub async fn provide(&self, result: OutputResult) -> Result<(), HandlerError> {
        let (reply, ack) = oneshot::channel();
        self.tx
            .send(HandlerRequest::Output { result, reply })
            .await
            .map_err(|_| HandlerError::ExecutionFailed("run is no longer listening".into()))?;
        ack.await
            .map_err(|_| HandlerError::ExecutionFailed("output was not acknowledged".into()))
    }
}

/// Requester and provider sharing one channel, plus its receiving end.
pub(crate) fn handler_channel() -> (InputRequester, OutputProvider, mpsc::Receiver<HandlerRequest>) {
    let (tx, rx) = mpsc::channel(1);
    (
        InputRequester { tx: tx.clone() },
        OutputProvider { tx },
        rx,
    )
}

/// Everything a handler gets besides its inputs.
///
/// Carries the node being invoked, its invocation path, the graph it belongs
/// to and the run's registry, sink and cancellation token, so handlers that
/// run subgraphs can start nested runs with the same collaborators.
#[derive(Clone)]
pub struct NodeHandlerContext {
    pub descriptor: NodeDescriptor,
    pub path: InvocationPath,
    pub graph: Arc<GraphDescriptor>,
    pub registry: Arc<HandlerRegistry>,
    pub sink: Arc<dyn DiagnosticsSink>,
    pub cancel: CancellationToken,
    pub requester: Option<InputRequester>,
    pub output_provider: Option<OutputProvider>,
}

impl NodeHandlerContext {
    /// Context outside any run: no requester, no output provider.
    pub fn detached(
        descriptor: NodeDescriptor,
        graph: Arc<GraphDescriptor>,
        registry: Arc<HandlerRegistry>,
        sink: Arc<dyn DiagnosticsSink>,
    ) -> Self {
        Self {
            descriptor,
            path: InvocationPath::new(),
            graph,
            registry,
            sink,
            cancel: CancellationToken::new(),
            requester: None,
            output_provider: None,
        }
    }

    /// Resolves a board capability value against this node's graph.
    pub fn resolve_graph(&self, value: &Value) -> Result<GraphDescriptor, StructuralError> {
        BoardCapability::from_value(value)?.resolve(&self.graph)
    }

    /// Asks the run for an external value.
    pub async fn request_input(&self, request: InputRequest) -> Result<Values, HandlerError> {
        match &self.requester {
            Some(requester) => requester.request(request).await,
            None => Err(HandlerError::InputUnavailable(format!(
                "node {} cannot request input outside a run",
                self.descriptor.id
            ))),
        }
    }

    /// Streams partial outputs to the caller; a no-op outside a run.
    pub async fn provide_output(&self, outputs: Values) -> Result<(), HandlerError> {
        let Some(provider) = &self.output_provider else {
            return Ok(());
        };
        provider
            .provide(OutputResult {
                node: self.descriptor.id.clone(),
                outputs,
                path: self.path.clone(),
                bubbled: true,
            })
            .await
    }
}
