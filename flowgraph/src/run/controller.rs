//! The run state machine.
//!
//! ```text
//! Idle -> AwaitingNode -> Invoking -> Committing -> AwaitingNode ... -> Done
//!                      \-> Suspended (input node) -> Committing
//!           Invoking  <-> Suspended (bubbled request)
//! ```
//!
//! One node commits per step. Every diagnostic is awaited before the machine
//! moves on, and cancellation is checked at the top of each step and raced
//! against the handler in flight.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use crate::diagnostics::{DiagnosticEvent, DiagnosticsSink, EventData};
use crate::error::{MissingInputs, RunError};
use crate::graph::logging::{
    log_graph_complete, log_graph_error, log_graph_start, log_handler_error, log_node_complete,
    log_node_start, log_skip, log_suspend,
};
use crate::graph::{GraphDescriptor, GraphIndex, NodeDescriptor};
use crate::invoke::{
    handler_channel, HandlerRegistry, HandlerRequest, InputRequester, NodeHandlerContext,
    NodeInvoker, NodeMiddleware, OutputProvider, INPUT_TYPE, OUTPUT_TYPE,
};
use crate::path::InvocationPath;
use crate::resume::{BlobStore, CodecError, ResumeToken, Stage};
use crate::run::config::RunConfig;
use crate::run::stop::{InputRequest, OutputResult, RunStop, RunSummary};
use crate::traversal::{compute_step, RunState, Traversal};
use crate::values::{error_message, Values};

type OutputsFuture = Pin<Box<dyn Future<Output = Values> + Send>>;

/// A node chosen for this step, with its wired inputs.
#[derive(Debug, Clone)]
struct Step {
    node: NodeDescriptor,
    inputs: Values,
    path: InvocationPath,
}

struct InFlight {
    step: Step,
    future: OutputsFuture,
    /// Acknowledgement owed to a handler that streamed an output.
    pending_ack: Option<oneshot::Sender<()>>,
}

enum Suspension {
    InputNode(Step),
    Bubbled {
        in_flight: InFlight,
        request: InputRequest,
        reply: oneshot::Sender<Values>,
    },
}

struct Commit {
    step: Step,
    outputs: Values,
    /// Outputs to hand to the caller once committed (output nodes).
    deliver: Option<OutputResult>,
}

enum Phase {
    Idle,
    AwaitingNode,
    Invoking(InFlight),
    Suspended(Suspension),
    Committing(Commit),
    Done(RunSummary),
    Failed,
}

/// Observable phase of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    AwaitingNode,
    Invoking,
    Suspended,
    Committing,
    Done,
    Failed,
}

/// Drives one run of one graph.
///
/// **Interaction**: Built from a graph, a [`HandlerRegistry`] and a
/// [`DiagnosticsSink`]. The caller loops on [`run_until_stop`](Self::run_until_stop),
/// answers [`RunStop::Input`] with [`provide_input`](Self::provide_input), and
/// may [`save`](Self::save) while suspended on an input node.
pub struct RunController {
    graph: Arc<GraphDescriptor>,
    index: GraphIndex,
    registry: Arc<HandlerRegistry>,
    invoker: NodeInvoker,
    sink: Arc<dyn DiagnosticsSink>,
    config: RunConfig,
    cancel: CancellationToken,
    traversal: Traversal,
    phase: Phase,
    started: bool,
    invocation_id: usize,
    steps: usize,
    requester: InputRequester,
    output_provider: OutputProvider,
    requests: mpsc::Receiver<HandlerRequest>,
    /// Output committed by a call that was dropped before returning it.
    undelivered: Option<OutputResult>,
}

impl RunController {
    /// Validates `graph` (adjacency and node types) and seeds its entry nodes.
    pub fn new(
        graph: Arc<GraphDescriptor>,
        registry: Arc<HandlerRegistry>,
        sink: Arc<dyn DiagnosticsSink>,
        config: RunConfig,
    ) -> Result<Self, RunError> {
        let index = GraphIndex::new(&graph)?;
        registry.validate(&graph)?;
        let traversal = Traversal::seeded(&index, &config.start_label);
        let (requester, output_provider, requests) = handler_channel();
        Ok(Self {
            invoker: NodeInvoker::new(registry.clone()),
            graph,
            index,
            registry,
            sink,
            config,
            cancel: CancellationToken::new(),
            traversal,
            phase: Phase::Idle,
            started: false,
            invocation_id: 0,
            steps: 0,
            requester,
            output_provider,
            requests,
            undelivered: None,
        })
    }

    /// Restores a controller from a token produced by [`save`](Self::save).
    ///
    /// The graph, registry and config must match the saved run for the
    /// continuation to be meaningful; the token itself is checked for schema
    /// and version before anything is restored.
    pub async fn resume(
        graph: Arc<GraphDescriptor>,
        registry: Arc<HandlerRegistry>,
        sink: Arc<dyn DiagnosticsSink>,
        config: RunConfig,
        token: &[u8],
        blobs: &dyn BlobStore,
    ) -> Result<Self, RunError> {
        let decoded = ResumeToken::decode(token, blobs).await?;
        let mut controller = Self::new(graph, registry, sink, config)?;
        controller.phase = match decoded.stage {
            Stage::Ready if decoded.started => Phase::AwaitingNode,
            Stage::Ready => Phase::Idle,
            Stage::InputWait { node, inputs, path } => {
                let node = controller.index.node(&node).cloned().ok_or_else(|| {
                    CodecError::Corrupt(format!("token waits on unknown node {}", node))
                })?;
                Phase::Suspended(Suspension::InputNode(Step { node, inputs, path }))
            }
        };
        controller.traversal = decoded.traversal;
        controller.started = decoded.started;
        controller.invocation_id = decoded.invocation_id;
        controller.steps = decoded.steps;
        Ok(controller)
    }

    /// Wraps every handler invocation with `middleware`.
    pub fn with_middleware(mut self, middleware: Arc<dyn NodeMiddleware>) -> Self {
        self.invoker = self.invoker.with_middleware(middleware);
        self
    }

    /// Uses `token` for cancellation instead of a private one.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn state(&self) -> &RunState {
        self.traversal.state()
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn phase(&self) -> RunPhase {
        match &self.phase {
            Phase::Idle => RunPhase::Idle,
            Phase::AwaitingNode => RunPhase::AwaitingNode,
            Phase::Invoking(_) => RunPhase::Invoking,
            Phase::Suspended(_) => RunPhase::Suspended,
            Phase::Committing(_) => RunPhase::Committing,
            Phase::Done(_) => RunPhase::Done,
            Phase::Failed => RunPhase::Failed,
        }
    }

    /// Output nodes that have not run, each with the inputs it still lacks.
    pub fn unreached_outputs(&self) -> Vec<MissingInputs> {
        let state = self.traversal.state();
        self.index
            .nodes()
            .filter(|node| node.node_type == OUTPUT_TYPE && !state.has_committed(&node.id))
            .map(|node| MissingInputs {
                node: node.id.clone(),
                missing: compute_step(&self.index, state, node, &self.config.start_label)
                    .missing_inputs,
            })
            .collect()
    }

    /// Runs until the caller has something to do: supply an input, take an
    /// output, or observe that the run is done.
    ///
    /// Calling it again while suspended yields the same input request.
    ///
    /// Dropping the returned future (e.g. under `tokio::time::timeout`) is safe:
    /// a handler in flight stays in flight and the next call resumes waiting
    /// on it. Diagnostics that were being reported at that moment may be lost.
    pub async fn run_until_stop(&mut self) -> Result<RunStop, RunError> {
        let result = self.drive().await;
        if let Err(e) = &result {
            log_graph_error(e);
        }
        result
    }

    /// Supplies the value the run is suspended on.
    ///
    /// For an input node the values become the node's outputs; for a bubbled
    /// request they are handed to the waiting handler.
    pub fn provide_input(&mut self, values: Values) -> Result<(), RunError> {
        match std::mem::replace(&mut self.phase, Phase::Failed) {
            Phase::Suspended(Suspension::InputNode(step)) => {
                self.phase = Phase::Committing(Commit {
                    step,
                    outputs: values,
                    deliver: None,
                });
                Ok(())
            }
            Phase::Suspended(Suspension::Bubbled {
                in_flight, reply, ..
            }) => {
                // A dropped receiver surfaces in the handler as InputUnavailable.
                let _ = reply.send(values);
                self.phase = Phase::Invoking(in_flight);
                Ok(())
            }
            other => {
                self.phase = other;
                Err(RunError::InvalidState(format!(
                    "cannot provide input while {:?}",
                    self.phase()
                )))
            }
        }
    }

    /// Encodes the run as a resumption token.
    ///
    /// Possible between steps and while suspended on an input node. A handler
    /// in flight (including one waiting on a bubbled request) cannot be
    /// captured and yields `CodecError::NotResumable`.
    pub async fn save(&self, blobs: &dyn BlobStore) -> Result<Vec<u8>, CodecError> {
        if self.undelivered.is_some() {
            return Err(CodecError::NotResumable(
                "an output has not been delivered".into(),
            ));
        }
        let stage = match &self.phase {
            Phase::Idle | Phase::AwaitingNode => Stage::Ready,
            Phase::Suspended(Suspension::InputNode(step)) => Stage::InputWait {
                node: step.node.id.clone(),
                inputs: step.inputs.clone(),
                path: step.path.clone(),
            },
            _ => {
                return Err(CodecError::NotResumable(format!(
                    "run is {:?}",
                    self.phase()
                )))
            }
        };
        ResumeToken::new(
            stage,
            self.started,
            self.invocation_id,
            self.steps,
            self.traversal.clone(),
        )
        .encode(blobs, self.config.blob_threshold)
        .await
    }

    async fn drive(&mut self) -> Result<RunStop, RunError> {
        let result = self.drive_phases().await;
        if result.is_err() {
            self.phase = Phase::Failed;
            self.undelivered = None;
        }
        result
    }

    /// Advances phase by phase. The phase is updated before every await, so a
    /// dropped call leaves the run where it was.
    async fn drive_phases(&mut self) -> Result<RunStop, RunError> {
        if let Some(result) = self.undelivered.take() {
            return Ok(RunStop::Output(result));
        }
        loop {
            match self.phase() {
                RunPhase::Idle => {
                    log_graph_start(self.graph.title.as_deref(), &self.config.base_path);
                    let title = self.graph.title.clone();
                    let path = self.config.base_path.clone();
                    self.report(EventData::GraphStart { title }, path).await;
                    self.started = true;
                    self.phase = Phase::AwaitingNode;
                }
                RunPhase::AwaitingNode => {
                    if self.cancel.is_cancelled() {
                        return Err(RunError::Cancelled);
                    }
                    if let Some(stop) = self.take_step().await? {
                        return Ok(stop);
                    }
                }
                RunPhase::Invoking => {
                    if let Some(stop) = self.await_handler().await? {
                        return Ok(stop);
                    }
                }
                RunPhase::Suspended => {
                    let request = match &self.phase {
                        Phase::Suspended(Suspension::InputNode(step)) => input_request(step),
                        Phase::Suspended(Suspension::Bubbled { request, .. }) => request.clone(),
                        _ => return Err(RunError::InvalidState("suspension lost".into())),
                    };
                    return Ok(RunStop::Input(request));
                }
                RunPhase::Committing => {
                    let Phase::Committing(commit) =
                        std::mem::replace(&mut self.phase, Phase::AwaitingNode)
                    else {
                        return Err(RunError::InvalidState("commit lost".into()));
                    };
                    if let Some(stop) = self.commit(commit).await? {
                        return Ok(stop);
                    }
                }
                RunPhase::Done => {
                    let Phase::Done(summary) = &self.phase else {
                        return Err(RunError::InvalidState("summary lost".into()));
                    };
                    return Ok(RunStop::Done(summary.clone()));
                }
                RunPhase::Failed => {
                    return Err(RunError::InvalidState("run has already failed".into()));
                }
            }
        }
    }

    /// Takes the next opportunity. Returns a stop when the run suspends or ends.
    async fn take_step(&mut self) -> Result<Option<RunStop>, RunError> {
        let next = self
            .traversal
            .next(&self.index, &self.config.start_label)
            .map(|r| (r.descriptor.clone(), r.inputs, r.missing_inputs, r.skip));
        let Some((node, inputs, missing_inputs, skip)) = next else {
            let summary = self.summary();
            self.phase = Phase::Done(summary.clone());
            self.finish().await;
            return Ok(Some(RunStop::Done(summary)));
        };

        self.steps += 1;
        if let Some(max) = self.config.max_steps {
            if self.steps > max {
                return Err(RunError::StepLimit(max));
            }
        }
        self.invocation_id += 1;
        let path = self.config.base_path.child(self.invocation_id);

        if skip {
            log_skip(&node.id, &missing_inputs);
            self.traversal.record_skip(&node.id, missing_inputs.clone());
            self.report(
                EventData::Skip {
                    node: node.id.clone(),
                    inputs,
                    missing_inputs,
                },
                path,
            )
            .await;
            return Ok(None);
        }

        let start = EventData::NodeStart {
            node: node.id.clone(),
            inputs: inputs.clone(),
        };
        log_node_start(&node.id, &node.node_type, &path);
        let step = Step { node, inputs, path };
        let stop = match step.node.node_type.as_str() {
            INPUT_TYPE => {
                log_suspend(&step.node.id, &step.path);
                let request = input_request(&step);
                self.phase = Phase::Suspended(Suspension::InputNode(step.clone()));
                Some(RunStop::Input(request))
            }
            OUTPUT_TYPE => {
                let deliver = OutputResult {
                    node: step.node.id.clone(),
                    outputs: step.inputs.clone(),
                    path: step.path.clone(),
                    bubbled: false,
                };
                self.phase = Phase::Committing(Commit {
                    step: step.clone(),
                    outputs: Values::new(),
                    deliver: Some(deliver),
                });
                None
            }
            _ => {
                let ctx = self.context_for(&step);
                let invoker = self.invoker.clone();
                let inputs = step.inputs.clone();
                let future: OutputsFuture = Box::pin(async move { invoker.invoke(inputs, ctx).await });
                self.phase = Phase::Invoking(InFlight {
                    step: step.clone(),
                    future,
                    pending_ack: None,
                });
                None
            }
        };
        self.report(start, step.path).await;
        Ok(stop)
    }

    /// Waits for the handler in flight, a request from it, or cancellation.
    ///
    /// The handler future stays in `self.phase` while it is polled.
    async fn await_handler(&mut self) -> Result<Option<RunStop>, RunError> {
        enum Event {
            Cancelled,
            Finished(Values),
            Request(Option<HandlerRequest>),
        }

        let Phase::Invoking(in_flight) = &mut self.phase else {
            return Err(RunError::InvalidState("no handler in flight".into()));
        };
        if let Some(ack) = in_flight.pending_ack.take() {
            let _ = ack.send(());
        }
        let event = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Event::Cancelled,
            outputs = &mut in_flight.future => Event::Finished(outputs),
            request = self.requests.recv() => Event::Request(request),
        };
        let Phase::Invoking(mut in_flight) = std::mem::replace(&mut self.phase, Phase::Failed) else {
            return Err(RunError::InvalidState("no handler in flight".into()));
        };
        match event {
            Event::Cancelled => Err(RunError::Cancelled),
            Event::Finished(outputs) => {
                self.phase = Phase::Committing(Commit {
                    step: in_flight.step,
                    outputs,
                    deliver: None,
                });
                Ok(None)
            }
            Event::Request(Some(HandlerRequest::Input { request, reply })) => {
                log_suspend(&request.node, &request.path);
                self.phase = Phase::Suspended(Suspension::Bubbled {
                    in_flight,
                    request: request.clone(),
                    reply,
                });
                Ok(Some(RunStop::Input(request)))
            }
            Event::Request(Some(HandlerRequest::Output { result, reply })) => {
                in_flight.pending_ack = Some(reply);
                self.phase = Phase::Invoking(in_flight);
                Ok(Some(RunStop::Output(result)))
            }
            Event::Request(None) => Err(RunError::InvalidState(
                "handler request channel closed".into(),
            )),
        }
    }

    /// Commits a step's outputs, reports `nodeend` and fired edges.
    ///
    /// Error outputs that fire no edge end the run with `RunError::Handler`.
    async fn commit(&mut self, commit: Commit) -> Result<Option<RunStop>, RunError> {
        let Commit {
            step,
            outputs,
            deliver,
        } = commit;
        let failure = error_message(&outputs);
        let fired = self
            .traversal
            .commit(&self.index, &step.node.id, outputs.clone());
        self.undelivered = deliver;
        log_node_complete(&step.node.id, &step.path, outputs.len());
        let routed = !fired.is_empty();
        self.report(
            EventData::NodeEnd {
                node: step.node.id.clone(),
                inputs: step.inputs.clone(),
                outputs,
            },
            step.path.clone(),
        )
        .await;
        for (edge, value) in fired {
            self.report(EventData::Edge { edge, value }, step.path.clone())
                .await;
        }
        if let Some(message) = failure {
            log_handler_error(&step.node.id, &message);
            if !routed {
                return Err(RunError::Handler {
                    node: step.node.id,
                    message,
                });
            }
        }
        Ok(self.undelivered.take().map(RunStop::Output))
    }

    fn summary(&self) -> RunSummary {
        RunSummary {
            steps: self.steps,
            incomplete: self
                .traversal
                .state()
                .skipped()
                .iter()
                .map(|(node, missing)| MissingInputs {
                    node: node.clone(),
                    missing: missing.clone(),
                })
                .collect(),
        }
    }

    async fn finish(&mut self) {
        let path = self.config.base_path.clone();
        self.report(EventData::GraphEnd {}, path.clone()).await;
        log_graph_complete(&path, self.steps);
    }

    fn context_for(&self, step: &Step) -> NodeHandlerContext {
        NodeHandlerContext {
            descriptor: step.node.clone(),
            path: step.path.clone(),
            graph: self.graph.clone(),
            registry: self.registry.clone(),
            sink: self.sink.clone(),
            cancel: self.cancel.child_token(),
            requester: Some(self.requester.clone()),
            output_provider: Some(self.output_provider.clone()),
        }
    }

    async fn report(&mut self, data: EventData, path: InvocationPath) {
        let sink = self.sink.clone();
        sink.report(DiagnosticEvent::new(data, path)).await;
    }
}

fn input_request(step: &Step) -> InputRequest {
    InputRequest {
        node: step.node.id.clone(),
        inputs: step.inputs.clone(),
        schema: step.node.configuration.get("schema").cloned(),
        path: step.path.clone(),
        bubbled: false,
    }
}
