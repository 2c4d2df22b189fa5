//! # flowgraph
//!
//! A dataflow graph engine. A graph is a set of typed nodes wired by edges
//! that carry named output ports to named input ports. A run repeatedly picks
//! the next node whose inputs are wired, invokes the handler registered for its
//! type, commits the outputs and lets them flow along the node's outgoing edges.
//!
//! ## Design Principles
//!
//! - **One commit per step**: the traversal is a deterministic FIFO over edge
//!   opportunities; a node's outputs are visible downstream only after commit.
//! - **Explicit suspension**: input nodes and handlers that ask for values put
//!   the run in a suspended state; the caller resumes it with
//!   [`RunController::provide_input`].
//! - **Resumable**: between steps or at an input suspension the run can be
//!   saved as a versioned token and restored later ([`resume`]).
//! - **Failures are values**: a handler error becomes a `$error` output that
//!   flows along wildcard and `$error` edges; an unrouted failure ends the run.
//!
//! ## Main Modules
//!
//! - [`graph`]: `GraphDescriptor`, `GraphIndex`, structural validation, the
//!   graph editor and mermaid rendering.
//! - [`traversal`]: `RunState` and the step engine (wiring, readiness, commit).
//! - [`invoke`]: `NodeHandler`, `HandlerRegistry`, `NodeInvoker`, middleware
//!   and board capabilities.
//! - [`run`]: `RunController`, `RunConfig`, `RunStop`, `SubgraphInvoker`.
//! - [`resume`]: resumption tokens and blob stores.
//! - [`diagnostics`]: event stream and sinks.
//! - [`kit`]: built-in `invoke`, `map`, `lambda` and `passthrough` nodes.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use flowgraph::{
//!     Edge, GraphDescriptor, HandlerRegistry, NodeDescriptor, NullSink, RunConfig,
//!     RunController, RunStop, Values,
//! };
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), flowgraph::RunError> {
//! let mut graph = GraphDescriptor::new();
//! graph
//!     .add_node(NodeDescriptor::new("ask", "input"))
//!     .add_node(NodeDescriptor::new("echo", "passthrough"))
//!     .add_node(NodeDescriptor::new("show", "output"))
//!     .add_edge(Edge::wildcard("ask", "echo"))
//!     .add_edge(Edge::wildcard("echo", "show"));
//!
//! let registry = Arc::new(HandlerRegistry::new().with_core_kit());
//! let mut run = RunController::new(Arc::new(graph), registry, Arc::new(NullSink), RunConfig::default())?;
//! loop {
//!     match run.run_until_stop().await? {
//!         RunStop::Input(_) => {
//!             let mut values = Values::new();
//!             values.insert("text".into(), "hello".into());
//!             run.provide_input(values)?;
//!         }
//!         RunStop::Output(result) => println!("{:?}", result.outputs),
//!         RunStop::Done(summary) => {
//!             summary.ensure_complete()?;
//!             break;
//!         }
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod diagnostics;
pub mod error;
pub mod graph;
pub mod invoke;
pub mod kit;
pub mod path;
pub mod resume;
pub mod run;
pub mod traversal;
pub mod values;

pub use diagnostics::{
    ChannelSink, DiagnosticEvent, DiagnosticsSink, EventData, EventKind, FilteredSink, MemorySink,
    NullSink, TracingSink,
};
pub use error::{HandlerError, MissingInputs, RunError};
pub use graph::{
    Edge, EditError, EditSpec, GraphDescriptor, GraphEditor, GraphIndex, NodeDescriptor,
    NodeMetadata, NodeTag, StartTag, StructuralError,
};
pub use invoke::{
    handler_fn, BoardCapability, HandlerRegistry, NodeHandler, NodeHandlerContext, NodeInvoker,
    NodeMiddleware,
};
pub use path::InvocationPath;
pub use resume::{BlobStore, CodecError, FsBlobStore, InMemoryBlobStore, ResumeToken};
pub use run::{
    run_once, InputRequest, OutputResult, RunConfig, RunController, RunPhase, RunStop,
    RunSummary, SubgraphInvoker,
};
pub use traversal::{RunState, Traversal};
pub use values::{Values, ERROR_PORT};
