//! Run and handler error types.
//!
//! `HandlerError` is what a node handler returns; the invoker turns it into
//! `$error` outputs. `RunError` is what a run returns to its caller.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::graph::StructuralError;
use crate::resume::CodecError;

/// Error returned by a node handler.
///
/// Never crosses a run boundary as an `Err`: the invoker converts it into
/// sentinel `$error` outputs which are routed like any other output.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Handler ran and failed (remote call failed, bad response, ...).
    #[error("execution failed: {0}")]
    ExecutionFailed(String),

    /// Inputs did not have the expected shape.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An input request could not be answered (no requester, run dropped).
    #[error("input unavailable: {0}")]
    InputUnavailable(String),

    #[error(transparent)]
    Structural(#[from] StructuralError),

    /// A nested run ended in an error other than a handler failure.
    #[error("subgraph failed: {0}")]
    Subgraph(String),
}

/// A node whose last visit was skipped for missing inputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingInputs {
    pub node: String,
    pub missing: Vec<String>,
}

/// Error ending a run.
#[derive(Debug, Error)]
pub enum RunError {
    /// The graph is malformed or uses an unregistered node type.
    #[error(transparent)]
    Structural(#[from] StructuralError),

    /// A handler failed and no outgoing edge carried the failure on.
    #[error("node {node} failed: {message}")]
    Handler { node: String, message: String },

    /// The run finished with nodes still waiting for inputs.
    #[error("run incomplete: {} node(s) never received required inputs", .0.len())]
    Incomplete(Vec<MissingInputs>),

    #[error("run cancelled")]
    Cancelled,

    #[error("step limit of {0} exceeded")]
    StepLimit(usize),

    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Operation not valid in the controller's current phase.
    #[error("invalid run state: {0}")]
    InvalidState(String),
}
