//! Structural errors.
//!
//! Raised when a graph is indexed, validated against the handler registry, or
//! edited. They are never deferred to traversal time.

use thiserror::Error;

/// Error in the shape of a graph (as opposed to its data).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StructuralError {
    /// Two nodes share one id.
    #[error("duplicate node id: {0}")]
    DuplicateNode(String),

    /// An edge references a node id that is not defined in the graph.
    #[error("edge {from} -> {to} references unknown node: {missing}")]
    DanglingEdge {
        from: String,
        to: String,
        missing: String,
    },

    /// No handler is registered for the node's type.
    #[error("no handler for node type \"{node_type}\" (node {node_id})")]
    UnknownNodeType { node_id: String, node_type: String },

    /// Adding the edge would close a cycle.
    #[error("edge {from} -> {to} would create a cycle")]
    Cycle { from: String, to: String },

    /// A `#name` reference does not name a subgraph.
    #[error("unknown subgraph: {0}")]
    UnknownSubgraph(String),

    /// A value was expected to be a board capability but is not one.
    #[error("invalid board capability: {0}")]
    InvalidCapability(String),

    /// The graph document could not be parsed.
    #[error("invalid graph document: {0}")]
    InvalidDocument(String),
}
