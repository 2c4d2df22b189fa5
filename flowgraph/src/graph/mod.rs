//! Graph documents: descriptors, adjacency index, edits and rendering.
//!
//! A `GraphDescriptor` is loaded from JSON (or built with `add_node`/`add_edge`),
//! indexed once per run by `GraphIndex`, and changed between runs through
//! `GraphEditor`.

mod descriptor;
pub mod edit;
mod index;
pub mod logging;
pub mod mermaid;
mod structural_error;

pub use descriptor::{
    Edge, GraphDescriptor, NodeDescriptor, NodeMetadata, NodeTag, StartTag, DEFAULT_PORT,
    DEFAULT_START_LABEL, START, WILDCARD,
};
pub use edit::{validate_edge, would_create_cycle, EditError, EditSpec, GraphEditor, Revision};
pub use index::GraphIndex;
pub use structural_error::StructuralError;
