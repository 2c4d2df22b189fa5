//! Structural edits: cycle prevention and an atomic, revisioned graph editor.
//!
//! Nothing here runs during execution. A run assumes its graph is already a
//! valid DAG with respect to data edges; these checks keep it that way while
//! the graph is being changed between runs.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::graph::descriptor::{Edge, GraphDescriptor, NodeDescriptor};
use crate::graph::index::GraphIndex;
use crate::graph::structural_error::StructuralError;
use crate::values::{merge, Values};

/// Label of the first revision in an editor's history.
pub const CLEAN_SLATE: &str = "Clean slate";

/// Error applying an edit.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EditError {
    #[error(transparent)]
    Structural(#[from] StructuralError),

    #[error("node already exists: {0}")]
    NodeExists(String),

    #[error("node not found: {0}")]
    NodeNotFound(String),

    #[error("edge already exists: {from}.{out} -> {to}.{input}")]
    EdgeExists {
        from: String,
        to: String,
        out: String,
        input: String,
    },

    #[error("edge not found: {from}.{out} -> {to}.{input}")]
    EdgeNotFound {
        from: String,
        to: String,
        out: String,
        input: String,
    },
}

impl EditError {
    fn edge_exists(edge: &Edge) -> Self {
        EditError::EdgeExists {
            from: edge.from.clone(),
            to: edge.to.clone(),
            out: edge.out.clone(),
            input: edge.input.clone(),
        }
    }

    fn edge_not_found(edge: &Edge) -> Self {
        EditError::EdgeNotFound {
            from: edge.from.clone(),
            to: edge.to.clone(),
            out: edge.out.clone(),
            input: edge.input.clone(),
        }
    }
}

/// True when adding `candidate` to `graph` would close a cycle.
///
/// A self-loop always does. Otherwise the candidate closes a cycle exactly when
/// its target already reaches its source through existing edges; the candidate
/// itself is left out of the search even if an identical wire is present.
pub fn would_create_cycle(graph: &GraphDescriptor, candidate: &Edge) -> bool {
    if candidate.from == candidate.to {
        return true;
    }
    let mut existing = graph.clone();
    existing.edges.retain(|e| !e.same_wire(candidate));
    GraphIndex::unchecked(&existing).reaches(&candidate.to, &candidate.from)
}

/// Checks that `candidate` can be added to `graph`: both endpoints exist, the
/// wire is not already present, and no cycle results.
pub fn validate_edge(graph: &GraphDescriptor, candidate: &Edge) -> Result<(), EditError> {
    for end in [&candidate.from, &candidate.to] {
        if graph.node(end).is_none() {
            return Err(StructuralError::DanglingEdge {
                from: candidate.from.clone(),
                to: candidate.to.clone(),
                missing: end.clone(),
            }
            .into());
        }
    }
    if graph.edges.iter().any(|e| e.same_wire(candidate)) {
        return Err(EditError::edge_exists(candidate));
    }
    if would_create_cycle(graph, candidate) {
        return Err(StructuralError::Cycle {
            from: candidate.from.clone(),
            to: candidate.to.clone(),
        }
        .into());
    }
    Ok(())
}

/// One structural edit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EditSpec {
    AddNode {
        node: NodeDescriptor,
    },
    /// Removes the node and every edge touching it.
    RemoveNode {
        id: String,
    },
    AddEdge {
        edge: Edge,
    },
    RemoveEdge {
        edge: Edge,
    },
    /// Replaces `from` with `to`, keeping its position in declaration order.
    ChangeEdge {
        from: Edge,
        to: Edge,
    },
    /// Merges `configuration` into the node's configuration, or replaces it
    /// when `reset` is set.
    ChangeConfiguration {
        id: String,
        configuration: Values,
        #[serde(default)]
        reset: bool,
    },
}

/// A labelled snapshot in the editor history.
#[derive(Debug, Clone, PartialEq)]
pub struct Revision {
    pub label: String,
    pub graph: GraphDescriptor,
}

/// Applies batches of edits to a graph atomically.
///
/// A batch either applies completely or leaves the graph untouched. Every
/// applied batch appends a revision; the history starts with the graph the
/// editor was created from.
#[derive(Debug, Clone)]
pub struct GraphEditor {
    graph: GraphDescriptor,
    history: Vec<Revision>,
}

impl GraphEditor {
    pub fn new(graph: GraphDescriptor) -> Self {
        let history = vec![Revision {
            label: CLEAN_SLATE.to_string(),
            graph: graph.clone(),
        }];
        Self { graph, history }
    }

    pub fn graph(&self) -> &GraphDescriptor {
        &self.graph
    }

    pub fn into_graph(self) -> GraphDescriptor {
        self.graph
    }

    pub fn history(&self) -> &[Revision] {
        &self.history
    }

    /// Applies `edits` in order. With `dry_run` the edits are checked against a
    /// scratch copy and nothing is kept.
    pub fn edit(&mut self, edits: &[EditSpec], label: &str, dry_run: bool) -> Result<(), EditError> {
        let mut working = self.graph.clone();
        for edit in edits {
            apply_edit(&mut working, edit)?;
        }
        if dry_run || edits.is_empty() {
            return Ok(());
        }
        tracing::debug!(label, edits = edits.len(), "Applied graph edits");
        self.graph = working;
        self.history.push(Revision {
            label: label.to_string(),
            graph: self.graph.clone(),
        });
        Ok(())
    }

    /// Convenience for a single edit.
    pub fn apply(&mut self, edit: EditSpec, label: &str) -> Result<(), EditError> {
        self.edit(std::slice::from_ref(&edit), label, false)
    }
}

fn apply_edit(graph: &mut GraphDescriptor, edit: &EditSpec) -> Result<(), EditError> {
    match edit {
        EditSpec::AddNode { node } => {
            if graph.node(&node.id).is_some() {
                return Err(EditError::NodeExists(node.id.clone()));
            }
            graph.add_node(node.clone());
        }
        EditSpec::RemoveNode { id } => {
            if graph.node(id).is_none() {
                return Err(EditError::NodeNotFound(id.clone()));
            }
            graph.nodes.retain(|n| &n.id != id);
            graph.edges.retain(|e| &e.from != id && &e.to != id);
        }
        EditSpec::AddEdge { edge } => {
            validate_edge(graph, edge)?;
            graph.add_edge(edge.clone());
        }
        EditSpec::RemoveEdge { edge } => {
            let position = find_edge(graph, edge)?;
            graph.edges.remove(position);
        }
        EditSpec::ChangeEdge { from, to } => {
            let position = find_edge(graph, from)?;
            let removed = graph.edges.remove(position);
            if let Err(e) = validate_edge(graph, to) {
                graph.edges.insert(position, removed);
                return Err(e);
            }
            graph.edges.insert(position, to.clone());
        }
        EditSpec::ChangeConfiguration {
            id,
            configuration,
            reset,
        } => {
            let node = graph
                .node_mut(id)
                .ok_or_else(|| EditError::NodeNotFound(id.clone()))?;
            node.configuration = if *reset {
                configuration.clone()
            } else {
                merge(&node.configuration, configuration)
            };
        }
    }
    Ok(())
}

fn find_edge(graph: &GraphDescriptor, edge: &Edge) -> Result<usize, EditError> {
    graph
        .edges
        .iter()
        .position(|e| e.same_wire(edge))
        .ok_or_else(|| EditError::edge_not_found(edge))
}
