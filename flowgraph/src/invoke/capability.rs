//! Board capabilities: graphs passed around as values.
//!
//! Inline form `{"kind": "board", "board": <graph>}`, or a reference to a named
//! subgraph of the enclosing graph, `{"kind": "board", "path": "#name"}`.
//! Either form may carry `args` bound into the graph when it runs.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::graph::{GraphDescriptor, StructuralError};
use crate::values::{merge, Values};

pub const BOARD_KIND: &str = "board";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardCapability {
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub board: Option<GraphDescriptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Values::is_empty")]
    pub args: Values,
}

impl BoardCapability {
    pub fn inline(graph: GraphDescriptor) -> Self {
        Self {
            kind: BOARD_KIND.to_string(),
            board: Some(graph),
            path: None,
            args: Values::new(),
        }
    }

    pub fn reference(path: impl Into<String>) -> Self {
        Self {
            kind: BOARD_KIND.to_string(),
            board: None,
            path: Some(path.into()),
            args: Values::new(),
        }
    }

    pub fn with_args(mut self, args: Values) -> Self {
        self.args = merge(&self.args, &args);
        self
    }

    /// True when `value` is an object with `kind = "board"`.
    pub fn is_board(value: &Value) -> bool {
        value.get("kind").and_then(Value::as_str) == Some(BOARD_KIND)
    }

    pub fn from_value(value: &Value) -> Result<Self, StructuralError> {
        if !Self::is_board(value) {
            return Err(StructuralError::InvalidCapability(value.to_string()));
        }
        serde_json::from_value(value.clone())
            .map_err(|e| StructuralError::InvalidCapability(e.to_string()))
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Produces the graph to run. A graph without its own subgraphs inherits
    /// the enclosing graph's, so `#name` references keep resolving inside it.
    pub fn resolve(&self, outer: &GraphDescriptor) -> Result<GraphDescriptor, StructuralError> {
        let mut graph = match (&self.board, &self.path) {
            (Some(board), _) => board.clone(),
            (None, Some(path)) => resolve_path(path, outer)?,
            (None, None) => {
                return Err(StructuralError::InvalidCapability(
                    "board capability has neither `board` nor `path`".to_string(),
                ))
            }
        };
        if graph.graphs.is_empty() {
            graph.graphs = outer.graphs.clone();
        }
        graph.args = merge(&graph.args, &self.args);
        Ok(graph)
    }
}

/// Looks up `#name` (or `name`) in `outer.graphs`.
pub fn resolve_path(path: &str, outer: &GraphDescriptor) -> Result<GraphDescriptor, StructuralError> {
    let name = path.strip_prefix('#').unwrap_or(path);
    outer
        .graphs
        .get(name)
        .cloned()
        .ok_or_else(|| StructuralError::UnknownSubgraph(path.to_string()))
}

/// Replaces every `#name` board reference among `inputs` with its inline
/// form, so the capability stays valid wherever it travels next.
pub fn inline_board_references(inputs: &Values, outer: &GraphDescriptor) -> Result<Values, StructuralError> {
    let mut resolved = inputs.clone();
    for value in resolved.values_mut() {
        if !BoardCapability::is_board(value) || value.get("path").is_none() {
            continue;
        }
        let capability = BoardCapability::from_value(value)?;
        let graph = capability.resolve(outer)?;
        *value = BoardCapability::inline(graph).to_value();
    }
    Ok(resolved)
}
