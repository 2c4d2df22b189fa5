//! Graph document types: nodes, edges, graphs.
//!
//! These are the serde shapes of the JSON graph document. They are immutable
//! while a run is in progress; the editor (`graph::edit`) produces new values
//! between runs.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::graph::structural_error::StructuralError;
use crate::values::Values;

/// Port name used when an edge omits `out` or `in`.
pub const DEFAULT_PORT: &str = "value";

/// `out` value meaning "every output of the source".
pub const WILDCARD: &str = "*";

/// Start label used when a run does not ask for one.
pub const DEFAULT_START_LABEL: &str = "default";

/// Sentinel source id for the opportunities that seed a run.
pub const START: &str = "__start__";

/// One node of a graph: id, handler type and static configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDescriptor {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: String,
    /// Static inputs; wired inputs overwrite them at invocation.
    #[serde(default, skip_serializing_if = "Values::is_empty")]
    pub configuration: Values,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<NodeMetadata>,
}

impl NodeDescriptor {
    pub fn new(id: impl Into<String>, node_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            node_type: node_type.into(),
            configuration: Values::new(),
            metadata: None,
        }
    }

    /// Sets the static configuration (builder style).
    pub fn with_configuration(mut self, configuration: Values) -> Self {
        self.configuration = configuration;
        self
    }

    /// Adds a tag to the node's metadata (builder style).
    pub fn with_tag(mut self, tag: NodeTag) -> Self {
        self.metadata.get_or_insert_with(NodeMetadata::default).tags.push(tag);
        self
    }

    /// True when the node is tagged as a start node for `label`.
    pub fn is_start_for(&self, label: &str) -> bool {
        self.metadata
            .as_ref()
            .map(|m| m.tags.iter().any(|t| t.is_start_for(label)))
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<NodeTag>,
}

/// Node tag: a bare string, or a labelled start tag `{ "type": "start", "label": ... }`.
///
/// The bare string `"start"` marks a start node for the default label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodeTag {
    Start(StartTag),
    Named(String),
}

impl NodeTag {
    /// Start tag for `label`.
    pub fn start(label: impl Into<String>) -> Self {
        NodeTag::Start(StartTag {
            kind: "start".to_string(),
            label: label.into(),
        })
    }

    pub fn is_start_for(&self, label: &str) -> bool {
        match self {
            NodeTag::Named(name) => name == "start" && label == DEFAULT_START_LABEL,
            NodeTag::Start(tag) => tag.kind == "start" && tag.label == label,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartTag {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default = "default_start_label")]
    pub label: String,
}

fn default_start_label() -> String {
    DEFAULT_START_LABEL.to_string()
}

/// Directed edge carrying one output port (or all of them) to one input port.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "RawEdge")]
pub struct Edge {
    pub from: String,
    pub to: String,
    pub out: String,
    #[serde(rename = "in")]
    pub input: String,
    /// Optional edges never block the target's readiness.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub optional: bool,
}

/// Edge as written in a document, before port defaults are applied.
#[derive(Deserialize)]
struct RawEdge {
    from: String,
    to: String,
    #[serde(default)]
    out: Option<String>,
    #[serde(rename = "in", default)]
    input: Option<String>,
    #[serde(default)]
    optional: bool,
}

impl From<RawEdge> for Edge {
    fn from(raw: RawEdge) -> Self {
        let out = raw.out.unwrap_or_else(|| DEFAULT_PORT.to_string());
        let input = if out == WILDCARD {
            WILDCARD.to_string()
        } else {
            raw.input.unwrap_or_else(|| DEFAULT_PORT.to_string())
        };
        Self {
            from: raw.from,
            to: raw.to,
            out,
            input,
            optional: raw.optional,
        }
    }
}

impl Edge {
    /// Edge from `from.out` to `to.input`.
    pub fn new(
        from: impl Into<String>,
        to: impl Into<String>,
        out: impl Into<String>,
        input: impl Into<String>,
    ) -> Self {
        let out = out.into();
        let input = if out == WILDCARD {
            WILDCARD.to_string()
        } else {
            input.into()
        };
        Self {
            from: from.into(),
            to: to.into(),
            out,
            input,
            optional: false,
        }
    }

    /// Edge carrying every output of `from` to `to`.
    pub fn wildcard(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self::new(from, to, WILDCARD, WILDCARD)
    }

    /// Marks the edge optional (builder style).
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn is_wildcard(&self) -> bool {
        self.out == WILDCARD
    }

    /// Same endpoints and ports, ignoring the optional flag.
    pub fn same_wire(&self, other: &Edge) -> bool {
        self.from == other.from
            && self.to == other.to
            && self.out == other.out
            && self.input == other.input
    }

    /// Seed opportunity for an entry node.
    pub(crate) fn entry(to: impl Into<String>) -> Self {
        Self::wildcard(START, to)
    }
}

/// A graph document: ordered nodes and edges, named subgraphs, bound args.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphDescriptor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default)]
    pub nodes: Vec<NodeDescriptor>,
    #[serde(default)]
    pub edges: Vec<Edge>,
    /// Named subgraphs, referenced from capabilities as `#name`.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub graphs: BTreeMap<String, GraphDescriptor>,
    /// Values bound to the graph; merged under the inputs of an inner run.
    #[serde(default, skip_serializing_if = "Values::is_empty")]
    pub args: Values,
}

impl GraphDescriptor {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a JSON graph document.
    pub fn from_json(text: &str) -> Result<Self, StructuralError> {
        serde_json::from_str(text).map_err(|e| StructuralError::InvalidDocument(e.to_string()))
    }

    /// Appends a node. Returns `&mut Self` for chaining; ids are checked when indexed.
    pub fn add_node(&mut self, node: NodeDescriptor) -> &mut Self {
        self.nodes.push(node);
        self
    }

    /// Appends an edge. Declaration order matters for wiring (later edges win).
    pub fn add_edge(&mut self, edge: Edge) -> &mut Self {
        self.edges.push(edge);
        self
    }

    /// Registers a named subgraph.
    pub fn add_graph(&mut self, name: impl Into<String>, graph: GraphDescriptor) -> &mut Self {
        self.graphs.insert(name.into(), graph);
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn node(&self, id: &str) -> Option<&NodeDescriptor> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn node_mut(&mut self, id: &str) -> Option<&mut NodeDescriptor> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }
}
