//! Edge adjacency per node id.
//!
//! Built once per graph in O(edges). `heads` and `tails` keep declaration
//! order, which the wiring rule depends on (later edges win).

use std::collections::{HashMap, HashSet, VecDeque};

use crate::graph::descriptor::{Edge, GraphDescriptor, NodeDescriptor};
use crate::graph::structural_error::StructuralError;

/// Incoming and outgoing edges for every node of one graph.
#[derive(Debug, Clone)]
pub struct GraphIndex {
    nodes: HashMap<String, NodeDescriptor>,
    /// Node ids in declaration order.
    order: Vec<String>,
    heads: HashMap<String, Vec<Edge>>,
    tails: HashMap<String, Vec<Edge>>,
}

impl GraphIndex {
    /// Indexes `graph`, failing on duplicate node ids and dangling edges.
    pub fn new(graph: &GraphDescriptor) -> Result<Self, StructuralError> {
        let mut nodes = HashMap::with_capacity(graph.nodes.len());
        let mut order = Vec::with_capacity(graph.nodes.len());
        for node in &graph.nodes {
            if nodes.insert(node.id.clone(), node.clone()).is_some() {
                return Err(StructuralError::DuplicateNode(node.id.clone()));
            }
            order.push(node.id.clone());
        }
        for edge in &graph.edges {
            for end in [&edge.from, &edge.to] {
                if !nodes.contains_key(end) {
                    return Err(StructuralError::DanglingEdge {
                        from: edge.from.clone(),
                        to: edge.to.clone(),
                        missing: end.clone(),
                    });
                }
            }
        }
        Ok(Self::with_edges(nodes, order, &graph.edges))
    }

    /// Indexes `graph` without validating it. Used by edit-time checks, which
    /// validate candidate edges themselves.
    pub(crate) fn unchecked(graph: &GraphDescriptor) -> Self {
        let mut nodes = HashMap::with_capacity(graph.nodes.len());
        let mut order = Vec::with_capacity(graph.nodes.len());
        for node in &graph.nodes {
            if nodes.insert(node.id.clone(), node.clone()).is_none() {
                order.push(node.id.clone());
            }
        }
        Self::with_edges(nodes, order, &graph.edges)
    }

    fn with_edges(nodes: HashMap<String, NodeDescriptor>, order: Vec<String>, edges: &[Edge]) -> Self {
        let mut heads: HashMap<String, Vec<Edge>> = HashMap::new();
        let mut tails: HashMap<String, Vec<Edge>> = HashMap::new();
        for edge in edges {
            heads.entry(edge.to.clone()).or_default().push(edge.clone());
            tails.entry(edge.from.clone()).or_default().push(edge.clone());
        }
        Self {
            nodes,
            order,
            heads,
            tails,
        }
    }

    /// Incoming edges of `node_id`, in declaration order.
    pub fn heads(&self, node_id: &str) -> &[Edge] {
        self.heads.get(node_id).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Outgoing edges of `node_id`, in declaration order.
    pub fn tails(&self, node_id: &str) -> &[Edge] {
        self.tails.get(node_id).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn node(&self, node_id: &str) -> Option<&NodeDescriptor> {
        self.nodes.get(node_id)
    }

    /// Node descriptors in declaration order.
    pub fn nodes(&self) -> impl Iterator<Item = &NodeDescriptor> {
        self.order.iter().filter_map(|id| self.nodes.get(id))
    }

    /// Nodes with no incoming edges, in declaration order.
    pub fn entries(&self) -> Vec<String> {
        self.order
            .iter()
            .filter(|id| self.heads(id).is_empty())
            .cloned()
            .collect()
    }

    /// Nodes tagged as start nodes for `label`, in declaration order.
    pub fn start_nodes(&self, label: &str) -> Vec<String> {
        self.nodes()
            .filter(|n| n.is_start_for(label))
            .map(|n| n.id.clone())
            .collect()
    }

    /// True when `target` can be reached from `start` following existing edges.
    pub fn reaches(&self, start: &str, target: &str) -> bool {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut queue: VecDeque<&str> = VecDeque::from([start]);
        while let Some(current) = queue.pop_front() {
            if current == target {
                return true;
            }
            if !seen.insert(current) {
                continue;
            }
            for edge in self.tails(current) {
                queue.push_back(edge.to.as_str());
            }
        }
        false
    }
}
