//! Per-run output store.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::graph::Edge;
use crate::values::Values;

/// Latest committed outputs of every node in one run, keyed by node id.
///
/// Owned by exactly one run and changed only by [`RunState::commit`], i.e.
/// after a node's invocation has completed. Ordered maps keep the serialized
/// form deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunState {
    outputs: BTreeMap<String, Values>,
    /// Commit sequence number of each node's latest commit (1-based).
    committed_at: BTreeMap<String, usize>,
    commits: usize,
    /// Nodes whose latest visit was a skip, with the inputs they lacked.
    skipped: BTreeMap<String, Vec<String>>,
}

impl RunState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last committed outputs of `node_id`.
    pub fn outputs(&self, node_id: &str) -> Option<&Values> {
        self.outputs.get(node_id)
    }

    pub fn has_committed(&self, node_id: &str) -> bool {
        self.committed_at.contains_key(node_id)
    }

    /// Number of commits so far.
    pub fn commits(&self) -> usize {
        self.commits
    }

    /// Records `outputs` as the latest outputs of `node_id`.
    pub fn commit(&mut self, node_id: &str, outputs: Values) {
        self.commits += 1;
        self.committed_at.insert(node_id.to_string(), self.commits);
        self.outputs.insert(node_id.to_string(), outputs);
        self.skipped.remove(node_id);
    }

    pub fn record_skip(&mut self, node_id: &str, missing: Vec<String>) {
        self.skipped.insert(node_id.to_string(), missing);
    }

    /// Nodes whose latest visit was a skip.
    pub fn skipped(&self) -> &BTreeMap<String, Vec<String>> {
        &self.skipped
    }

    /// An opportunity is stale when its target committed after its source did:
    /// the target has already consumed what this edge carries.
    pub fn is_stale(&self, edge: &Edge) -> bool {
        let target = self.committed_at.get(&edge.to).copied().unwrap_or(0);
        let source = self.committed_at.get(&edge.from).copied().unwrap_or(0);
        target > source
    }

    /// Mutable access to stored outputs, for blob externalization/inflation.
    pub(crate) fn outputs_mut(&mut self) -> impl Iterator<Item = (&String, &mut Values)> {
        self.outputs.iter_mut()
    }

    pub(crate) fn output_mut(&mut self, node_id: &str) -> Option<&mut Values> {
        self.outputs.get_mut(node_id)
    }
}
