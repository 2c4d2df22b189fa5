//! Opportunity queue over a `RunState`.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::graph::logging::log_stale;
use crate::graph::{Edge, GraphIndex};
use crate::traversal::state::RunState;
use crate::traversal::step::{compute_step, TraversalResult};
use crate::values::{without_nulls, Values};

/// Pending work of one run plus its committed outputs.
///
/// `new_opportunities` holds edges fired by the latest commit; they join the
/// back of `opportunities` when the next step is taken, so ties are broken by
/// when an edge became eligible.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Traversal {
    state: RunState,
    opportunities: VecDeque<Edge>,
    new_opportunities: Vec<Edge>,
}

impl Traversal {
    /// Seeds a traversal for `start_label`: start-tagged nodes if the graph has
    /// any for that label, otherwise every node without incoming edges.
    pub fn seeded(index: &GraphIndex, start_label: &str) -> Self {
        let mut entries = index.start_nodes(start_label);
        if entries.is_empty() {
            entries = index.entries();
        }
        Self {
            state: RunState::new(),
            opportunities: entries.into_iter().map(Edge::entry).collect(),
            new_opportunities: Vec::new(),
        }
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    pub(crate) fn state_mut(&mut self) -> &mut RunState {
        &mut self.state
    }

    /// True when no opportunity is queued or buffered.
    pub fn is_done(&self) -> bool {
        self.opportunities.is_empty() && self.new_opportunities.is_empty()
    }

    /// Takes the next live opportunity and computes its target's inputs.
    ///
    /// Stale opportunities are discarded. Returns `None` when no work is left.
    pub fn next<'a>(&'a mut self, index: &'a GraphIndex, start_label: &str) -> Option<TraversalResult<'a>> {
        let fired = std::mem::take(&mut self.new_opportunities);
        self.opportunities.extend(fired);
        let (edge, descriptor) = loop {
            let edge = self.opportunities.pop_front()?;
            if self.state.is_stale(&edge) {
                log_stale(&edge.from, &edge.to);
                continue;
            }
            match index.node(&edge.to) {
                Some(descriptor) => break (edge, descriptor),
                None => continue,
            }
        };
        let this: &'a Traversal = self;
        let step = compute_step(index, &this.state, descriptor, start_label);
        Some(TraversalResult {
            descriptor,
            edge,
            inputs: step.inputs,
            missing_inputs: step.missing_inputs,
            skip: step.skip,
            opportunities: &this.opportunities,
            new_opportunities: &this.new_opportunities,
            state: &this.state,
        })
    }

    pub fn record_skip(&mut self, node_id: &str, missing: Vec<String>) {
        self.state.record_skip(node_id, missing);
    }

    /// Commits `outputs` for `node_id` and buffers the outgoing edges they fire.
    ///
    /// A wildcard edge always fires and a named edge fires when its port has a
    /// non-null value. Error outputs follow the same rule, so a failure reaches
    /// wildcard edges and `$error` edges alike.
    /// Returns each fired edge with the values it carries, keyed by input name.
    pub fn commit(&mut self, index: &GraphIndex, node_id: &str, outputs: Values) -> Vec<(Edge, Values)> {
        let mut fired = Vec::new();
        for edge in index.tails(node_id) {
            let carried = if edge.is_wildcard() {
                Some(without_nulls(&outputs))
            } else {
                carried_value(edge, &outputs)
            };
            if let Some(value) = carried {
                fired.push((edge.clone(), value));
            }
        }
        self.state.commit(node_id, outputs);
        self.new_opportunities
            .extend(fired.iter().map(|(edge, _)| edge.clone()));
        fired
    }
}

fn carried_value(edge: &Edge, outputs: &Values) -> Option<Values> {
    let value = outputs.get(&edge.out).filter(|v| !v.is_null())?;
    let mut carried = Values::new();
    carried.insert(edge.input.clone(), value.clone());
    Some(carried)
}
