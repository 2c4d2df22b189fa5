//! Input wiring and readiness.
//!
//! Pure and synchronous: reads adjacency, committed outputs and static
//! configuration, never calls a handler.

use std::collections::VecDeque;

use crate::graph::{Edge, GraphIndex, NodeDescriptor};
use crate::traversal::state::RunState;
use crate::values::{merge, Values};

/// Snapshot of one traversal step. Produced by `Traversal::next`, discarded
/// once the controller has acted on it.
#[derive(Debug)]
pub struct TraversalResult<'a> {
    pub descriptor: &'a NodeDescriptor,
    /// The opportunity that was taken.
    pub edge: Edge,
    /// Configuration overlaid by wired inputs.
    pub inputs: Values,
    pub missing_inputs: Vec<String>,
    pub skip: bool,
    pub opportunities: &'a VecDeque<Edge>,
    pub new_opportunities: &'a [Edge],
    pub state: &'a RunState,
}

/// Inputs computed for one node.
#[derive(Debug, Clone, PartialEq)]
pub struct StepInputs {
    pub inputs: Values,
    pub missing_inputs: Vec<String>,
    pub skip: bool,
}

/// Wires committed outputs along `heads`, in declaration order.
///
/// A wildcard edge merges every non-null output of its source, error port
/// included; a named edge copies one output unless it is null or absent.
/// Later edges overwrite earlier ones.
pub fn wire_inputs(heads: &[Edge], state: &RunState) -> Values {
    let mut wired = Values::new();
    for edge in heads {
        let Some(outputs) = state.outputs(&edge.from) else {
            continue;
        };
        if edge.is_wildcard() {
            for (key, value) in outputs {
                if !value.is_null() {
                    wired.insert(key.clone(), value.clone());
                }
            }
        } else if let Some(value) = outputs.get(&edge.out).filter(|v| !v.is_null()) {
            wired.insert(edge.input.clone(), value.clone());
        }
    }
    wired
}

/// Required inputs still absent: unique `in` names of non-optional named
/// heads, minus wired names, minus configuration keys. A start node for
/// `start_label` requires nothing.
pub fn missing_inputs(
    node: &NodeDescriptor,
    heads: &[Edge],
    wired: &Values,
    start_label: &str,
) -> Vec<String> {
    if node.is_start_for(start_label) {
        return Vec::new();
    }
    let mut missing: Vec<String> = Vec::new();
    for edge in heads {
        if edge.optional || edge.is_wildcard() {
            continue;
        }
        let name = &edge.input;
        if wired.contains_key(name) || node.configuration.contains_key(name) {
            continue;
        }
        if !missing.contains(name) {
            missing.push(name.clone());
        }
    }
    missing
}

/// Computes the inputs and readiness of `node`.
pub fn compute_step(
    index: &GraphIndex,
    state: &RunState,
    node: &NodeDescriptor,
    start_label: &str,
) -> StepInputs {
    let heads = index.heads(&node.id);
    let wired = wire_inputs(heads, state);
    let missing_inputs = missing_inputs(node, heads, &wired, start_label);
    StepInputs {
        inputs: merge(&node.configuration, &wired),
        skip: !missing_inputs.is_empty(),
        missing_inputs,
    }
}
