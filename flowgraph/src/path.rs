//! Invocation paths: where a step sits inside nested subgraph runs.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Sequence of invocation indices, outermost first.
///
/// A top-level run reports `[n]` for its n-th step; a subgraph started by that
/// step reports `[n, m]` for its own m-th step, and so on. Observers use the
/// path to rebuild nesting from a flat diagnostic stream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvocationPath(Vec<usize>);

impl InvocationPath {
    /// Empty path (the root of a top-level run).
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Returns a new path with `index` appended.
    pub fn child(&self, index: usize) -> Self {
        let mut inner = self.0.clone();
        inner.push(index);
        Self(inner)
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True when `self` is `other` or nested below it.
    pub fn starts_with(&self, other: &InvocationPath) -> bool {
        self.0.starts_with(&other.0)
    }
}

impl From<Vec<usize>> for InvocationPath {
    fn from(value: Vec<usize>) -> Self {
        Self(value)
    }
}

impl fmt::Display for InvocationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|i| i.to_string()).collect();
        write!(f, "[{}]", parts.join("."))
    }
}
