//! Per-run configuration: start label, step limit, invocation path base and
//! blob externalization threshold.

use crate::graph::DEFAULT_START_LABEL;
use crate::path::InvocationPath;

/// Default bound on steps per run.
pub const DEFAULT_MAX_STEPS: usize = 10_000;

/// Default size (bytes of JSON) above which saved values go to the blob store.
pub const DEFAULT_BLOB_THRESHOLD: usize = 64 * 1024;

/// Config for a single run.
///
/// **Interaction**: Passed to `RunController::new` / `RunController::resume`;
/// subgraph runs get a default config whose `base_path` is the path of the
/// node that started them.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    /// Which start-tagged nodes seed the run.
    pub start_label: String,
    /// Maximum number of steps (node visits, skips included). `None` is unbounded.
    pub max_steps: Option<usize>,
    /// Path prefix for every diagnostic event of this run.
    pub base_path: InvocationPath,
    /// Values larger than this are externalized when saving. `None` keeps everything inline.
    pub blob_threshold: Option<usize>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            start_label: DEFAULT_START_LABEL.to_string(),
            max_steps: Some(DEFAULT_MAX_STEPS),
            base_path: InvocationPath::new(),
            blob_threshold: Some(DEFAULT_BLOB_THRESHOLD),
        }
    }
}

impl RunConfig {
    pub fn with_start_label(mut self, label: impl Into<String>) -> Self {
        self.start_label = label.into();
        self
    }

    pub fn with_max_steps(mut self, max_steps: Option<usize>) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn with_base_path(mut self, path: InvocationPath) -> Self {
        self.base_path = path;
        self
    }

    pub fn with_blob_threshold(mut self, threshold: Option<usize>) -> Self {
        self.blob_threshold = threshold;
        self
    }
}
