//! Optional overrides for a run, typically parsed from the command line.
//!
//! Applied with [`CliConfig::apply_options`](super::CliConfig::apply_options);
//! only fields that are set override the environment.

use std::path::PathBuf;

/// Command-line overrides: start label, step limit, blob store, verbosity.
#[derive(Clone, Debug, Default)]
pub struct RunOptions {
    pub start_label: Option<String>,
    /// Step limit; `Some(0)` removes the limit.
    pub max_steps: Option<usize>,
    /// Directory of the filesystem blob store.
    pub blob_dir: Option<PathBuf>,
    pub blob_threshold: Option<usize>,
    /// Debug logging plus node enter/exit logs.
    pub verbose: bool,
}
