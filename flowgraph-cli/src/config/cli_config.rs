//! Run settings for the CLI, filled from env / .env and overridden by flags.

use std::path::PathBuf;

use flowgraph::run::{DEFAULT_BLOB_THRESHOLD, DEFAULT_MAX_STEPS};
use flowgraph::RunConfig;

use super::RunOptions;

/// Error type used by the CLI.
pub type Error = Box<dyn std::error::Error + Send + Sync>;

/// Settings for one CLI run.
#[derive(Clone, Debug, PartialEq)]
pub struct CliConfig {
    /// Start label selecting entry nodes. Default: `"default"`.
    pub start_label: String,
    /// Step limit, `None` for unbounded. Default: 10 000.
    pub max_steps: Option<usize>,
    /// Filesystem blob store directory. Without one, saved tokens keep every
    /// value inline.
    pub blob_dir: Option<PathBuf>,
    /// Size in bytes above which saved values move to the blob store.
    pub blob_threshold: usize,
    /// Debug logging and node enter/exit logs.
    pub verbose: bool,
}

impl Default for CliConfig {
    fn default() -> Self {
        let run = RunConfig::default();
        Self {
            start_label: run.start_label,
            max_steps: Some(DEFAULT_MAX_STEPS),
            blob_dir: None,
            blob_threshold: DEFAULT_BLOB_THRESHOLD,
            verbose: false,
        }
    }
}

impl CliConfig {
    /// Fill config from env vars. Call `dotenv::dotenv().ok()` first to pick up `.env`.
    ///
    /// All optional: `FLOWGRAPH_START_LABEL`, `FLOWGRAPH_MAX_STEPS` (`0` = unbounded),
    /// `FLOWGRAPH_BLOB_DIR`, `FLOWGRAPH_BLOB_THRESHOLD`.
    pub fn from_env() -> Result<Self, Error> {
        let mut config = Self::default();
        if let Ok(label) = std::env::var("FLOWGRAPH_START_LABEL") {
            if !label.trim().is_empty() {
                config.start_label = label.trim().to_string();
            }
        }
        if let Some(max) = env_usize("FLOWGRAPH_MAX_STEPS")? {
            config.max_steps = (max > 0).then_some(max);
        }
        if let Ok(dir) = std::env::var("FLOWGRAPH_BLOB_DIR") {
            if !dir.is_empty() {
                config.blob_dir = Some(PathBuf::from(dir));
            }
        }
        if let Some(threshold) = env_usize("FLOWGRAPH_BLOB_THRESHOLD")? {
            config.blob_threshold = threshold;
        }
        Ok(config)
    }

    /// Apply optional overrides from `RunOptions`; only set fields override.
    pub fn apply_options(&mut self, options: &RunOptions) {
        if let Some(label) = &options.start_label {
            self.start_label = label.clone();
        }
        if let Some(max) = options.max_steps {
            self.max_steps = (max > 0).then_some(max);
        }
        if options.blob_dir.is_some() {
            self.blob_dir = options.blob_dir.clone();
        }
        if let Some(threshold) = options.blob_threshold {
            self.blob_threshold = threshold;
        }
        if options.verbose {
            self.verbose = true;
        }
    }

    /// Builds the engine's [`RunConfig`]. Values are only externalized when a
    /// blob directory is configured, since an in-memory store does not outlive
    /// the process.
    pub fn to_run_config(&self) -> RunConfig {
        RunConfig::default()
            .with_start_label(self.start_label.clone())
            .with_max_steps(self.max_steps)
            .with_blob_threshold(self.blob_dir.as_ref().map(|_| self.blob_threshold))
    }
}

fn env_usize(name: &str) -> Result<Option<usize>, Error> {
    match std::env::var(name) {
        Ok(raw) if raw.trim().is_empty() => Ok(None),
        Ok(raw) => raw.trim().parse::<usize>().map(Some).map_err(|_| {
            Error::from(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("{} must be a non-negative integer, got {:?}", name, raw),
            ))
        }),
        Err(_) => Ok(None),
    }
}
