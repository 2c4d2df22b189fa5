//! Run entry points: load a graph document, run it (optionally resuming from or
//! saving to a token file), validate it, render it.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use flowgraph::graph::mermaid::{to_mermaid, Direction};
use flowgraph::{
    BlobStore, DiagnosticsSink, FsBlobStore, GraphDescriptor, GraphIndex, HandlerRegistry,
    InMemoryBlobStore, InputRequest, OutputResult, RunController, RunStop, RunSummary, Values,
};
use serde_json::Value;

use crate::config::{CliConfig, Error};
use crate::middleware::LoggingMiddleware;

/// What to run with: inputs, and token files to resume from / save to.
#[derive(Clone, Debug, Default)]
pub struct RunRequest {
    /// Answer to every input request.
    pub inputs: Values,
    /// Where to save the run when an input node needs keys `inputs` lacks.
    pub save_token: Option<PathBuf>,
    /// Token file to continue from instead of starting fresh.
    pub resume: Option<PathBuf>,
}

/// How a CLI run ended.
#[derive(Clone, Debug, PartialEq)]
pub enum RunOutcome {
    Done(RunSummary),
    /// Suspended on `request` and written to `token`.
    Saved { token: PathBuf, request: InputRequest },
}

/// Outputs delivered during the run, and how it ended.
#[derive(Clone, Debug, PartialEq)]
pub struct RunReport {
    pub outputs: Vec<OutputResult>,
    pub outcome: RunOutcome,
}

/// Reads and parses a graph document.
pub async fn load_graph(path: &Path) -> Result<GraphDescriptor, Error> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| format!("cannot read {}: {}", path.display(), e))?;
    Ok(GraphDescriptor::from_json(&text)?)
}

/// Registry with the built-in kit.
fn registry() -> Arc<HandlerRegistry> {
    Arc::new(HandlerRegistry::new().with_core_kit())
}

/// Checks adjacency and node types without running anything.
pub fn check_graph(graph: &GraphDescriptor) -> Result<(), Error> {
    GraphIndex::new(graph)?;
    registry().validate(graph)?;
    Ok(())
}

pub fn render_mermaid(graph: &GraphDescriptor, left_right: bool) -> String {
    let direction = if left_right {
        Direction::LeftRight
    } else {
        Direction::TopDown
    };
    to_mermaid(graph, direction)
}

/// Parses `key=value`. The value is JSON when it parses as JSON, otherwise a string.
pub fn parse_input(raw: &str) -> Result<(String, Value), Error> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("input {:?} is not of the form key=value", raw))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("input {:?} has an empty key", raw).into());
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

/// Merges `--inputs-json` (an object) with `--input key=value` pairs; pairs win.
pub fn parse_inputs(pairs: &[String], json: Option<&str>) -> Result<Values, Error> {
    let mut inputs = match json {
        Some(text) => match serde_json::from_str::<Value>(text)? {
            Value::Object(map) => map,
            other => return Err(format!("--inputs-json must be an object, got {}", other).into()),
        },
        None => Values::new(),
    };
    for pair in pairs {
        let (key, value) = parse_input(pair)?;
        inputs.insert(key, value);
    }
    Ok(inputs)
}

/// Runs `graph` until it finishes or needs an input the request cannot supply.
///
/// Every input request is answered with `request.inputs`. When an input node's
/// schema requires keys the inputs lack, the run is saved to
/// `request.save_token` and the outcome is [`RunOutcome::Saved`]; without a
/// token file that is an error.
pub async fn run_graph(
    graph: GraphDescriptor,
    request: &RunRequest,
    config: &CliConfig,
    sink: Arc<dyn DiagnosticsSink>,
) -> Result<RunReport, Error> {
    let blobs: Box<dyn BlobStore> = match &config.blob_dir {
        Some(dir) => Box::new(FsBlobStore::new(dir.clone())),
        None => Box::new(InMemoryBlobStore::new()),
    };
    let graph = Arc::new(graph);
    let run_config = config.to_run_config();
    let mut run = match &request.resume {
        Some(path) => {
            let token = tokio::fs::read(path)
                .await
                .map_err(|e| format!("cannot read token {}: {}", path.display(), e))?;
            tracing::info!(token = %path.display(), "resuming run");
            RunController::resume(graph, registry(), sink, run_config, &token, blobs.as_ref()).await?
        }
        None => RunController::new(graph, registry(), sink, run_config)?,
    };
    if config.verbose {
        run = run.with_middleware(Arc::new(LoggingMiddleware));
    }

    let mut outputs = Vec::new();
    loop {
        match run.run_until_stop().await? {
            RunStop::Input(input) => {
                let missing: Vec<String> = input
                    .required_keys()
                    .into_iter()
                    .filter(|key| !request.inputs.contains_key(key))
                    .collect();
                if missing.is_empty() {
                    run.provide_input(request.inputs.clone())?;
                    continue;
                }
                let Some(path) = &request.save_token else {
                    return Err(format!(
                        "node {} needs inputs {:?}; pass them with --input or use --save-token",
                        input.node, missing
                    )
                    .into());
                };
                let token = run.save(blobs.as_ref()).await?;
                tokio::fs::write(path, token)
                    .await
                    .map_err(|e| format!("cannot write token {}: {}", path.display(), e))?;
                tracing::info!(token = %path.display(), node = %input.node, "run saved");
                return Ok(RunReport {
                    outputs,
                    outcome: RunOutcome::Saved {
                        token: path.clone(),
                        request: input,
                    },
                });
            }
            RunStop::Output(result) => outputs.push(result),
            RunStop::Done(summary) => {
                return Ok(RunReport {
                    outputs,
                    outcome: RunOutcome::Done(summary),
                })
            }
        }
    }
}
