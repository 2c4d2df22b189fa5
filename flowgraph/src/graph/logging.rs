//! Logging helpers for graph runs.
//!
//! Thin wrappers over `tracing` so the controller and invoker log the same
//! fields (`node_id`, `node_type`, `path`) everywhere.

use crate::path::InvocationPath;

/// Log run start.
pub fn log_graph_start(title: Option<&str>, path: &InvocationPath) {
    tracing::info!(title = title.unwrap_or(""), %path, "Starting graph run");
}

/// Log run completion.
pub fn log_graph_complete(path: &InvocationPath, steps: usize) {
    tracing::info!(%path, steps, "Graph run complete");
}

/// Log node invocation start.
pub fn log_node_start(node_id: &str, node_type: &str, path: &InvocationPath) {
    tracing::debug!(node_id, node_type, %path, "Starting node invocation");
}

/// Log node commit.
pub fn log_node_complete(node_id: &str, path: &InvocationPath, output_keys: usize) {
    tracing::debug!(node_id, %path, output_keys, "Node outputs committed");
}

/// Log a skipped visit (missing inputs).
pub fn log_skip(node_id: &str, missing: &[String]) {
    tracing::debug!(node_id, ?missing, "Skipping node, inputs missing");
}

/// Log a discarded stale opportunity.
pub fn log_stale(from: &str, to: &str) {
    tracing::trace!(from, to, "Discarding stale opportunity");
}

/// Log suspension on an input request.
pub fn log_suspend(node_id: &str, path: &InvocationPath) {
    tracing::debug!(node_id, %path, "Run suspended, waiting for input");
}

/// Log a handler failure converted into error outputs.
pub fn log_handler_error(node_id: &str, message: &str) {
    tracing::warn!(node_id, error = message, "Node handler failed");
}

/// Log a run ending in error.
pub fn log_graph_error(error: &crate::error::RunError) {
    tracing::error!(%error, "Graph run failed");
}
