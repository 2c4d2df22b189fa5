//! flowgraph-cli library: load graph documents, run them to completion or to a
//! saved suspension, validate them and render them as mermaid.
//!
//! ## Usage
//!
//! ```rust,no_run,ignore
//! let graph = flowgraph_cli::load_graph("graph.json".as_ref()).await?;
//! let config = flowgraph_cli::CliConfig::from_env()?;
//! let report = flowgraph_cli::run_graph(graph, &RunRequest::default(), &config, sink).await?;
//! ```

mod config;
mod middleware;
mod run;

pub use config::{CliConfig, Error, RunOptions};
pub use middleware::LoggingMiddleware;
pub use run::{
    check_graph, load_graph, parse_input, parse_inputs, render_mermaid, run_graph, RunOutcome,
    RunReport, RunRequest,
};

#[cfg(test)]
mod tests;
