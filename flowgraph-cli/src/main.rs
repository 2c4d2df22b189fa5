//! flowgraph binary: run, check or render graph documents.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use flowgraph::{ChannelSink, DiagnosticsSink, TracingSink};
use flowgraph_cli::{
    check_graph, load_graph, parse_inputs, render_mermaid, run_graph, CliConfig, Error, RunOptions,
    RunOutcome, RunRequest,
};
use tokio_stream::StreamExt;

#[derive(Parser, Debug)]
#[command(name = "flowgraph")]
#[command(about = "Run, validate and render dataflow graphs")]
struct Cli {
    /// Debug logging and node enter/exit logs (stderr)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a graph; outputs are printed as JSON lines
    Run {
        /// Graph document (JSON)
        graph: PathBuf,
        /// Input value, KEY=VALUE (VALUE parsed as JSON when possible); repeatable
        #[arg(short, long = "input", value_name = "KEY=VALUE")]
        inputs: Vec<String>,
        /// Inputs as a JSON object
        #[arg(long, value_name = "JSON")]
        inputs_json: Option<String>,
        /// Save the run here when an input node needs more inputs
        #[arg(long, value_name = "FILE")]
        save_token: Option<PathBuf>,
        /// Continue from a saved token
        #[arg(long, value_name = "FILE")]
        resume: Option<PathBuf>,
        #[arg(long)]
        start_label: Option<String>,
        /// Step limit (0 = unbounded)
        #[arg(long)]
        max_steps: Option<usize>,
        /// Directory for externalized values of saved runs
        #[arg(long, value_name = "DIR")]
        blob_dir: Option<PathBuf>,
        /// Bytes above which saved values go to the blob directory
        #[arg(long)]
        blob_threshold: Option<usize>,
        /// Print diagnostic events as JSON lines
        #[arg(long)]
        events: bool,
    },
    /// Print a mermaid flowchart of the graph
    Mermaid {
        graph: PathBuf,
        /// Left-to-right instead of top-down
        #[arg(long)]
        lr: bool,
    },
    /// Validate the graph without running it
    Check { graph: PathBuf },
}

/// Logs go to stderr; `RUST_LOG` wins, else `info` (or `debug` with --verbose).
fn init_tracing(verbose: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(if verbose { "debug" } else { "info" })
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn execute(cli: Cli) -> Result<(), Error> {
    match cli.command {
        Command::Check { graph } => {
            let descriptor = load_graph(&graph).await?;
            check_graph(&descriptor)?;
            println!(
                "{}: ok ({} nodes, {} edges, {} subgraphs)",
                graph.display(),
                descriptor.nodes.len(),
                descriptor.edges.len(),
                descriptor.graphs.len()
            );
        }
        Command::Mermaid { graph, lr } => {
            let descriptor = load_graph(&graph).await?;
            print!("{}", render_mermaid(&descriptor, lr));
        }
        Command::Run {
            graph,
            inputs,
            inputs_json,
            save_token,
            resume,
            start_label,
            max_steps,
            blob_dir,
            blob_threshold,
            events,
        } => {
            let mut config = CliConfig::from_env()?;
            config.apply_options(&RunOptions {
                start_label,
                max_steps,
                blob_dir,
                blob_threshold,
                verbose: cli.verbose,
            });
            let request = RunRequest {
                inputs: parse_inputs(&inputs, inputs_json.as_deref())?,
                save_token,
                resume,
            };
            let descriptor = load_graph(&graph).await?;

            let (sink, printer): (Arc<dyn DiagnosticsSink>, _) = if events {
                let (sink, mut stream) = ChannelSink::new(64);
                let printer = tokio::spawn(async move {
                    while let Some(event) = stream.next().await {
                        if let Ok(line) = serde_json::to_string(&event) {
                            println!("{}", line);
                        }
                    }
                });
                (Arc::new(sink), Some(printer))
            } else {
                (Arc::new(TracingSink), None)
            };

            let report = run_graph(descriptor, &request, &config, sink).await;
            if let Some(printer) = printer {
                // The run and its sink are gone; drain what is left.
                let _ = printer.await;
            }
            let report = report?;

            for output in &report.outputs {
                println!("{}", serde_json::to_string(output)?);
            }
            match report.outcome {
                RunOutcome::Done(summary) => {
                    tracing::info!(steps = summary.steps, "run finished");
                    summary.ensure_complete()?;
                }
                RunOutcome::Saved { token, request } => {
                    eprintln!(
                        "run saved to {}; node {} needs {:?}. Continue with --resume {}",
                        token.display(),
                        request.node,
                        request.required_keys(),
                        token.display()
                    );
                }
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match execute(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
