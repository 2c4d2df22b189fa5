//! Mermaid flowchart rendering for graph documents.

use std::fmt;

use crate::graph::descriptor::{Edge, GraphDescriptor, NodeDescriptor};

/// Flowchart direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Direction {
    #[default]
    TopDown,
    LeftRight,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::TopDown => write!(f, "TD"),
            Direction::LeftRight => write!(f, "LR"),
        }
    }
}

/// Renders `graph` as a Mermaid `graph` block.
///
/// Input and output nodes are drawn as stadiums, nodes that run subgraphs as
/// subroutines. Optional edges are dashed. Edge labels show `out->in`, or `*`
/// for wildcards.
pub fn to_mermaid(graph: &GraphDescriptor, direction: Direction) -> String {
    let mut output = format!("graph {}\n", direction);
    if let Some(title) = &graph.title {
        output.push_str(&format!("    %% {}\n", title));
    }
    for node in &graph.nodes {
        output.push_str(&format!("    {}\n", node_shape(node)));
    }
    for edge in &graph.edges {
        output.push_str(&format!("    {}\n", edge_line(edge)));
    }
    output
}

fn node_shape(node: &NodeDescriptor) -> String {
    let id = sanitize_id(&node.id);
    let title = node
        .metadata
        .as_ref()
        .and_then(|m| m.title.as_deref())
        .unwrap_or(&node.id);
    let label = escape_mermaid(&format!("{} ({})", title, node.node_type));
    match node.node_type.as_str() {
        "input" | "output" => format!("{}([\"{}\"])", id, label),
        "invoke" | "map" | "lambda" => format!("{}[[\"{}\"]]", id, label),
        _ => format!("{}[\"{}\"]", id, label),
    }
}

fn edge_line(edge: &Edge) -> String {
    let label = if edge.is_wildcard() {
        "*".to_string()
    } else if edge.out == edge.input {
        edge.out.clone()
    } else {
        format!("{}->{}", edge.out, edge.input)
    };
    let arrow = if edge.optional { "-.->" } else { "-->" };
    format!(
        "{} {}|\"{}\"| {}",
        sanitize_id(&edge.from),
        arrow,
        escape_mermaid(&label),
        sanitize_id(&edge.to)
    )
}

fn escape_mermaid(s: &str) -> String {
    s.replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Mermaid ids: alphanumerics and underscores only.
fn sanitize_id(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}
