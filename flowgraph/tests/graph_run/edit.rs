//! Cycle checks and editor batches.

use flowgraph::graph::edit::CLEAN_SLATE;
use flowgraph::graph::would_create_cycle;
use flowgraph::{Edge, EditError, EditSpec, GraphDescriptor, GraphEditor, NodeDescriptor, StructuralError};

fn chain() -> GraphDescriptor {
    let mut g = GraphDescriptor::new();
    g.add_node(NodeDescriptor::new("a", "passthrough"))
        .add_node(NodeDescriptor::new("b", "passthrough"))
        .add_node(NodeDescriptor::new("c", "passthrough"))
        .add_node(NodeDescriptor::new("d", "passthrough"))
        .add_edge(Edge::wildcard("a", "b"))
        .add_edge(Edge::wildcard("c", "d"));
    g
}

/// **Scenario**: B→A closes a cycle over A→B; C→D alone does not block B→C; A→A never passes.
#[test]
fn cycle_detection_cases() {
    let g = chain();
    assert!(would_create_cycle(&g, &Edge::wildcard("b", "a")));
    assert!(!would_create_cycle(&g, &Edge::wildcard("b", "c")));
    assert!(would_create_cycle(&g, &Edge::wildcard("a", "a")));
}

/// **Scenario**: A batch with one bad edit leaves the graph and history untouched.
#[test]
fn failed_batch_rolls_back() {
    let mut editor = GraphEditor::new(chain());
    let err = editor
        .edit(
            &[
                EditSpec::AddNode {
                    node: NodeDescriptor::new("e", "passthrough"),
                },
                EditSpec::AddEdge {
                    edge: Edge::wildcard("b", "a"),
                },
            ],
            "add e",
            false,
        )
        .unwrap_err();
    assert!(matches!(err, EditError::Structural(StructuralError::Cycle { .. })));
    assert!(editor.graph().node("e").is_none());
    assert_eq!(editor.graph(), &chain());
    assert_eq!(editor.history().len(), 1);
    assert_eq!(editor.history()[0].label, CLEAN_SLATE);
}

/// **Scenario**: A dry run validates the batch without keeping it; a real run records a revision.
#[test]
fn dry_run_then_apply() {
    let mut editor = GraphEditor::new(chain());
    let edits = [
        EditSpec::AddNode {
            node: NodeDescriptor::new("e", "passthrough"),
        },
        EditSpec::AddEdge {
            edge: Edge::wildcard("d", "e"),
        },
    ];
    editor.edit(&edits, "extend", true).unwrap();
    assert!(editor.graph().node("e").is_none());
    assert_eq!(editor.history().len(), 1);

    editor.edit(&edits, "extend", false).unwrap();
    assert!(editor.graph().node("e").is_some());
    assert_eq!(editor.history().len(), 2);
    assert_eq!(editor.history()[1].label, "extend");
}

/// **Scenario**: Edits arrive as tagged JSON documents.
#[test]
fn edits_from_json() {
    let edits: Vec<EditSpec> = serde_json::from_str(
        r#"[
            {"type": "removenode", "id": "b"},
            {"type": "changeconfiguration", "id": "a", "configuration": {"k": 1}}
        ]"#,
    )
    .unwrap();
    let mut editor = GraphEditor::new(chain());
    editor.edit(&edits, "json", false).unwrap();
    assert!(editor.graph().node("b").is_none());
    assert!(editor.graph().edges.iter().all(|e| e.from != "b" && e.to != "b"));
    assert_eq!(editor.graph().node("a").unwrap().configuration["k"], 1);
}
