//! Graphviz rendering of a [`ConflictGraph`] and its serial schedule.

use std::fmt::Write as _;
use std::path::Path;

use seccampdb_core::{Result, TxId};

use crate::graph::ConflictGraph;

/// Render `graph` and `schedule` as Graphviz `digraph` text: a commented
/// serial-schedule header followed by one `Tx<id>;` node declaration per
/// transaction and one labeled edge per conflict.
pub fn render(graph: &ConflictGraph, schedule: Option<&[TxId]>) -> String {
    let mut out = String::new();
    out.push_str("/*\nserial schedule:\n");
    match schedule {
        Some(order) => {
            for id in order {
                let _ = writeln!(out, "{id}");
            }
        }
        None => {
            out.push_str("(cycle detected; no conflict-serializable schedule exists)\n");
        }
    }
    out.push_str(" */\ndigraph g {\n");

    for id in &graph.nodes {
        let _ = writeln!(out, "    Tx{id};");
    }
    for edge in &graph.edges {
        let _ = writeln!(
            out,
            "    Tx{} -> Tx{} [label = \"{}\"];",
            edge.from, edge.to, edge.label
        );
    }
    out.push_str("}\n");
    out
}

/// Render and write to `path`, truncating any existing file. The
/// default path for this output is `.seccampDB_graph`.
pub fn write_to_path(
    path: impl AsRef<Path>,
    graph: &ConflictGraph,
    schedule: Option<&[TxId]>,
) -> Result<()> {
    std::fs::write(path, render(graph, schedule))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Edge, EdgeLabel};
    use std::collections::BTreeSet;

    #[test]
    fn renders_acyclic_graph_with_schedule() {
        let graph = ConflictGraph {
            nodes: [1, 2].into_iter().collect::<BTreeSet<_>>(),
            edges: vec![Edge {
                from: 1,
                to: 2,
                label: EdgeLabel::WriteRead,
            }],
        };
        let text = render(&graph, Some(&[1, 2]));
        assert!(text.starts_with("/*\nserial schedule:\n1\n2\n */\ndigraph g {\n"));
        assert!(text.contains("Tx1;"));
        assert!(text.contains("Tx2;"));
        assert!(text.contains("Tx1 -> Tx2 [label = \"w-r\"];"));
        assert!(text.trim_end().ends_with('}'));
    }

    #[test]
    fn cycle_renders_empty_schedule_comment() {
        let graph = ConflictGraph {
            nodes: [1, 2].into_iter().collect::<BTreeSet<_>>(),
            edges: vec![
                Edge {
                    from: 1,
                    to: 2,
                    label: EdgeLabel::WriteWrite,
                },
                Edge {
                    from: 2,
                    to: 1,
                    label: EdgeLabel::WriteWrite,
                },
            ],
        };
        let text = render(&graph, None);
        assert!(text.contains("cycle detected"));
        assert!(text.contains("Tx1 -> Tx2"));
        assert!(text.contains("Tx2 -> Tx1"));
    }

    #[test]
    fn write_to_path_round_trips_through_filesystem() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".seccampDB_graph");
        let graph = ConflictGraph {
            nodes: [1].into_iter().collect::<BTreeSet<_>>(),
            edges: vec![],
        };
        write_to_path(&path, &graph, Some(&[1])).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("Tx1;"));
    }
}
