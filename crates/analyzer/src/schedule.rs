//! Topological emission of a serial schedule from a conflict graph, via
//! Kahn's algorithm.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap};

use seccampdb_core::TxId;

use crate::graph::ConflictGraph;

/// Produce a serial schedule equivalent to the observed interleaving, or
/// `None` if the conflict graph has a cycle (the observed history is not
/// conflict-serializable).
///
/// Ties are broken by ascending transaction id: whenever more than one
/// node is ready to emit, the smallest id emits first. This is exactly
/// what falls out of always popping the minimum of a min-heap of ready
/// nodes, so no separate tie-break step is needed.
pub fn serial_schedule(graph: &ConflictGraph) -> Option<Vec<TxId>> {
    let mut indegree: BTreeMap<TxId, u32> = graph.nodes.iter().map(|&id| (id, 0)).collect();
    for edge in &graph.edges {
        *indegree.get_mut(&edge.to).expect("edge target is not a graph node") += 1;
    }

    let mut ready: BinaryHeap<Reverse<TxId>> = indegree
        .iter()
        .filter(|&(_, &deg)| deg == 0)
        .map(|(&id, _)| Reverse(id))
        .collect();

    let mut order = Vec::with_capacity(graph.nodes.len());
    while let Some(Reverse(id)) = ready.pop() {
        order.push(id);
        for edge in graph.edges.iter().filter(|e| e.from == id) {
            let remaining = indegree
                .get_mut(&edge.to)
                .expect("edge target is not a graph node");
            *remaining -= 1;
            if *remaining == 0 {
                ready.push(Reverse(edge.to));
            }
        }
    }

    if order.len() == graph.nodes.len() {
        Some(order)
    } else {
        None // a cycle left nodes permanently blocked on a positive indegree
    }
}
