//! Conflict-graph construction: replay the observed history per-key,
//! mirroring the lock state at that key, and emit an edge at every
//! conflicting access.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use seccampdb_core::{HistoryEntry, HistoryOp, Key, TxId};

/// The kind of conflict an edge represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeLabel {
    /// A transaction read a value a prior transaction wrote.
    WriteRead,
    /// A transaction wrote over a value prior transactions read.
    ReadWrite,
    /// A transaction wrote over a value a prior transaction wrote.
    WriteWrite,
}

impl fmt::Display for EdgeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EdgeLabel::WriteRead => "w-r",
            EdgeLabel::ReadWrite => "r-w",
            EdgeLabel::WriteWrite => "w-w",
        };
        f.write_str(label)
    }
}

/// One conflict edge: `from` happened-before `to` in any equivalent
/// serial schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    /// The transaction the edge originates from.
    pub from: TxId,
    /// The transaction the edge points to.
    pub to: TxId,
    /// Why this edge exists.
    pub label: EdgeLabel,
}

/// The conflict graph: every transaction id seen in the history, plus
/// the conflict edges between them.
#[derive(Debug, Clone, Default)]
pub struct ConflictGraph {
    /// Every transaction id observed, in ascending order.
    pub nodes: BTreeSet<TxId>,
    /// Every conflict edge, in the order it was observed.
    pub edges: Vec<Edge>,
}

/// The holder state tracked per key while replaying the history, mirroring
/// the lock state that key would have had in the live store at that point.
#[derive(Debug, Clone, Default)]
struct KeyState {
    holders: Vec<TxId>,
    mode: Option<Mode>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Read,
    Write,
}

/// Replay `history` and build the conflict graph it implies.
pub fn build(history: &[HistoryEntry]) -> ConflictGraph {
    let mut nodes = BTreeSet::new();
    let mut edges = Vec::new();
    let mut per_key: BTreeMap<Key, KeyState> = BTreeMap::new();

    for entry in history {
        nodes.insert(entry.tx_id);
        let state = per_key.entry(entry.key.clone()).or_default();

        match entry.op {
            HistoryOp::Read => match state.mode {
                None | Some(Mode::Read) => {
                    if !state.holders.contains(&entry.tx_id) {
                        state.holders.push(entry.tx_id);
                    }
                    state.mode = Some(Mode::Read);
                }
                Some(Mode::Write) => {
                    let writer = state.holders[0];
                    push_edge(&mut edges, writer, entry.tx_id, EdgeLabel::WriteRead);
                    state.holders = vec![entry.tx_id];
                    state.mode = Some(Mode::Read);
                }
            },
            HistoryOp::Write => {
                match state.mode {
                    None => {}
                    Some(Mode::Read) => {
                        for &reader in &state.holders {
                            push_edge(&mut edges, reader, entry.tx_id, EdgeLabel::ReadWrite);
                        }
                    }
                    Some(Mode::Write) => {
                        let writer = state.holders[0];
                        push_edge(&mut edges, writer, entry.tx_id, EdgeLabel::WriteWrite);
                    }
                }
                state.holders = vec![entry.tx_id];
                state.mode = Some(Mode::Write);
            }
        }
    }

    ConflictGraph { nodes, edges }
}

fn push_edge(edges: &mut Vec<Edge>, from: TxId, to: TxId, label: EdgeLabel) {
    if from == to {
        return; // self-loops are suppressed
    }
    edges.push(Edge { from, to, label });
}
