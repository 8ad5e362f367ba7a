//! Offline conflict-serializability analysis.
//!
//! Fed the scheduler's observed `(tx_id, key, op)` history, this crate
//! builds a conflict graph (R/W, W/R, W/W edges), topologically sorts it
//! into a serial schedule equivalent to the observed interleaving, and
//! renders both as Graphviz text.
//!
//! Everything here is a pure function over `&[HistoryEntry]` — no I/O —
//! except [`dot::write_to_path`], which is the one place this crate
//! touches the filesystem.

#![warn(missing_docs)]

pub mod dot;
pub mod graph;
pub mod schedule;

pub use graph::{build, ConflictGraph, Edge, EdgeLabel};
pub use schedule::serial_schedule;
