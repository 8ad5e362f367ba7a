//! Core types shared across the seccampdb workspace.
//!
//! This crate defines the foundational, dependency-free vocabulary used by
//! every other crate in the workspace:
//! - [`Key`] / [`Value`]: the data model
//! - [`ChangeMode`]: the two write-set modes, NEW and DELETE
//! - [`Error`] / [`Result`]: the unified error type
//! - [`DEFAULT_GRAPH_PATH`]: the wire-level default path the conflict
//!   graph is written to, shared by the scheduler's teardown analysis and
//!   anything re-emitting a graph from a saved history

#![warn(missing_docs)]

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{ChangeMode, HistoryEntry, HistoryOp, Key, KeyError, TxId, Value};

/// The default path the conflict graph is written to, per spec §6.
pub const DEFAULT_GRAPH_PATH: &str = ".seccampDB_graph";
