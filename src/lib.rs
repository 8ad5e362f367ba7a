//! # seccampdb
//!
//! An in-memory key-value store with ACID-style transactions, a
//! write-ahead log for crash durability, strict two-phase locking for
//! concurrency control, and an offline conflict-serializability analyzer
//! that emits a serial schedule for the transactions that actually ran.
//!
//! This crate is the facade wiring together the workspace's components:
//! [`seccampdb_storage::Store`] (table, locks, WAL),
//! [`seccampdb_concurrency::Scheduler`] (cooperative round-robin stepping
//! of transaction logics, which drives teardown analysis itself), and
//! [`seccampdb_analyzer`] (conflict graph + serial schedule + Graphviz
//! emission).
//!
//! # Quick Start
//!
//! ```no_run
//! use seccampdb::Database;
//! use seccampdb_core::{Key, Value};
//!
//! fn main() -> seccampdb_core::Result<()> {
//!     let db = Database::open("./snapshot", "./log")?;
//!
//!     let logic: seccampdb::TransactionLogic = Box::new(|tx| {
//!         tx.set(&Key::new("k1").unwrap(), Value(1));
//!         tx.commit().expect("commit failed");
//!     });
//!     // The scheduler writes the conflict graph to `DEFAULT_GRAPH_PATH`
//!     // as part of its own teardown; no separate call is needed.
//!     let _history = db.run(vec![logic]);
//!
//!     db.shutdown()
//! }
//! ```

#![warn(missing_docs)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

pub use seccampdb_analyzer::{ConflictGraph, Edge, EdgeLabel};
pub use seccampdb_concurrency::{Scheduler, TxHandle};
pub use seccampdb_core::{Error, HistoryEntry, Key, Result, TxId, Value, DEFAULT_GRAPH_PATH};
pub use seccampdb_storage::Store;

/// A transaction logic: the closure a caller registers with the
/// scheduler to drive one transaction.
pub type TransactionLogic = Box<dyn FnOnce(&mut TxHandle) + Send>;

/// The two paths the whole system is configured with — nothing else.
#[derive(Debug, Clone)]
pub struct Config {
    /// Where the snapshot is loaded from and checkpointed to.
    pub snapshot_path: PathBuf,
    /// Where the write-ahead log lives.
    pub log_path: PathBuf,
}

/// The whole system: a `Store` shared behind a lock, ready to have
/// transaction logics run against it.
pub struct Database {
    store: Arc<Mutex<Store>>,
}

impl Database {
    /// Open (or create) a database at the given snapshot and log paths,
    /// replaying any WAL left from a prior crash.
    pub fn open(snapshot_path: impl AsRef<Path>, log_path: impl AsRef<Path>) -> Result<Self> {
        let store = Store::new(snapshot_path, log_path)?;
        Ok(Database {
            store: Arc::new(Mutex::new(store)),
        })
    }

    /// Open a database from a [`Config`].
    pub fn open_with_config(config: Config) -> Result<Self> {
        Self::open(config.snapshot_path, config.log_path)
    }

    /// The shared store handle, for callers that want to build their own
    /// `Scheduler` or drive a single transaction directly (as the CLI
    /// does).
    pub fn store(&self) -> Arc<Mutex<Store>> {
        Arc::clone(&self.store)
    }

    /// Register every logic in `logics` with a fresh [`Scheduler`] and run
    /// it to completion, returning the accumulated history. The scheduler's
    /// own teardown writes the conflict graph to [`DEFAULT_GRAPH_PATH`];
    /// use [`Database::run_with_graph_path`] to write it elsewhere.
    pub fn run(&self, logics: Vec<TransactionLogic>) -> Vec<HistoryEntry> {
        let mut scheduler = Scheduler::new(self.store());
        for logic in logics {
            scheduler.add(logic);
        }
        scheduler.run()
    }

    /// Like [`Database::run`], but the scheduler's teardown analysis is
    /// written to `graph_path` instead of the default.
    pub fn run_with_graph_path(
        &self,
        logics: Vec<TransactionLogic>,
        graph_path: impl AsRef<Path>,
    ) -> Vec<HistoryEntry> {
        let mut scheduler = Scheduler::new(self.store()).with_graph_path(graph_path);
        for logic in logics {
            scheduler.add(logic);
        }
        scheduler.run()
    }

    /// Re-analyze an already-produced `history` and write its conflict
    /// graph and serial schedule as Graphviz text to `path`. Useful for
    /// re-emitting a graph from a history saved from a prior run, since a
    /// live `run` already writes one automatically at teardown.
    pub fn emit_graph(&self, history: &[HistoryEntry], path: impl AsRef<Path>) -> Result<()> {
        let graph = seccampdb_analyzer::build(history);
        let schedule = seccampdb_analyzer::serial_schedule(&graph);
        seccampdb_analyzer::dot::write_to_path(path, &graph, schedule.as_deref())
    }

    /// Checkpoint: dump the table to the snapshot and truncate the WAL.
    pub fn shutdown(&self) -> Result<()> {
        self.store.lock().shutdown()
    }
}
