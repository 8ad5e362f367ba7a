//! Drives a single transaction against a `Store`, one REPL command at a
//! time. No scheduler is involved: a lone interactive session has no
//! concurrent partner to interleave with.

use std::sync::Arc;

use parking_lot::Mutex;

use seccampdb_concurrency::turn::TxSide;
use seccampdb_concurrency::TxHandle;
use seccampdb_core::{HistoryEntry, TxId};
use seccampdb_storage::Store;
use tracing::info;

use crate::parse::Command;

/// Holds the live store and, when a transaction is open, its `TxHandle`.
pub struct Session {
    store: Arc<Mutex<Store>>,
    history: Arc<Mutex<Vec<HistoryEntry>>>,
    next_id: TxId,
    active: Option<TxHandle>,
}

impl Session {
    /// Start a session against `store`, with no transaction open yet.
    pub fn new(store: Arc<Mutex<Store>>) -> Self {
        Session {
            store,
            history: Arc::new(Mutex::new(Vec::new())),
            next_id: 1,
            active: None,
        }
    }

    /// Execute one parsed command, printing its result to stdout.
    pub fn dispatch(&mut self, command: Command) {
        match command {
            Command::Begin => self.begin(),
            Command::Set(key, value) => self.with_active(|tx| {
                tx.set(&key, value);
                println!("OK");
            }),
            Command::Get(key) => self.with_active(|tx| match tx.get(&key) {
                Some(value) => println!("{value}"),
                None => println!("(nil)"),
            }),
            Command::Del(key) => self.with_active(|tx| {
                if tx.del(&key) {
                    println!("OK");
                } else {
                    println!("(nil)");
                }
            }),
            Command::Keys => self.with_active(|tx| {
                for key in tx.keys() {
                    println!("{key}");
                }
            }),
            Command::Commit => self.terminate(|tx| {
                match tx.commit() {
                    Ok(()) => println!("OK"),
                    Err(e) => println!("error: {e}"),
                }
            }),
            Command::Abort => self.terminate(|tx| {
                tx.abort();
                println!("OK");
            }),
        }
    }

    fn begin(&mut self) {
        if self.active.is_some() {
            println!("error: a transaction is already open");
            return;
        }
        let id = self.next_id;
        self.next_id += 1;
        let mut tx = TxHandle::new(
            id,
            Arc::clone(&self.store),
            Arc::clone(&self.history),
            TxSide::immediate(),
        );
        tx.begin();
        info!(tx = id, "transaction opened");
        self.active = Some(tx);
    }

    fn with_active(&mut self, f: impl FnOnce(&mut TxHandle)) {
        match &mut self.active {
            Some(tx) => f(tx),
            None => println!("error: no open transaction (run `begin` first)"),
        }
    }

    fn terminate(&mut self, f: impl FnOnce(&mut TxHandle)) {
        match self.active.take() {
            Some(mut tx) => f(&mut tx),
            None => println!("error: no open transaction"),
        }
    }

    /// Flush the current table to the snapshot and truncate the WAL. Any
    /// still-open transaction's locks are simply dropped with the process.
    pub fn shutdown(&mut self) {
        if let Err(e) = self.store.lock().shutdown() {
            eprintln!("error during shutdown: {e}");
        }
    }
}
