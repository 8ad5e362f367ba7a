//! `TxHandle`: per-transaction state and the public operations a
//! transaction logic calls.
//!
//! Every operation here yields at least once before returning (via
//! [`TxSide::yield_now`]): a transaction only ever touches the store
//! while holding its turn.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

use seccampdb_core::{ChangeMode, HistoryEntry, HistoryOp, Key, Result, TxId, Value};
use seccampdb_storage::{LockMode, Store};

use crate::turn::TxSide;

/// How often `get_until_success` reports its retry count at `trace!` level.
/// Purely observational — does not change the documented livelock
/// behavior of a transaction endlessly waiting on a held write lock.
const RETRY_TRACE_INTERVAL: u32 = 64;

/// One transaction's private state: its write-set, the order it wrote
/// keys in, the locks it holds, and whether it has terminated.
///
/// A `TxHandle` is driven entirely by its own thread, one operation call
/// at a time; the scheduler never touches it directly, only the
/// [`TxSide`] it shares with the scheduler's matching `SchedulerSide`.
pub struct TxHandle {
    id: TxId,
    store: Arc<Mutex<Store>>,
    history: Arc<Mutex<Vec<HistoryEntry>>>,
    turn: TxSide,
    write_set: BTreeMap<Key, (ChangeMode, Value)>,
    write_log: Vec<Key>,
    lock_set: HashSet<Key>,
    is_done: bool,
}

impl TxHandle {
    /// Build a transaction handle directly. A [`Scheduler`] uses this to
    /// wire up each registered logic's thread; a caller driving a single
    /// transaction with no scheduler (the CLI) can call this too, passing
    /// [`TxSide::immediate`](crate::turn::TxSide::immediate).
    ///
    /// [`Scheduler`]: crate::scheduler::Scheduler
    pub fn new(
        id: TxId,
        store: Arc<Mutex<Store>>,
        history: Arc<Mutex<Vec<HistoryEntry>>>,
        turn: TxSide,
    ) -> Self {
        TxHandle {
            id,
            store,
            history,
            turn,
            write_set: BTreeMap::new(),
            write_log: Vec::new(),
            lock_set: HashSet::new(),
            is_done: false,
        }
    }

    /// This transaction's identifier.
    pub fn id(&self) -> TxId {
        self.id
    }

    /// Whether this transaction has committed or aborted.
    pub fn is_done(&self) -> bool {
        self.is_done
    }

    /// Enter the critical region and yield once before any operation
    /// runs — the thread's very first turn is a no-op step, matching how
    /// every later operation also yields before returning.
    pub fn begin(&self) {
        self.turn.yield_now();
    }

    /// Whether `key` would currently be returned by `get` — present in
    /// the table, or written (and not deleted) by this transaction's own
    /// write-set.
    fn is_visible(&self, key: &Key) -> bool {
        match self.write_set.get(key) {
            Some((mode, _)) => *mode == ChangeMode::New,
            None => self.store.lock().has_key(key),
        }
    }

    fn record(&self, key: Key, op: HistoryOp) {
        self.history.lock().push(HistoryEntry {
            tx_id: self.id,
            key,
            op,
        });
    }

    /// Read `key`. Returns the transaction's own pending write if it has
    /// one, otherwise acquires a READ lock (retrying on contention) and
    /// reads the committed table. Returns `None` if `key` is not visible
    /// to this transaction (absent from the table and not locally
    /// written).
    pub fn get(&mut self, key: &Key) -> Option<Value> {
        if let Some((mode, value)) = self.write_set.get(key) {
            let result = match mode {
                ChangeMode::New => Some(*value),
                ChangeMode::Delete => None,
            };
            self.turn.yield_now();
            return result;
        }

        if !self.store.lock().has_key(key) {
            self.turn.yield_now();
            return None;
        }

        loop {
            let acquired = self.store.lock().acquire_lock(self.id, key, LockMode::Read);
            if acquired {
                break;
            }
            self.turn.yield_now();
        }
        self.lock_set.insert(key.clone());

        let value = self.store.lock().get(key);
        if value.is_some() {
            self.record(key.clone(), HistoryOp::Read);
        }
        self.turn.yield_now();
        value
    }

    /// Read `key`, retrying indefinitely until it becomes visible. Used
    /// by transaction logics that know a key will eventually be written
    /// by another transaction.
    pub fn get_until_success(&mut self, key: &Key) -> Value {
        let mut attempts: u32 = 0;
        loop {
            if let Some(value) = self.get(key) {
                return value;
            }
            attempts = attempts.wrapping_add(1);
            if attempts % RETRY_TRACE_INTERVAL == 0 {
                trace!(tx = self.id, %key, attempts, "still waiting for key to become visible");
            }
        }
    }

    /// Write `key` := `value`. Always recorded as `ChangeMode::New`,
    /// whether `key` already exists or not — insert and update are not
    /// distinguished at this surface. Acquires
    /// a WRITE lock only if `key` already exists in the table; a
    /// brand-new key cannot be observed by anyone else before commit, so
    /// no lock is needed.
    pub fn set(&mut self, key: &Key, value: Value) -> bool {
        let exists = self.store.lock().has_key(key);
        if exists {
            loop {
                let acquired = self.store.lock().acquire_lock(self.id, key, LockMode::Write);
                if acquired {
                    break;
                }
                self.turn.yield_now();
            }
            self.lock_set.insert(key.clone());
        }

        self.write_log.push(key.clone());
        self.write_set.insert(key.clone(), (ChangeMode::New, value));
        self.turn.yield_now();
        true
    }

    /// Delete `key`. Returns `false` if `key` is not currently visible
    /// to this transaction. `true` means success everywhere in this API,
    /// matching `set` — a deliberate flip from the C-style 0-is-success
    /// convention the behavior was ported from. Otherwise
    /// acquires a WRITE lock (if `key` exists in the table) and records
    /// a delete in the write-set.
    pub fn del(&mut self, key: &Key) -> bool {
        if !self.is_visible(key) {
            self.turn.yield_now();
            return false;
        }

        let exists = self.store.lock().has_key(key);
        if exists {
            loop {
                let acquired = self.store.lock().acquire_lock(self.id, key, LockMode::Write);
                if acquired {
                    break;
                }
                self.turn.yield_now();
            }
            self.lock_set.insert(key.clone());
        }

        self.write_log.push(key.clone());
        self.write_set
            .insert(key.clone(), (ChangeMode::Delete, Value(0)));
        self.turn.yield_now();
        true
    }

    /// The set of keys currently visible to this transaction: everything
    /// committed in the table, with this transaction's own pending
    /// writes and deletes overlaid. Returned as a `BTreeSet` so callers
    /// (including the CLI) get a deterministic iteration order without
    /// an explicit sort.
    pub fn keys(&mut self) -> BTreeSet<Key> {
        let mut result: BTreeSet<Key> = self.store.lock().keys().cloned().collect();
        for (key, (mode, _)) in &self.write_set {
            match mode {
                ChangeMode::New => {
                    result.insert(key.clone());
                }
                ChangeMode::Delete => {
                    result.remove(key);
                }
            }
        }
        self.turn.yield_now();
        result
    }

    /// Commit: apply the write-set to the store (the durability point —
    /// WAL append and fsync happen inside `Store::apply`), emit a WRITE
    /// history entry for every key in program order, release every lock
    /// this transaction held, and mark it done.
    pub fn commit(&mut self) -> Result<()> {
        self.store.lock().apply(&self.write_set)?;

        {
            let mut history = self.history.lock();
            for key in &self.write_log {
                history.push(HistoryEntry {
                    tx_id: self.id,
                    key: key.clone(),
                    op: HistoryOp::Write,
                });
            }
        }

        self.store.lock().release_locks(self.id, self.lock_set.iter());
        self.lock_set.clear();
        self.is_done = true;
        self.turn.finish();
        Ok(())
    }

    /// Abort: discard the write-set without touching the table or the
    /// WAL, release every lock this transaction held, and mark it done.
    /// No history entries are emitted for an aborted transaction — the
    /// conflict-serializability analyzer only ever sees committed work.
    pub fn abort(&mut self) {
        self.store.lock().release_locks(self.id, self.lock_set.iter());
        self.lock_set.clear();
        self.write_set.clear();
        self.write_log.clear();
        self.is_done = true;
        self.turn.finish();
    }
}

// TxHandle's operations all hinge on turn-taking with a real scheduler
// thread on the other end of its TxSide, so it is exercised through
// Scheduler-driven integration tests (see crate::scheduler::tests and
// tests/scenarios.rs at the workspace root) rather than in isolation here.
