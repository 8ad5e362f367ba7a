//! The Store: table + lock state + WAL, tying the durability layer to the
//! live table.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use seccampdb_core::{ChangeMode, Key, Result, TxId, Value};
use seccampdb_durability::recovery::{self, RecoveryOutcome};
use seccampdb_durability::{snapshot, WriteEntry};
use seccampdb_durability::Wal;
use tracing::{info, warn};

use crate::lock::{LockMode, LockState};

/// One record slot: the committed value plus its current lock state.
#[derive(Debug, Clone)]
struct RecordSlot {
    value: Value,
    lock: LockState,
}

/// The in-memory table, its WAL, and the paths a checkpoint writes to.
pub struct Store {
    table: BTreeMap<Key, RecordSlot>,
    wal: Wal,
    snapshot_path: PathBuf,
}

impl Store {
    /// Load the snapshot, replay the WAL if non-empty (discarding the
    /// whole diff on any corruption), then truncate the WAL and open it
    /// for append.
    pub fn new(snapshot_path: impl AsRef<Path>, log_path: impl AsRef<Path>) -> Result<Self> {
        let snapshot_path = snapshot_path.as_ref().to_path_buf();
        let loaded = snapshot::load(&snapshot_path)?;
        let mut table: BTreeMap<Key, RecordSlot> = loaded
            .into_iter()
            .map(|(k, v)| {
                (
                    k,
                    RecordSlot {
                        value: v,
                        lock: LockState::Unlocked,
                    },
                )
            })
            .collect();

        let mut wal = Wal::open(log_path.as_ref())?;
        let contents = wal.read_to_string()?;
        if !contents.is_empty() {
            let (outcome, stats) = recovery::parse(&contents);
            match outcome {
                RecoveryOutcome::Applied(diffs) => {
                    for diff in &diffs {
                        apply_diff(&mut table, diff);
                    }
                    info!(
                        transactions = diffs.len(),
                        torn_trailing = stats.torn_trailing_block,
                        "replayed WAL"
                    );
                }
                RecoveryOutcome::Discarded => {
                    warn!("WAL diff discarded due to corruption; table reflects snapshot only");
                }
            }
        }

        // A clean checkpoint: snapshot now reflects everything we just
        // recovered, and the WAL starts empty immediately after open, not
        // just after a later shutdown.
        dump_snapshot(&snapshot_path, &table)?;
        wal.truncate()?;

        Ok(Store {
            table,
            wal,
            snapshot_path,
        })
    }

    /// Checkpoint: rewrite the snapshot from the live table, then truncate
    /// the WAL.
    pub fn shutdown(&mut self) -> Result<()> {
        dump_snapshot(&self.snapshot_path, &self.table)?;
        self.wal.truncate()?;
        Ok(())
    }

    /// Whether `key` is present in the committed table (not the write
    /// set — callers consult write-sets separately for visibility).
    pub fn has_key(&self, key: &Key) -> bool {
        self.table.contains_key(key)
    }

    /// The committed value for `key`, if present.
    pub fn get(&self, key: &Key) -> Option<Value> {
        self.table.get(key).map(|slot| slot.value)
    }

    /// All keys currently committed in the table, in order.
    pub fn keys(&self) -> impl Iterator<Item = &Key> {
        self.table.keys()
    }

    /// Attempt to grant `mode` to `tx` on `key`. Locks only exist on keys
    /// already present in the table — a transaction writing a brand-new
    /// key never contends, since nothing else can observe it until
    /// commit. Calling this for an absent key vacuously succeeds.
    pub fn acquire_lock(&mut self, tx: TxId, key: &Key, mode: LockMode) -> bool {
        match self.table.get_mut(key) {
            Some(slot) => slot.lock.acquire(tx, mode),
            None => true,
        }
    }

    /// Release every lock `tx` holds among `keys`. Locks are released
    /// only at transaction termination, never mid-transaction.
    pub fn release_locks<'a>(&mut self, tx: TxId, keys: impl Iterator<Item = &'a Key>) {
        for key in keys {
            if let Some(slot) = self.table.get_mut(key) {
                slot.lock.release(tx);
            }
        }
    }

    /// Commit: append the write-set as one framed WAL record, fsync, then
    /// apply it to the live table. The WAL append must land before the
    /// table mutates, so a crash between the two never loses a commit.
    pub fn apply(&mut self, write_set: &BTreeMap<Key, (ChangeMode, Value)>) -> Result<()> {
        let entries: Vec<WriteEntry> = write_set
            .iter()
            .map(|(key, (mode, value))| WriteEntry {
                key: key.clone(),
                mode: *mode,
                value: *value,
            })
            .collect();
        self.wal.append(&entries)?;
        for entry in &entries {
            apply_entry(&mut self.table, entry);
        }
        Ok(())
    }

    /// The lock count currently observed on `key`, for tests/diagnostics
    /// that want to assert on the tri-state encoding directly.
    pub fn lock_count(&self, key: &Key) -> i32 {
        self.table
            .get(key)
            .map(|slot| slot.lock.lock_count())
            .unwrap_or(0)
    }
}

fn apply_diff(table: &mut BTreeMap<Key, RecordSlot>, diff: &[WriteEntry]) {
    for entry in diff {
        apply_entry(table, entry);
    }
}

fn apply_entry(table: &mut BTreeMap<Key, RecordSlot>, entry: &WriteEntry) {
    match entry.mode {
        ChangeMode::New => {
            table
                .entry(entry.key.clone())
                .and_modify(|slot| slot.value = entry.value)
                .or_insert_with(|| RecordSlot {
                    value: entry.value,
                    lock: LockState::Unlocked,
                });
        }
        ChangeMode::Delete => {
            table.remove(&entry.key);
        }
    }
}

fn dump_snapshot(path: &Path, table: &BTreeMap<Key, RecordSlot>) -> Result<()> {
    let values: BTreeMap<Key, Value> = table.iter().map(|(k, s)| (k.clone(), s.value)).collect();
    snapshot::dump(path, &values)
}
