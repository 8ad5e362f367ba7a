//! Per-key lock state and the strict two-phase locking acquisition policy.

use std::collections::HashSet;

use seccampdb_core::TxId;

/// The mode a transaction requests a lock in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    /// Shared (read) lock: compatible with other readers.
    Read,
    /// Exclusive (write) lock: incompatible with any other holder.
    Write,
}

/// The lock state of one record slot.
///
/// Externally this is observed as a tri-state `lock_count`: `0`
/// unlocked, `-1` exclusive, `n > 0` shared by `n` distinct transactions.
/// Internally it is modeled as an enum rather than a bare counter so that
/// "who holds this and how" is a structurally enforced invariant instead of
/// a comment above an `i32`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockState {
    /// No transaction holds a lock on this key.
    Unlocked,
    /// Exactly one transaction holds an exclusive (write) lock.
    Exclusive(TxId),
    /// One or more transactions hold a shared (read) lock.
    Shared(HashSet<TxId>),
}

impl Default for LockState {
    fn default() -> Self {
        LockState::Unlocked
    }
}

impl LockState {
    /// The tri-state `lock_count` encoding external callers observe.
    pub fn lock_count(&self) -> i32 {
        match self {
            LockState::Unlocked => 0,
            LockState::Exclusive(_) => -1,
            LockState::Shared(holders) => holders.len() as i32,
        }
    }

    /// Whether `tx` already holds some lock (of any mode) on this slot.
    fn holds(&self, tx: TxId) -> bool {
        match self {
            LockState::Unlocked => false,
            LockState::Exclusive(owner) => *owner == tx,
            LockState::Shared(holders) => holders.contains(&tx),
        }
    }

    /// Attempt to grant `mode` to `tx`. Returns `true` on success (and
    /// mutates `self` to reflect the new holder), `false` on contention
    /// (the caller yields and retries).
    pub fn acquire(&mut self, tx: TxId, mode: LockMode) -> bool {
        if self.holds(tx) {
            return self.reacquire(tx, mode);
        }

        match (mode, &mut *self) {
            (LockMode::Write, LockState::Unlocked) => {
                *self = LockState::Exclusive(tx);
                true
            }
            (LockMode::Read, LockState::Unlocked) => {
                let mut holders = HashSet::new();
                holders.insert(tx);
                *self = LockState::Shared(holders);
                true
            }
            (LockMode::Read, LockState::Shared(holders)) => {
                holders.insert(tx);
                true
            }
            // WRITE vs. Exclusive(other) or Shared(other): contention.
            // READ vs. Exclusive(other): contention.
            _ => false,
        }
    }

    /// Re-entrant acquisition: `tx` already holds some lock on this key.
    /// There is no upgrade path from shared to exclusive.
    fn reacquire(&mut self, tx: TxId, mode: LockMode) -> bool {
        match (mode, &*self) {
            (LockMode::Write, LockState::Exclusive(owner)) => *owner == tx,
            (LockMode::Read, LockState::Shared(holders)) => holders.contains(&tx),
            // Holding exclusive already satisfies a read re-acquire: the
            // transaction already has the strongest possible lock.
            (LockMode::Read, LockState::Exclusive(owner)) => *owner == tx,
            // Holding only shared and requesting write: no upgrade path.
            (LockMode::Write, LockState::Shared(_)) => false,
            (_, LockState::Unlocked) => unreachable!("holds() implies not Unlocked"),
        }
    }

    /// Release `tx`'s hold on this slot. Called only at transaction
    /// termination, never mid-transaction. A no-op if `tx` does not hold
    /// this slot.
    pub fn release(&mut self, tx: TxId) {
        match self {
            LockState::Exclusive(owner) if *owner == tx => {
                *self = LockState::Unlocked;
            }
            LockState::Shared(holders) => {
                holders.remove(&tx);
                if holders.is_empty() {
                    *self = LockState::Unlocked;
                }
            }
            _ => {}
        }
    }
}
