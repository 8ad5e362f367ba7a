//! Transactions and cooperative scheduling.
//!
//! This crate is the Rust-idiomatic reading of a "giant mutex" cooperative
//! scheduler: instead of one real `Mutex` passed hand-to-hand
//! between OS threads that block inside `wait()`, each transaction logic
//! runs on its own [`std::thread`], and exactly one thread is ever runnable
//! at a time courtesy of a pair of rendezvous channels ([`turn`]). The
//! externally observable ordering is identical; only the plumbing differs.
//!
//! - [`TxHandle`]: the per-transaction state (write-set, lock-set, write-log)
//!   and the public operations a transaction logic calls.
//! - [`Scheduler`]: registers transaction logics, steps them round-robin to
//!   completion, and at teardown feeds the accumulated history straight into
//!   [`seccampdb_analyzer`] to build and write the conflict graph — no
//!   separate call required.

#![warn(missing_docs)]

pub mod scheduler;
pub mod transaction;
pub mod turn;

pub use scheduler::Scheduler;
pub use transaction::TxHandle;
