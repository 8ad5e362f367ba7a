//! The durability layer: WAL framing + checksums, snapshot load/dump, and
//! crash recovery.
//!
//! Split out of the storage crate: this crate knows nothing about the
//! live table or lock state, only about bytes on disk.

#![warn(missing_docs)]

pub mod record;
pub mod recovery;
pub mod snapshot;
pub mod wal;

pub use record::WriteEntry;
pub use recovery::{RecoveryOutcome, RecoveryStats};
pub use wal::Wal;
