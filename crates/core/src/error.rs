//! The unified error type for the seccampdb workspace.
//!
//! Most "errors" a caller can trigger (a missing key, lock contention) are
//! *not* represented here — they are `bool`/`Option` return values on the
//! operation that produced them. This enum carries only the genuinely
//! exceptional paths: I/O failure, a malformed snapshot (fatal — there is
//! no safe way to guess at what was meant), and internal invariant
//! violations.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by the store, durability, and recovery subsystems.
#[derive(Debug, Error)]
pub enum Error {
    /// Underlying file I/O failure (open, read, write, fsync, rename).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A snapshot line was malformed (not `<key> <int>`). This is fatal:
    /// the process cannot safely guess at recovery.
    #[error("malformed snapshot line in {path}: {line:?}")]
    MalformedSnapshot {
        /// Path of the offending snapshot file.
        path: PathBuf,
        /// The raw line that failed to parse.
        line: String,
    },

    /// A key failed validation (empty, or contains whitespace).
    #[error("invalid key: {0}")]
    InvalidKey(#[from] crate::types::KeyError),

    /// An internal invariant was violated — signals an implementation bug,
    /// not a user error. Always fatal, never retried.
    #[error("internal invariant violated: {0}")]
    Invariant(String),
}
