//! The write-ahead log file: append-only, framed, fsync'd.

use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use seccampdb_core::Result;
use tracing::{debug, trace};

use crate::record::{encode_block, WriteEntry};

/// Handle to the on-disk WAL file, opened for append.
///
/// A committed transaction's write-set is appended and fsynced *before*
/// the in-memory table is mutated. The write loop retries until the
/// whole buffer is accepted — `write_all` already does this for us, but
/// we keep an explicit loop rather than relying silently on the standard
/// library's behavior.
pub struct Wal {
    file: File,
    path: PathBuf,
}

impl Wal {
    /// Open (creating if absent) the WAL file for append.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .read(true)
            .open(&path)?;
        Ok(Wal { file, path })
    }

    /// Append one committed transaction's write-set as a single framed,
    /// checksummed block, then fsync. Returns once the record is durable.
    pub fn append(&mut self, entries: &[WriteEntry]) -> Result<()> {
        let bytes = encode_block(entries);
        self.write_all_retrying(&bytes)?;
        self.file.sync_all()?;
        trace!(entries = entries.len(), "appended WAL record");
        Ok(())
    }

    /// Loop until every byte of `buf` has been accepted by the OS: a
    /// `write` that returns less than the full buffer is not an error and
    /// must be retried, not treated as a partial commit.
    fn write_all_retrying(&mut self, buf: &[u8]) -> Result<()> {
        let mut offset = 0;
        while offset < buf.len() {
            let written = self.file.write(&buf[offset..])?;
            if written == 0 {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::WriteZero,
                    "WAL append wrote zero bytes",
                )
                .into());
            }
            offset += written;
        }
        Ok(())
    }

    /// Read the entire raw WAL contents, for recovery parsing.
    pub fn read_to_string(&mut self) -> Result<String> {
        let mut contents = String::new();
        // Recovery reads from the start regardless of the current append
        // cursor, so seek back explicitly.
        use std::io::{Seek, SeekFrom};
        self.file.seek(SeekFrom::Start(0))?;
        self.file.read_to_string(&mut contents)?;
        self.file.seek(SeekFrom::End(0))?;
        Ok(contents)
    }

    /// Whether the WAL currently has any bytes in it.
    pub fn is_empty(&mut self) -> Result<bool> {
        Ok(self.read_to_string()?.is_empty())
    }

    /// Truncate the WAL to empty, as the second half of a checkpoint
    /// The file stays open for further appends.
    pub fn truncate(&mut self) -> Result<()> {
        self.file.set_len(0)?;
        use std::io::{Seek, SeekFrom};
        self.file.seek(SeekFrom::Start(0))?;
        self.file.sync_all()?;
        debug!(path = %self.path.display(), "truncated WAL");
        Ok(())
    }

    /// The path this WAL was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }
}
