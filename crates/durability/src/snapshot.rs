//! Snapshot file load/dump.
//!
//! Format: one `<key> <decimal integer>` line per key, whitespace-separated,
//! blank lines ignored. A malformed line is fatal: the process cannot
//! safely guess at what was meant, unlike a corrupt WAL line which just
//! gets discarded.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use seccampdb_core::{Error, Key, Result, Value};
use tracing::info;

/// Load a snapshot file into an ordered key→value map. A missing file is
/// treated as an empty snapshot (first run).
pub fn load(path: impl AsRef<Path>) -> Result<BTreeMap<Key, Value>> {
    let path = path.as_ref();
    let contents = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(e.into()),
    };

    let mut table = BTreeMap::new();
    for line in contents.lines() {
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != 2 {
            return Err(Error::MalformedSnapshot {
                path: path.to_path_buf(),
                line: line.to_string(),
            });
        }
        let key = Key::new(fields[0]).map_err(|_| Error::MalformedSnapshot {
            path: path.to_path_buf(),
            line: line.to_string(),
        })?;
        let value: i64 = fields[1].parse().map_err(|_| Error::MalformedSnapshot {
            path: path.to_path_buf(),
            line: line.to_string(),
        })?;
        table.insert(key, Value(value));
    }

    info!(path = %path.display(), keys = table.len(), "loaded snapshot");
    Ok(table)
}

/// Dump the table to the snapshot file, truncating any previous contents.
/// One `<key> <value>` line per key, in key order (deterministic).
pub fn dump(path: impl AsRef<Path>, table: &BTreeMap<Key, Value>) -> Result<()> {
    let path = path.as_ref();
    let mut out = String::new();
    for (key, value) in table {
        out.push_str(key.as_str());
        out.push(' ');
        out.push_str(&value.0.to_string());
        out.push('\n');
    }
    fs::write(path, out)?;
    info!(path = %path.display(), keys = table.len(), "wrote snapshot");
    Ok(())
}
