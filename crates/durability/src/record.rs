//! WAL record encoding: one bracket-delimited, checksummed block per
//! committed transaction.
//!
//! ```text
//! {
//! <checksum> <key> <mode> <value>\n   // one per write-set entry
//! ...
//! }
//! ```
//!
//! `checksum` is the CRC32 of the decimal-rendered concatenation
//! `key ∥ mode ∥ value` (no separators, no whitespace) — NOT the CRC32 of
//! the line itself.

use seccampdb_core::{ChangeMode, Key, Value};

/// One write-set entry as it appears inside a WAL block: the key, the
/// change mode (NEW/DELETE), and the value (`0` for DELETE — `mode`
/// determines meaning, not `value`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteEntry {
    /// The key being written or deleted.
    pub key: Key,
    /// NEW (insert/update) or DELETE.
    pub mode: ChangeMode,
    /// The new value for NEW entries; `0` for DELETE entries.
    pub value: Value,
}

impl WriteEntry {
    /// Create a NEW (upsert) entry.
    pub fn new_value(key: Key, value: Value) -> Self {
        WriteEntry {
            key,
            mode: ChangeMode::New,
            value,
        }
    }

    /// Create a DELETE entry.
    pub fn delete(key: Key) -> Self {
        WriteEntry {
            key,
            mode: ChangeMode::Delete,
            value: Value(0),
        }
    }

    /// CRC32 of `key ∥ mode ∥ value`, all decimal-rendered, concatenated
    /// with no separators.
    pub fn checksum(&self) -> u32 {
        let mut buf = String::with_capacity(self.key.as_str().len() + 8);
        buf.push_str(self.key.as_str());
        buf.push_str(&self.mode.wire_code().to_string());
        buf.push_str(&self.value.0.to_string());
        crc32fast::hash(buf.as_bytes())
    }

    /// Render as the single whitespace-delimited WAL line (no trailing
    /// newline): `<checksum> <key> <mode> <value>`.
    pub fn to_line(&self) -> String {
        format!(
            "{} {} {} {}",
            self.checksum(),
            self.key.as_str(),
            self.mode.wire_code(),
            self.value.0
        )
    }

    /// Parse a single WAL inner line, validating both the field count and
    /// the checksum. Returns `None` on any failure — the caller is
    /// responsible for discarding the whole diff.
    pub fn from_line(line: &str) -> Option<Self> {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != 4 {
            return None;
        }
        let stored_checksum: u32 = fields[0].parse().ok()?;
        let key = Key::new(fields[1]).ok()?;
        let mode_code: u8 = fields[2].parse().ok()?;
        let mode = ChangeMode::from_wire_code(mode_code)?;
        let raw_value: i64 = fields[3].parse().ok()?;
        let entry = WriteEntry {
            key,
            mode,
            value: Value(raw_value),
        };
        if entry.checksum() != stored_checksum {
            return None;
        }
        Some(entry)
    }
}

/// Render a full transaction's write-set as one bracket-delimited WAL
/// block, including the trailing newline on every line.
pub fn encode_block(entries: &[WriteEntry]) -> Vec<u8> {
    let mut buf = String::new();
    buf.push_str("{\n");
    for entry in entries {
        buf.push_str(&entry.to_line());
        buf.push('\n');
    }
    buf.push_str("}\n");
    buf.into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn key(s: &str) -> Key {
        Key::new(s).unwrap()
    }

    #[test]
    fn line_roundtrips() {
        let entry = WriteEntry::new_value(key("k1"), Value(42));
        let line = entry.to_line();
        let parsed = WriteEntry::from_line(&line).unwrap();
        assert_eq!(parsed, entry);
    }

    #[test]
    fn delete_roundtrips() {
        let entry = WriteEntry::delete(key("k1"));
        let line = entry.to_line();
        let parsed = WriteEntry::from_line(&line).unwrap();
        assert_eq!(parsed, entry);
    }

    #[test]
    fn rejects_bad_checksum() {
        let entry = WriteEntry::new_value(key("k1"), Value(42));
        let mut line = entry.to_line();
        // Corrupt the stored checksum field.
        line = line.replacen(
            &entry.checksum().to_string(),
            &(entry.checksum() ^ 1).to_string(),
            1,
        );
        assert!(WriteEntry::from_line(&line).is_none());
    }

    #[test]
    fn rejects_wrong_field_count() {
        assert!(WriteEntry::from_line("123 k1 0").is_none());
        assert!(WriteEntry::from_line("123 k1 0 42 99").is_none());
    }

    #[test]
    fn encode_block_brackets_lines() {
        let entries = vec![
            WriteEntry::new_value(key("k1"), Value(1)),
            WriteEntry::new_value(key("k2"), Value(2)),
        ];
        let block = String::from_utf8(encode_block(&entries)).unwrap();
        let lines: Vec<&str> = block.lines().collect();
        assert_eq!(lines.first(), Some(&"{"));
        assert_eq!(lines.last(), Some(&"}"));
        assert_eq!(lines.len(), 4);
    }

    proptest::proptest! {
        #[test]
        fn line_roundtrips_for_any_well_formed_entry(
            raw_key in "[a-zA-Z0-9_]{1,16}",
            value in any::<i64>(),
            is_delete in any::<bool>(),
        ) {
            let entry = if is_delete {
                WriteEntry::delete(key(&raw_key))
            } else {
                WriteEntry::new_value(key(&raw_key), Value(value))
            };
            let line = entry.to_line();
            prop_assert_eq!(WriteEntry::from_line(&line), Some(entry));
        }

        #[test]
        fn single_bit_flip_in_checksum_is_rejected(
            raw_key in "[a-zA-Z0-9_]{1,16}",
            value in any::<i64>(),
        ) {
            let entry = WriteEntry::new_value(key(&raw_key), Value(value));
            let checksum = entry.checksum();
            let corrupted = format!("{} {} {} {}", checksum ^ 1, entry.key.as_str(), entry.mode.wire_code(), entry.value.0);
            prop_assert_eq!(WriteEntry::from_line(&corrupted), None);
        }
    }
}
