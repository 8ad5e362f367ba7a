//! Crash recovery: replay the WAL against the loaded snapshot.
//!
//! Recovery rules:
//! 1. The WAL is a sequence of `{`/`}`-bracketed blocks. A line equal to
//!    `{` opens a block; `}` closes it. Nested opens are malformed.
//! 2. If *any* inner line in the WAL fails the 4-field check or the CRC32
//!    check, the **entire** diff is discarded — not just the offending
//!    transaction (scenario S6).
//! 3. Otherwise each block's diff is applied in order: NEW upserts,
//!    DELETE removes.
//! 4. A trailing block with no closing `}` represents a transaction that
//!    crashed mid-commit. It is dropped silently (not an error, not a
//!    reason to discard the rest) and simply never applied.

use crate::record::WriteEntry;
use tracing::warn;

/// One committed transaction's diff, in write-set order.
pub type Diff = Vec<WriteEntry>;

/// Outcome of parsing and validating the WAL contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryOutcome {
    /// All complete blocks parsed cleanly; here are their diffs, in the
    /// order they appear in the log.
    Applied(Vec<Diff>),
    /// At least one inner line was malformed or failed its checksum;
    /// the whole diff is discarded and the table is left exactly as
    /// loaded from the snapshot.
    Discarded,
}

/// Stats surfaced for logging / tests, alongside [`RecoveryOutcome`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RecoveryStats {
    /// Number of complete, well-formed transaction blocks found.
    pub complete_blocks: usize,
    /// Whether a trailing block was left open (crash mid-commit).
    pub torn_trailing_block: bool,
}

/// Parse the raw WAL text into a recovery outcome.
pub fn parse(contents: &str) -> (RecoveryOutcome, RecoveryStats) {
    let mut diffs: Vec<Diff> = Vec::new();
    let mut current: Option<Vec<String>> = None;
    let mut corrupt = false;
    let mut torn_trailing_block = false;

    for raw_line in contents.lines() {
        let line = raw_line.trim_end_matches('\r');
        match line {
            "{" => {
                if current.is_some() {
                    // Nested open: malformed.
                    corrupt = true;
                }
                current = Some(Vec::new());
            }
            "}" => match current.take() {
                Some(raw_lines) => match parse_block(&raw_lines) {
                    Some(diff) => diffs.push(diff),
                    None => corrupt = true,
                },
                None => {
                    // Close with no matching open: malformed.
                    corrupt = true;
                }
            },
            _ => {
                if line.trim().is_empty() {
                    continue;
                }
                match current.as_mut() {
                    Some(buf) => buf.push(line.to_string()),
                    // A stray line outside any block is malformed.
                    None => corrupt = true,
                }
            }
        }
    }

    if current.is_some() {
        // Missing closing `}` for the last transaction: it was never
        // committed. Drop it silently, not an error.
        torn_trailing_block = true;
    }

    let stats = RecoveryStats {
        complete_blocks: diffs.len(),
        torn_trailing_block,
    };

    if corrupt {
        warn!(
            complete_blocks = stats.complete_blocks,
            "WAL contained a malformed or checksum-failing record; discarding entire diff"
        );
        (RecoveryOutcome::Discarded, stats)
    } else {
        (RecoveryOutcome::Applied(diffs), stats)
    }
}

/// Parse one block's inner lines into a diff, returning `None` if any line
/// fails the field-count or checksum check.
fn parse_block(lines: &[String]) -> Option<Diff> {
    lines
        .iter()
        .map(|line| WriteEntry::from_line(line))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use seccampdb_core::{ChangeMode, Key, Value};

    fn entry(key: &str, value: i64) -> WriteEntry {
        WriteEntry::new_value(Key::new(key).unwrap(), Value(value))
    }

    fn block(entries: &[WriteEntry]) -> String {
        String::from_utf8(crate::record::encode_block(entries)).unwrap()
    }

    #[test]
    fn empty_wal_applies_nothing() {
        let (outcome, stats) = parse("");
        assert_eq!(outcome, RecoveryOutcome::Applied(vec![]));
        assert_eq!(stats.complete_blocks, 0);
        assert!(!stats.torn_trailing_block);
    }

    #[test]
    fn single_valid_block_applies() {
        let e1 = entry("k1", 1);
        let e2 = entry("k2", 2);
        let wal = block(&[e1.clone(), e2.clone()]);
        let (outcome, stats) = parse(&wal);
        assert_eq!(outcome, RecoveryOutcome::Applied(vec![vec![e1, e2]]));
        assert_eq!(stats.complete_blocks, 1);
    }

    #[test]
    fn torn_trailing_block_is_dropped_not_corrupt() {
        let mut wal = block(&[entry("k1", 1)]);
        wal.push_str("{\n999 k2 0 2\n"); // no closing '}'
        let (outcome, stats) = parse(&wal);
        assert_eq!(
            outcome,
            RecoveryOutcome::Applied(vec![vec![entry("k1", 1)]])
        );
        assert!(stats.torn_trailing_block);
    }

    #[test]
    fn bad_checksum_anywhere_discards_everything() {
        let mut wal = block(&[entry("k1", 1)]);
        // A second, well-bracketed block with a corrupted checksum field.
        wal.push_str("{\n1 k2 0 2\n}\n");
        let (outcome, _stats) = parse(&wal);
        assert_eq!(outcome, RecoveryOutcome::Discarded);
    }

    #[test]
    fn wrong_field_count_discards_everything() {
        let mut wal = block(&[entry("k1", 1)]);
        wal.push_str("{\n123 k2 0\n}\n");
        let (outcome, _stats) = parse(&wal);
        assert_eq!(outcome, RecoveryOutcome::Discarded);
    }

    #[test]
    fn nested_open_is_malformed() {
        let wal = "{\n{\n}\n}\n";
        let (outcome, _) = parse(wal);
        assert_eq!(outcome, RecoveryOutcome::Discarded);
    }

    #[test]
    fn delete_entries_parse() {
        let e = WriteEntry::delete(Key::new("k1").unwrap());
        let wal = block(&[e.clone()]);
        let (outcome, _) = parse(&wal);
        match outcome {
            RecoveryOutcome::Applied(diffs) => {
                assert_eq!(diffs[0][0].mode, ChangeMode::Delete);
            }
            RecoveryOutcome::Discarded => panic!("expected applied"),
        }
    }
}
