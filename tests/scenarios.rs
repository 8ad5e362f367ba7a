//! Concrete scenarios S1–S6 from the behavioral specification, each
//! exercised end to end through the [`seccampdb::Database`] facade.

use std::collections::BTreeMap;

use tempfile::tempdir;

use seccampdb::{Config, Database, TransactionLogic};
use seccampdb_core::{ChangeMode, HistoryOp, Key, Value};
use seccampdb_durability::record::encode_block;
use seccampdb_durability::WriteEntry;

fn paths() -> (tempfile::TempDir, std::path::PathBuf, std::path::PathBuf) {
    let dir = tempdir().unwrap();
    let snapshot = dir.path().join("dump");
    let log = dir.path().join("log");
    (dir, snapshot, log)
}

fn key(s: &str) -> Key {
    Key::new(s).unwrap()
}

/// Runs `logics` with teardown analysis redirected into `dir`, so tests
/// don't litter the process's working directory with stray graph files.
fn run_in(
    db: &Database,
    dir: &tempfile::TempDir,
    logics: Vec<TransactionLogic>,
) -> Vec<seccampdb_core::HistoryEntry> {
    db.run_with_graph_path(logics, dir.path().join(".graph"))
}

/// S1. Basic commit: two sets in one transaction land in the table, and
/// the WAL contains exactly one bracketed block with two entries.
#[test]
fn s1_basic_commit() {
    let (dir, snapshot, log) = paths();
    let db = Database::open(&snapshot, &log).unwrap();

    let logic: TransactionLogic = Box::new(|tx| {
        tx.set(&key("k1"), Value(1));
        tx.set(&key("k2"), Value(2));
        tx.commit().expect("commit failed");
    });
    let history = run_in(&db, &dir, vec![logic]);

    assert_eq!(history.len(), 2);
    assert!(history.iter().all(|e| e.op == HistoryOp::Write));

    let store = db.store();
    assert_eq!(store.lock().get(&key("k1")), Some(Value(1)));
    assert_eq!(store.lock().get(&key("k2")), Some(Value(2)));

    // Exactly one bracketed block, with two entries, landed in the WAL
    // before the next checkpoint — inspect it directly before shutdown.
    let wal_contents = std::fs::read_to_string(&log).unwrap();
    assert_eq!(wal_contents.matches('{').count(), 1);
    assert_eq!(wal_contents.matches('}').count(), 1);
}

/// S2. Abort rollback: the key never appears, the WAL stays empty, and
/// no history entry is recorded for the aborted transaction.
#[test]
fn s2_abort_rollback() {
    let (dir, snapshot, log) = paths();
    let db = Database::open(&snapshot, &log).unwrap();

    let logic: TransactionLogic = Box::new(|tx| {
        tx.set(&key("k1"), Value(7));
        tx.abort();
    });
    let history = run_in(&db, &dir, vec![logic]);

    assert!(history.is_empty());
    assert_eq!(db.store().lock().get(&key("k1")), None);
    assert_eq!(std::fs::read_to_string(&log).unwrap(), "");
}

/// S3. Read-read non-conflict: two transactions reading the same two
/// keys in opposite order never conflict; the graph has two nodes, no
/// edges, and the serial schedule is ascending by id.
#[test]
fn s3_read_read_non_conflict() {
    let (dir, snapshot, log) = paths();
    let db = Database::open(&snapshot, &log).unwrap();

    {
        let mut write_set = BTreeMap::new();
        write_set.insert(key("k1"), (ChangeMode::New, Value(1)));
        write_set.insert(key("k2"), (ChangeMode::New, Value(2)));
        db.store().lock().apply(&write_set).unwrap();
    }

    let t1: TransactionLogic = Box::new(|tx| {
        tx.get(&key("k1"));
        tx.get(&key("k2"));
        tx.commit().expect("commit failed");
    });
    let t2: TransactionLogic = Box::new(|tx| {
        tx.get(&key("k2"));
        tx.get(&key("k1"));
        tx.commit().expect("commit failed");
    });
    let history = run_in(&db, &dir, vec![t1, t2]);

    let graph = seccampdb_analyzer::build(&history);
    assert_eq!(graph.nodes.len(), 2);
    assert!(graph.edges.is_empty());
    assert_eq!(
        seccampdb_analyzer::serial_schedule(&graph),
        Some(vec![1, 2])
    );
}

/// S4. Write-read conflict: forcing T2's read to observe T1's commit (via
/// `get_until_success`, since the key starts out absent and a plain
/// single-shot `get` would just see "not visible" before T1 commits)
/// produces the documented `w-r` edge.
#[test]
fn s4_write_read_conflict() {
    let (dir, snapshot, log) = paths();
    let db = Database::open(&snapshot, &log).unwrap();

    let t1: TransactionLogic = Box::new(|tx| {
        tx.set(&key("k"), Value(5));
        tx.commit().expect("commit failed");
    });
    let t2: TransactionLogic = Box::new(|tx| {
        let value = tx.get_until_success(&key("k"));
        assert_eq!(value, Value(5));
        tx.commit().expect("commit failed");
    });
    let history = run_in(&db, &dir, vec![t1, t2]);

    let graph = seccampdb_analyzer::build(&history);
    assert!(graph.edges.iter().any(|e| {
        e.from == 1 && e.to == 2 && e.label == seccampdb_analyzer::EdgeLabel::WriteRead
    }));
}

/// S5. Crash recovery: a committed transaction survives a reopen even
/// without an intervening clean shutdown.
#[test]
fn s5_crash_recovery() {
    let (dir, snapshot, log) = paths();
    {
        let db = Database::open(&snapshot, &log).unwrap();
        let logic: TransactionLogic = Box::new(|tx| {
            tx.set(&key("k1"), Value(1));
            tx.set(&key("k2"), Value(2));
            tx.commit().expect("commit failed");
        });
        run_in(&db, &dir, vec![logic]);
        // No call to db.shutdown(): simulates the process dying here.
    }

    let db = Database::open_with_config(Config {
        snapshot_path: snapshot,
        log_path: log,
    })
    .unwrap();
    let store = db.store();
    assert_eq!(store.lock().get(&key("k1")), Some(Value(1)));
    assert_eq!(store.lock().get(&key("k2")), Some(Value(2)));
}

/// S6. Corrupted WAL: one valid block followed by a block with a bad
/// checksum discards the *entire* diff; the table falls back to the
/// (empty) snapshot.
#[test]
fn s6_corrupted_wal_discards_entire_diff() {
    let (_dir, snapshot, log) = paths();

    let good = WriteEntry::new_value(key("k1"), Value(1));
    let mut contents = encode_block(&[good]);

    // A second, well-bracketed block whose checksum field has been
    // tampered with.
    let bad_line = {
        let entry = WriteEntry::new_value(key("k2"), Value(2));
        let line = entry.to_line();
        let mut fields: Vec<&str> = line.split_whitespace().collect();
        fields[0] = "999999999";
        fields.join(" ")
    };
    contents.extend_from_slice(format!("{{\n{bad_line}\n}}\n").as_bytes());
    std::fs::write(&log, contents).unwrap();

    let db = Database::open(&snapshot, &log).unwrap();
    assert_eq!(db.store().lock().get(&key("k1")), None);
    assert_eq!(db.store().lock().get(&key("k2")), None);
}

/// Sanity check that the scheduler's own teardown writes a readable
/// Graphviz file, without the caller doing anything beyond `run`.
#[test]
fn emits_graph_at_scheduler_teardown() {
    let (dir, snapshot, log) = paths();
    let db = Database::open(&snapshot, &log).unwrap();
    let graph_path = dir.path().join(seccampdb::DEFAULT_GRAPH_PATH);

    let logic: TransactionLogic = Box::new(|tx| {
        tx.set(&key("k1"), Value(1));
        tx.commit().expect("commit failed");
    });
    let history = db.run_with_graph_path(vec![logic], &graph_path);
    assert_eq!(history.len(), 1);

    let text = std::fs::read_to_string(&graph_path).unwrap();
    assert!(text.contains("digraph g {"));
    assert!(text.contains("Tx1;"));
}
