//! Round-robin cooperative scheduling over registered transaction logics.
//!
//! `Scheduler::run` spawns one thread per registered logic, then repeatedly
//! pops the head of a FIFO queue, grants it one turn, and either re-queues
//! it (it yielded, more work remains) or joins it (it committed or
//! aborted). The queue is empty, and every transaction has terminated,
//! before `run` drives its teardown analysis: the accumulated history is
//! fed to [`seccampdb_analyzer`] and the resulting conflict graph plus
//! serial schedule are written out as Graphviz text, per spec §2/§4.3 —
//! this happens unconditionally, not only when a caller remembers to ask
//! for it separately.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;
use tracing::warn;

use seccampdb_core::{HistoryEntry, TxId, DEFAULT_GRAPH_PATH};
use seccampdb_storage::Store;

use crate::transaction::TxHandle;
use crate::turn::{self, SchedulerSide, TxSignal};

/// A transaction logic: the body a single transaction runs, expressed as
/// a closure over a [`TxHandle`]. This is the external interface
/// transaction authors write against; it is expected to call `commit` or
/// `abort` before returning.
type Logic = Box<dyn FnOnce(&mut TxHandle) + Send>;

/// Registers transaction logics and steps them to completion, round-robin,
/// one operation at a time.
pub struct Scheduler {
    store: Arc<Mutex<Store>>,
    history: Arc<Mutex<Vec<HistoryEntry>>>,
    next_id: TxId,
    logics: Vec<(TxId, Logic)>,
    graph_path: PathBuf,
}

impl Scheduler {
    /// Build a scheduler driving transactions against `store`. Teardown
    /// analysis writes its Graphviz output to [`DEFAULT_GRAPH_PATH`]
    /// unless overridden with [`Scheduler::with_graph_path`].
    pub fn new(store: Arc<Mutex<Store>>) -> Self {
        Scheduler {
            store,
            history: Arc::new(Mutex::new(Vec::new())),
            next_id: 1,
            logics: Vec::new(),
            graph_path: PathBuf::from(DEFAULT_GRAPH_PATH),
        }
    }

    /// Override where teardown analysis writes its Graphviz output.
    pub fn with_graph_path(mut self, path: impl AsRef<Path>) -> Self {
        self.graph_path = path.as_ref().to_path_buf();
        self
    }

    /// Register a transaction logic. Returns the transaction id it will
    /// run as, assigned in registration order and monotonic for the
    /// process lifetime.
    pub fn add(&mut self, logic: impl FnOnce(&mut TxHandle) + Send + 'static) -> TxId {
        let id = self.next_id;
        self.next_id += 1;
        self.logics.push((id, Box::new(logic)));
        id
    }

    /// Run every registered logic to completion, then drive teardown
    /// analysis: build the conflict graph over the accumulated history,
    /// topologically sort it into a serial schedule, and write both as
    /// Graphviz text. Returns the accumulated (tx_id, key, op) history in
    /// scheduler-observed order.
    pub fn run(self) -> Vec<HistoryEntry> {
        let Scheduler {
            store,
            history,
            logics,
            graph_path,
            ..
        } = self;

        let mut queue: VecDeque<(TxId, SchedulerSide, JoinHandle<()>)> = VecDeque::new();

        for (id, logic) in logics {
            let (tx_side, sched_side) = turn::channel_pair();
            let thread_store = Arc::clone(&store);
            let thread_history = Arc::clone(&history);
            let handle = thread::Builder::new()
                .name(format!("tx-{id}"))
                .spawn(move || {
                    let mut tx = TxHandle::new(id, thread_store, thread_history, tx_side);
                    tx.begin();
                    logic(&mut tx);
                    if !tx.is_done() {
                        warn!(
                            tx = id,
                            "transaction logic returned without commit or abort; aborting it"
                        );
                        tx.abort();
                    }
                })
                .expect("failed to spawn transaction thread");
            queue.push_back((id, sched_side, handle));
        }

        while let Some((id, sched_side, handle)) = queue.pop_front() {
            match sched_side.step() {
                TxSignal::Yielded => queue.push_back((id, sched_side, handle)),
                TxSignal::Done => {
                    handle.join().expect("transaction thread panicked");
                }
            }
        }

        let history = Arc::try_unwrap(history)
            .map(Mutex::into_inner)
            .unwrap_or_else(|shared| shared.lock().clone());

        self::analyze_and_emit(&history, &graph_path);

        history
    }
}

/// The scheduler's teardown analysis: replay the observed history into a
/// conflict graph, topologically sort it into a serial schedule (or
/// discover a cycle), and write both as Graphviz text to `graph_path`. A
/// write failure is logged, not propagated — the transactions it
/// describes have already committed or aborted by this point, so there is
/// nothing left to roll back.
fn analyze_and_emit(history: &[HistoryEntry], graph_path: &Path) {
    let graph = seccampdb_analyzer::build(history);
    let schedule = seccampdb_analyzer::serial_schedule(&graph);
    if schedule.is_none() && !graph.edges.is_empty() {
        warn!(
            path = %graph_path.display(),
            "conflict graph has a cycle; history is not conflict-serializable, emitting empty schedule"
        );
    }
    if let Err(error) = seccampdb_analyzer::dot::write_to_path(graph_path, &graph, schedule.as_deref()) {
        warn!(path = %graph_path.display(), %error, "failed to write conflict graph at scheduler teardown");
    }
}
