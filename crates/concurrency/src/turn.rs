//! The rendezvous channel pair that stands in for a giant mutex.
//!
//! Each transaction logic runs on its own OS thread. The [`Scheduler`] holds
//! one [`SchedulerSide`] per thread and steps them round-robin; each thread
//! holds the matching [`TxSide`] and calls [`TxSide::yield_now`] at every
//! point a transaction operation yields. At any instant at
//! most one side of one pair is runnable — the other end is blocked in
//! `recv()` — giving the same "only one context ever touches the store
//! at a time" guarantee a single shared mutex would, without holding a
//! real lock across a thread park.
//!
//! [`Scheduler`]: crate::scheduler::Scheduler

use std::sync::mpsc::{self, Receiver, Sender};

/// What a transaction thread reports back to the scheduler after a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxSignal {
    /// The transaction performed one step and yielded; it still has work
    /// left and should be re-queued.
    Yielded,
    /// The transaction called `commit` or `abort`; it is finished and
    /// should be joined, not re-queued.
    Done,
}

/// The transaction-thread side of one rendezvous pair.
///
/// A [`Scheduler`]-driven transaction holds the `Channel` variant and
/// rendezvouses with a `SchedulerSide` over real channels. A transaction
/// run directly against a `Store` with no scheduler in the loop (the
/// CLI's single-transaction mode) holds [`TxSide::immediate`] instead:
/// nothing else is ever runnable concurrently, so yielding has nothing to
/// rendezvous with and is a no-op.
///
/// [`Scheduler`]: crate::scheduler::Scheduler
pub struct TxSide(Inner);

enum Inner {
    Channel {
        step_rx: Receiver<()>,
        signal_tx: Sender<TxSignal>,
    },
    Immediate,
}

impl TxSide {
    /// A side with no scheduler partner: every yield point is a no-op.
    /// For driving a single transaction directly, without a `Scheduler`.
    pub fn immediate() -> Self {
        TxSide(Inner::Immediate)
    }

    /// Block until the scheduler grants this thread its next turn.
    pub fn wait_for_turn(&self) {
        if let Inner::Channel { step_rx, .. } = &self.0 {
            step_rx
                .recv()
                .expect("scheduler side dropped while a transaction was still running");
        }
    }

    /// Report that this thread yielded control after one operation, then
    /// block until the scheduler grants the next turn. Every public
    /// `TxHandle` operation calls this at least once before returning.
    pub fn yield_now(&self) {
        if let Inner::Channel { signal_tx, .. } = &self.0 {
            signal_tx
                .send(TxSignal::Yielded)
                .expect("scheduler side dropped while a transaction was still running");
        }
        self.wait_for_turn();
    }

    /// Report that this thread is done (committed or aborted). Does not
    /// wait for a further turn — the thread is about to exit.
    pub fn finish(&self) {
        if let Inner::Channel { signal_tx, .. } = &self.0 {
            let _ = signal_tx.send(TxSignal::Done);
        }
    }
}

/// The scheduler side of one rendezvous pair.
pub struct SchedulerSide {
    step_tx: Sender<()>,
    signal_rx: Receiver<TxSignal>,
}

impl SchedulerSide {
    /// Grant the paired thread its next turn, then block until it yields
    /// or finishes.
    pub fn step(&self) -> TxSignal {
        // A closed step_tx means the thread already exited without
        // signaling Done, which is an internal scheduler invariant
        // violation rather than something a caller can recover from.
        self.step_tx
            .send(())
            .expect("transaction thread exited without finishing its turn");
        self.signal_rx
            .recv()
            .expect("transaction thread exited without signaling Yielded or Done")
    }
}

/// Build one rendezvous pair: the `TxSide` for the new thread, the
/// `SchedulerSide` for the scheduler's run loop.
pub fn channel_pair() -> (TxSide, SchedulerSide) {
    let (step_tx, step_rx) = mpsc::channel();
    let (signal_tx, signal_rx) = mpsc::channel();
    (
        TxSide(Inner::Channel { step_rx, signal_tx }),
        SchedulerSide { step_tx, signal_rx },
    )
}
