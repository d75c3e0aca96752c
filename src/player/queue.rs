//! Mutex-guarded command queue
//!
//! Any thread may append. Exactly one consumer drains, taking the whole
//! pending batch in a single critical section so producers are never held
//! up while commands execute.

use crate::player::{Command, ConsumerMessage, QueuedCommand};
use crossbeam_channel::Sender;
use log::{debug, trace};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

pub struct CommandQueue {
    pending: Mutex<Pending>,

    /// Set while a `ProcessCommands` wake is in flight
    wake_outstanding: AtomicBool,

    waker: Sender<ConsumerMessage>,
}

#[derive(Default)]
struct Pending {
    commands: Vec<QueuedCommand>,
    next_seq: u64,
}

impl CommandQueue {
    pub fn new(waker: Sender<ConsumerMessage>) -> Self {
        Self {
            pending: Mutex::new(Pending::default()),
            wake_outstanding: AtomicBool::new(false),
            waker,
        }
    }

    /// Insert at the tail and wake the consumer. Never waits for the
    /// command to run. Returns the command's sequence id.
    pub fn append(&self, command: Command) -> u64 {
        let kind = command.kind();
        let seq = {
            let mut pending = self.pending.lock();
            let seq = pending.next_seq;
            pending.next_seq += 1;
            pending.commands.push(QueuedCommand { seq, command });
            seq
        };
        trace!("Queued #{} {:?}", seq, kind);

        if !self.wake_outstanding.swap(true, Ordering::AcqRel)
            && self.waker.send(ConsumerMessage::ProcessCommands).is_err()
        {
            debug!("Consumer gone, #{} {:?} will not run", seq, kind);
        }
        seq
    }

    /// Move every pending command out, in enqueue order
    pub fn take_all(&self) -> Vec<QueuedCommand> {
        // Cleared before taking: an append racing with us either lands in
        // this batch or sends a fresh wake.
        self.wake_outstanding.store(false, Ordering::Release);
        std::mem::take(&mut self.pending.lock().commands)
    }

    /// Take the pending batch and hand each command to `process`, oldest
    /// first. Commands appended by `process` wait for the next drain.
    pub fn drain_and_process<F>(&self, mut process: F) -> usize
    where
        F: FnMut(QueuedCommand),
    {
        let batch = self.take_all();
        let count = batch.len();
        for queued in batch {
            process(queued);
        }
        count
    }

    pub fn len(&self) -> usize {
        self.pending.lock().commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
