//! Bounded recent-event log with channel fan-out.

use std::collections::VecDeque;

use crossbeam::channel::{self, Receiver, Sender};

use tms_core::DispatchEvent;

pub(crate) struct EventLog {
    recent:      VecDeque<DispatchEvent>,
    capacity:    usize,
    total:       u64,
    subscribers: Vec<Sender<DispatchEvent>>,
}

impl EventLog {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            recent: VecDeque::with_capacity(capacity.min(1_024)),
            capacity: capacity.max(1),
            total: 0,
            subscribers: Vec::new(),
        }
    }

    /// Record `event` and forward it to every live subscriber.  Subscribers
    /// whose receiver was dropped are forgotten.
    pub(crate) fn push(&mut self, event: DispatchEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
        if self.recent.len() == self.capacity {
            self.recent.pop_front();
        }
        self.recent.push_back(event);
        self.total += 1;
    }

    pub(crate) fn extend(&mut self, events: impl IntoIterator<Item = DispatchEvent>) {
        for event in events {
            self.push(event);
        }
    }

    /// New unbounded receiver that sees every event from now on.
    pub(crate) fn subscribe(&mut self) -> Receiver<DispatchEvent> {
        let (tx, rx) = channel::unbounded();
        self.subscribers.push(tx);
        rx
    }

    /// Newest first, skipping `offset`, at most `limit`.
    pub(crate) fn recent(&self, offset: usize, limit: usize) -> Vec<DispatchEvent> {
        self.recent.iter().rev().skip(offset).take(limit).cloned().collect()
    }

    /// Events recorded since start, including those evicted.
    pub(crate) fn total(&self) -> u64 {
        self.total
    }
}
