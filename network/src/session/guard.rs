// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scoped resources and ordering primitives used by sessions

use parking_lot::Mutex;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Count of local publishes still in flight
#[derive(Debug, Default, Clone)]
pub struct PendingWrites {
    in_flight: Arc<AtomicUsize>,
}

impl PendingWrites {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a publish as in flight until the guard is dropped
    pub fn acquire(&self) -> PendingWriteGuard {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        PendingWriteGuard {
            in_flight: self.in_flight.clone(),
        }
    }

    /// Whether any publish is still in flight
    pub fn is_pending(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst) > 0
    }
}

/// Held for the duration of one publish; released on drop whatever the
/// outcome.
#[derive(Debug)]
#[must_use = "the write is only pending while the guard is alive"]
pub struct PendingWriteGuard {
    in_flight: Arc<AtomicUsize>,
}

impl Drop for PendingWriteGuard {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// A background task that lives exactly as long as this handle
#[derive(Debug)]
pub struct Subscription {
    handle: JoinHandle<()>,
}

impl Subscription {
    pub fn spawn<F>(task: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        Self {
            handle: tokio::spawn(task),
        }
    }

    pub fn is_active(&self) -> bool {
        !self.handle.is_finished()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Per-session Lamport clock for action sequence ids
#[derive(Debug, Default)]
pub struct SequenceCounter {
    last: Mutex<u64>,
}

impl SequenceCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// An id greater than every id issued or observed so far
    pub fn next(&self) -> u64 {
        let mut last = self.last.lock();
        *last += 1;
        *last
    }

    /// Account for an id seen from the other client
    pub fn observe(&self, seq: u64) {
        let mut last = self.last.lock();
        *last = (*last).max(seq);
    }

    pub fn current(&self) -> u64 {
        *self.last.lock()
    }
}

/// Admits actions in strictly increasing sequence order and drops the rest
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SequenceGate {
    last_applied: Option<u64>,
}

impl SequenceGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept `seq` if it is newer than anything applied so far
    pub fn admit(&mut self, seq: u64) -> bool {
        if self.last_applied.is_some_and(|last| seq <= last) {
            return false;
        }
        self.last_applied = Some(seq);
        true
    }

    /// Record a locally committed action so its echo is not applied again
    pub fn record(&mut self, seq: u64) {
        self.last_applied = Some(self.last_applied.map_or(seq, |last| last.max(seq)));
    }

    pub fn last_applied(&self) -> Option<u64> {
        self.last_applied
    }
}
