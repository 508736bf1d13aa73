//! Counting completion barrier.
//!
//! Initialized with the number of dispatched work items. Every item signals
//! [`CompletionBarrier::done`] exactly once, whether it produced a post or was
//! discarded. [`CompletionBarrier::wait`] is the single point where the build
//! learns that all producers are finished.

use super::CancelToken;
use parking_lot::{Condvar, Mutex};
use std::time::Duration;

/// How often a waiter re-checks an externally cancelled token.
const CANCEL_POLL: Duration = Duration::from_millis(50);

/// Why [`CompletionBarrier::wait`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// Every dispatched item signalled.
    Released,
    /// The token fired before the count reached zero.
    Cancelled,
}

#[derive(Debug)]
pub struct CompletionBarrier {
    remaining: Mutex<usize>,
    cond: Condvar,
}

impl CompletionBarrier {
    pub fn new(count: usize) -> Self {
        Self {
            remaining: Mutex::new(count),
            cond: Condvar::new(),
        }
    }

    /// Signal one completed item.
    pub fn done(&self) {
        let mut remaining = self.remaining.lock();
        debug_assert!(*remaining > 0, "completion signalled more times than dispatched");
        *remaining = remaining.saturating_sub(1);
        if *remaining == 0 {
            self.cond.notify_all();
        }
    }

    /// Wake waiters so they re-check cancellation immediately.
    pub fn wake(&self) {
        let _guard = self.remaining.lock();
        self.cond.notify_all();
    }

    pub fn remaining(&self) -> usize {
        *self.remaining.lock()
    }

    /// Block until the count reaches zero or `cancel` fires.
    ///
    /// A released barrier wins over a late cancellation: once every item has
    /// signalled, the result is [`Completion::Released`].
    pub fn wait(&self, cancel: &CancelToken) -> Completion {
        let mut remaining = self.remaining.lock();
        loop {
            if *remaining == 0 {
                return Completion::Released;
            }
            if cancel.is_cancelled() {
                return Completion::Cancelled;
            }
            self.cond.wait_for(&mut remaining, CANCEL_POLL);
        }
    }
}
