//! Worker Pool: a bounded set of threads draining the work queue.
//!
//! ```text
//!                 ┌──────────┐
//!            ┌───▶│ worker 0 │──┐
//! WorkQueue ─┼───▶│ worker 1 │──┼──▶ PostCollector
//! (closed)   └───▶│ worker N │──┘
//!                 └────┬─────┘
//!                      │ done() × item
//!                      ▼
//!              CompletionBarrier
//! ```
//!
//! Each received item signals the barrier exactly once. Items with a
//! non-markdown extension are discarded; a markdown file that can't be read
//! or parsed fails the whole build and cancels the remaining workers.

use super::{CancelToken, CompletionBarrier, PostCollector};
use crate::{
    error::{BuildError, IoContext, Result},
    post,
};
use parking_lot::Mutex;
use std::{
    fs,
    num::NonZeroUsize,
    path::PathBuf,
    sync::mpsc::{self, Receiver},
    thread::{self, Scope},
};

/// One directory entry under the markdown source root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    /// Position in the queue, used as the post's insertion order.
    pub position: usize,
    pub path: PathBuf,
    pub file_name: String,
}

/// Single-producer, multi-consumer queue, loaded and closed before any
/// worker starts.
#[derive(Debug)]
pub struct WorkQueue {
    rx: Mutex<Receiver<WorkItem>>,
}

impl WorkQueue {
    pub fn preload(items: impl IntoIterator<Item = WorkItem>) -> Self {
        let (tx, rx) = mpsc::channel();
        for item in items {
            // Receiver is alive in this scope, send can't fail
            let _ = tx.send(item);
        }
        // Closing the sender lets workers observe exhaustion
        drop(tx);
        Self { rx: Mutex::new(rx) }
    }

    /// Next item, or `None` once the queue is drained.
    pub fn next(&self) -> Option<WorkItem> {
        self.rx.lock().recv().ok()
    }
}

/// Number of workers for `file_count` items.
///
/// `configured == 0` means one per available CPU. Never more workers than
/// files, never zero workers for a non-empty queue.
pub fn worker_limit(file_count: usize, configured: usize) -> usize {
    let max = match configured {
        0 => thread::available_parallelism().map_or(1, NonZeroUsize::get),
        n => n,
    };
    file_count.min(max)
}

pub struct WorkerPool<'a> {
    collector: &'a PostCollector,
    barrier: &'a CompletionBarrier,
    cancel: CancelToken,
    failure: Mutex<Option<BuildError>>,
}

impl<'a> WorkerPool<'a> {
    pub fn new(
        collector: &'a PostCollector,
        barrier: &'a CompletionBarrier,
        cancel: CancelToken,
    ) -> Self {
        Self {
            collector,
            barrier,
            cancel,
            failure: Mutex::new(None),
        }
    }

    /// Spawn `workers` threads on `scope`, all draining `queue`.
    pub fn spawn<'scope, 'env>(
        &'env self,
        scope: &'scope Scope<'scope, 'env>,
        queue: &'env WorkQueue,
        workers: usize,
    ) {
        for _ in 0..workers {
            scope.spawn(move || self.work(queue));
        }
    }

    /// The first error any worker hit, if one did.
    pub fn finish(self) -> Result<()> {
        match self.failure.into_inner() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn work(&self, queue: &WorkQueue) {
        loop {
            // Items still queued were never handed to a worker: no signal owed
            if self.cancel.is_cancelled() {
                return;
            }
            let Some(item) = queue.next() else {
                return;
            };

            if let Err(err) = self.process(&item) {
                self.fail(err);
            }
            self.barrier.done();
        }
    }

    fn process(&self, item: &WorkItem) -> Result<()> {
        if !post::is_markdown(&item.path) {
            return Ok(());
        }

        let content = fs::read_to_string(&item.path).at(&item.path)?;
        let post = post::extract(&item.file_name, &content)?;
        self.collector.add_at(item.position, post);
        Ok(())
    }

    /// Keep the first failure, stop the other workers and wake the waiter.
    fn fail(&self, err: BuildError) {
        self.failure.lock().get_or_insert(err);
        self.cancel.cancel();
        self.barrier.wake();
    }
}
