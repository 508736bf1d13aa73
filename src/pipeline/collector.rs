//! Post Collector: the only state shared between workers.
//!
//! Workers only append. Reading happens through [`PostCollector::into_sorted`],
//! which consumes the collector; while workers hold a `&PostCollector` the
//! borrow checker keeps the sorted view out of reach, so sorting before the
//! barrier has released can't be expressed.

use crate::post::Post;
use parking_lot::Mutex;

#[derive(Debug)]
struct Entry {
    /// Insertion order. Breaks ties between posts sharing a date.
    position: usize,
    post: Post,
}

#[derive(Debug, Default)]
pub struct PostCollector {
    entries: Mutex<Vec<Entry>>,
}

impl PostCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a post with an explicit insertion order.
    ///
    /// The worker pool passes the work item's queue position, so ties are
    /// broken by dispatch order regardless of which worker finishes first.
    pub fn add_at(&self, position: usize, post: Post) {
        self.entries.lock().push(Entry { position, post });
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// All posts, newest first; equal dates keep insertion order.
    pub fn into_sorted(self) -> Vec<Post> {
        let mut entries = self.entries.into_inner();
        entries.sort_by_key(|entry| entry.position);
        // Stable: equal dates stay in insertion order
        entries.sort_by(|a, b| b.post.date.cmp(&a.post.date));
        entries.into_iter().map(|entry| entry.post).collect()
    }
}
