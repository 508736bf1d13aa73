//! Cooperative cancellation shared between the watch loop, the Ctrl+C
//! handler and the worker pool.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

/// A cloneable cancellation flag.
///
/// A child token observes its parent and every ancestor above it, but
/// cancelling the child leaves them untouched. Each build runs on a child of the process-wide token, so
/// a failing build stops its own workers without poisoning later rebuilds,
/// while Ctrl+C still reaches whatever build is in flight.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
    /// Flags of every ancestor, root first.
    ancestors: Arc<[Arc<AtomicBool>]>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn child(&self) -> Self {
        let ancestors = self
            .ancestors
            .iter()
            .chain([&self.flag])
            .cloned()
            .collect();
        Self {
            flag: Arc::new(AtomicBool::new(false)),
            ancestors,
        }
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
            || self
                .ancestors
                .iter()
                .any(|flag| flag.load(Ordering::SeqCst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_is_visible_to_clones() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn test_child_sees_parent() {
        let root = CancelToken::new();
        let child = root.child();
        root.cancel();
        assert!(child.is_cancelled());
    }

    #[test]
    fn test_grandchild_sees_root() {
        let root = CancelToken::new();
        let child = root.child();
        let grandchild = child.child();
        assert!(!grandchild.is_cancelled());

        root.cancel();
        assert!(grandchild.is_cancelled());
        assert!(grandchild.clone().child().is_cancelled());
    }

    #[test]
    fn test_middle_cancel_stops_descendants_only() {
        let root = CancelToken::new();
        let child = root.child();
        let grandchild = child.child();

        child.cancel();
        assert!(grandchild.is_cancelled());
        assert!(!root.is_cancelled());
    }

    #[test]
    fn test_child_cancel_does_not_reach_parent() {
        let root = CancelToken::new();
        let child = root.child();
        child.cancel();
        assert!(child.is_cancelled());
        assert!(!root.is_cancelled());
        assert!(!root.child().is_cancelled());
    }
}
