//! Concurrent post ingestion.
//!
//! - **cancel**: cooperative cancellation token
//! - **barrier**: counting completion barrier
//! - **collector**: mutex-guarded post accumulator
//! - **pool**: bounded worker pool over a closed work queue
//!
//! # Flow
//!
//! ```text
//! read_dir() ──► WorkQueue ──► WorkerPool ──► PostCollector
//!                                  │                │
//!                                  ▼                ▼
//!                           CompletionBarrier ──► into_sorted()
//! ```

mod barrier;
mod cancel;
mod collector;
mod pool;

pub use barrier::{Completion, CompletionBarrier};
pub use cancel::CancelToken;
pub use collector::PostCollector;
pub use pool::{WorkItem, WorkQueue, WorkerPool, worker_limit};
