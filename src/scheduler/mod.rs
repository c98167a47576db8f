//! Request queue scheduling
//!
//! Strict FIFO, at most one request in flight across the whole engine.

mod core;
mod queue;

pub use core::Scheduler;
pub use queue::{QueueEntry, QueueStats};
