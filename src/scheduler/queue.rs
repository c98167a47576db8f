//! Queue types for the single-flight scheduler

use std::future::Future;

use futures::future::BoxFuture;

use crate::transport::AbortHandle;

/// One queued request execution
///
/// The scheduler owns an entry from enqueue until its job future resolves;
/// the job itself carries everything the request needs to run.
pub struct QueueEntry {
    pub request_id: String,
    pub element: String,
    pub abort: AbortHandle,
    pub(crate) job: BoxFuture<'static, eyre::Result<()>>,
}

impl QueueEntry {
    pub fn new<F>(request_id: impl Into<String>, element: impl Into<String>, abort: AbortHandle, job: F) -> Self
    where
        F: Future<Output = eyre::Result<()>> + Send + 'static,
    {
        Self {
            request_id: request_id.into(),
            element: element.into(),
            abort,
            job: Box::pin(job),
        }
    }
}

/// The entry currently occupying the single flight slot
#[derive(Clone)]
pub(crate) struct CurrentEntry {
    pub request_id: String,
    pub element: String,
    pub abort: AbortHandle,
}

/// Counters for observing scheduler behavior
#[derive(Debug, Default, Clone, serde::Serialize)]
pub struct QueueStats {
    pub total_enqueued: u64,
    pub total_completed: u64,
    pub total_failed: u64,
    pub peak_depth: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::abort_pair;

    #[test]
    fn test_queue_entry_construction() {
        let (handle, _signal) = abort_pair();
        let entry = QueueEntry::new("req-1", "el-1", handle, async { Ok(()) });
        assert_eq!(entry.request_id, "req-1");
        assert_eq!(entry.element, "el-1");
    }

    #[test]
    fn test_stats_default() {
        let stats = QueueStats::default();
        assert_eq!(stats.total_enqueued, 0);
        assert_eq!(stats.peak_depth, 0);
    }
}
