//! Single-flight FIFO scheduler
//!
//! One scheduler instance serializes every request in the engine: entries
//! run strictly in enqueue order, at most one at a time. Enqueueing is
//! synchronous, so entries from back-to-back constructions enter the
//! queue in construction order regardless of task scheduling. The drain
//! cycle is idempotent against re-entry (guarded by the `running` flag)
//! so it can be kicked opportunistically after both enqueue and
//! completion.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, error};

use crate::events::EventBus;

use super::queue::{CurrentEntry, QueueEntry, QueueStats};

struct SchedulerInner {
    queue: VecDeque<QueueEntry>,
    running: bool,
    current: Option<CurrentEntry>,
    stats: QueueStats,
}

/// The process-wide request queue
///
/// Inner state sits behind a std mutex, never held across an await.
pub struct Scheduler {
    inner: Mutex<SchedulerInner>,
    events: Arc<EventBus>,
}

impl Scheduler {
    pub fn new(events: Arc<EventBus>) -> Self {
        Self {
            inner: Mutex::new(SchedulerInner {
                queue: VecDeque::new(),
                running: false,
                current: None,
                stats: QueueStats::default(),
            }),
            events,
        }
    }

    fn lock(&self) -> MutexGuard<'_, SchedulerInner> {
        self.inner.lock().expect("scheduler state poisoned")
    }

    /// Push an entry onto the queue and kick the drain cycle
    ///
    /// The push completes before this returns; only the drain runs as a
    /// spawned task.
    pub fn enqueue(self: &Arc<Self>, entry: QueueEntry) {
        debug!(request_id = %entry.request_id, element = %entry.element, "Scheduler::enqueue: called");
        {
            let mut inner = self.lock();
            inner.queue.push_back(entry);
            inner.stats.total_enqueued += 1;
            let depth = inner.queue.len();
            inner.stats.peak_depth = inner.stats.peak_depth.max(depth);
        }
        let scheduler = self.clone();
        tokio::spawn(async move {
            scheduler.run_next().await;
        });
    }

    /// Drain the queue, one entry at a time
    ///
    /// A call while an entry is already running is a no-op; when the queue
    /// empties the scheduler goes dormant until the next enqueue. An entry
    /// that fails is logged here and never stops the drain.
    pub async fn run_next(self: &Arc<Self>) {
        loop {
            let entry = {
                let mut inner = self.lock();
                if inner.running {
                    debug!("Scheduler::run_next: already running, no-op");
                    return;
                }
                let Some(entry) = inner.queue.pop_front() else {
                    inner.running = false;
                    inner.current = None;
                    debug!("Scheduler::run_next: queue empty, going dormant");
                    return;
                };
                inner.running = true;
                inner.current = Some(CurrentEntry {
                    request_id: entry.request_id.clone(),
                    element: entry.element.clone(),
                    abort: entry.abort.clone(),
                });
                entry
            };

            debug!(request_id = %entry.request_id, "Scheduler::run_next: executing");
            let result = entry.job.await;

            {
                let mut inner = self.lock();
                inner.running = false;
                inner.current = None;
                inner.stats.total_completed += 1;
                if result.is_err() {
                    inner.stats.total_failed += 1;
                }
            }

            if let Err(e) = result {
                error!(request_id = %entry.request_id, error = %e, "Scheduler::run_next: request execution failed");
            }
        }
    }

    /// Abort the in-flight request, if any
    ///
    /// Forwards the abort signal to the running entry and clears the
    /// current slot immediately; the aborted job still settles on its own.
    /// Queued-but-not-started entries are untouched and will still run in
    /// order; canceling those is not supported.
    pub fn cancel_current(&self) {
        let current = self.lock().current.take();
        match current {
            Some(current) => {
                debug!(request_id = %current.request_id, "Scheduler::cancel_current: aborting");
                current.abort.abort();
                self.events.emitter_for(current.element).aborted();
            }
            None => debug!("Scheduler::cancel_current: nothing in flight"),
        }
    }

    /// Whether the drain cycle is mid-entry (true until the job settles)
    pub fn is_running(&self) -> bool {
        self.lock().running
    }

    /// Whether an uncanceled entry occupies the flight slot
    ///
    /// Unlike [`is_running`](Self::is_running) this flips false the moment
    /// the current entry is canceled.
    pub fn has_current(&self) -> bool {
        self.lock().current.is_some()
    }

    /// Entries waiting behind the current one
    pub fn queue_len(&self) -> usize {
        self.lock().queue.len()
    }

    pub fn stats(&self) -> QueueStats {
        self.lock().stats.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::abort_pair;
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    fn scheduler() -> Arc<Scheduler> {
        Arc::new(Scheduler::new(Arc::new(EventBus::with_default_capacity())))
    }

    fn recording_entry(
        id: &str,
        log: Arc<StdMutex<Vec<String>>>,
        delay: Duration,
    ) -> QueueEntry {
        let (handle, _signal) = abort_pair();
        let id_owned = id.to_string();
        QueueEntry::new(id, "el", handle, async move {
            tokio::time::sleep(delay).await;
            log.lock().unwrap().push(id_owned);
            Ok(())
        })
    }

    #[tokio::test]
    async fn test_fifo_completion_order() {
        let scheduler = scheduler();
        let log = Arc::new(StdMutex::new(Vec::new()));

        for id in ["a", "b", "c"] {
            scheduler.enqueue(recording_entry(id, log.clone(), Duration::from_millis(10)));
        }

        // Wait for the queue to drain.
        for _ in 0..100 {
            tokio::time::sleep(Duration::from_millis(10)).await;
            if log.lock().unwrap().len() == 3 {
                break;
            }
        }
        assert_eq!(*log.lock().unwrap(), vec!["a", "b", "c"]);

        let stats = scheduler.stats();
        assert_eq!(stats.total_enqueued, 3);
        assert_eq!(stats.total_completed, 3);
    }

    #[tokio::test]
    async fn test_single_flight() {
        let scheduler = scheduler();
        let in_flight = Arc::new(StdMutex::new((0usize, 0usize))); // (current, peak)

        for _ in 0..4 {
            let in_flight = in_flight.clone();
            let (handle, _signal) = abort_pair();
            scheduler.enqueue(QueueEntry::new("r", "el", handle, async move {
                {
                    let mut guard = in_flight.lock().unwrap();
                    guard.0 += 1;
                    guard.1 = guard.1.max(guard.0);
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
                in_flight.lock().unwrap().0 -= 1;
                Ok(())
            }));
        }

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(in_flight.lock().unwrap().1, 1);
    }

    #[tokio::test]
    async fn test_enqueue_is_synchronous() {
        let scheduler = scheduler();
        let log = Arc::new(StdMutex::new(Vec::new()));

        // Both pushes land before any spawned drain task gets to run.
        scheduler.enqueue(recording_entry("a", log.clone(), Duration::ZERO));
        scheduler.enqueue(recording_entry("b", log.clone(), Duration::ZERO));
        assert_eq!(scheduler.stats().total_enqueued, 2);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(*log.lock().unwrap(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_run_next_idempotent_while_running() {
        let scheduler = scheduler();
        let log = Arc::new(StdMutex::new(Vec::new()));

        scheduler.enqueue(recording_entry("slow", log.clone(), Duration::from_millis(50)));
        scheduler.enqueue(recording_entry("next", log.clone(), Duration::ZERO));

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(scheduler.is_running());
        let depth_before = scheduler.queue_len();

        // Extra drain calls while running must not touch the queue.
        scheduler.run_next().await;
        scheduler.run_next().await;
        assert_eq!(scheduler.queue_len(), depth_before);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(*log.lock().unwrap(), vec!["slow", "next"]);
    }

    #[tokio::test]
    async fn test_failed_entry_does_not_stall_queue() {
        let scheduler = scheduler();
        let log = Arc::new(StdMutex::new(Vec::new()));

        let (handle, _signal) = abort_pair();
        scheduler.enqueue(QueueEntry::new("bad", "el", handle, async {
            Err(eyre::eyre!("boom"))
        }));
        scheduler.enqueue(recording_entry("good", log.clone(), Duration::ZERO));

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(*log.lock().unwrap(), vec!["good"]);

        let stats = scheduler.stats();
        assert_eq!(stats.total_failed, 1);
        assert_eq!(stats.total_completed, 2);
    }

    #[tokio::test]
    async fn test_cancel_current_aborts_and_clears() {
        let scheduler = scheduler();
        let (handle, mut signal) = abort_pair();

        scheduler.enqueue(QueueEntry::new("inflight", "el", handle, async move {
            signal.aborted().await;
            Ok(())
        }));

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(scheduler.is_running());
        assert!(scheduler.has_current());

        scheduler.cancel_current();
        // The slot clears immediately, before the aborted job settles.
        assert!(!scheduler.has_current());

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!scheduler.is_running());
    }

    #[tokio::test]
    async fn test_cancel_with_nothing_running() {
        let scheduler = scheduler();
        scheduler.cancel_current();
        assert!(!scheduler.is_running());
        assert!(!scheduler.has_current());
    }
}
