//! Event bus - pub/sub delivery of request lifecycle events
//!
//! Built on tokio broadcast channels: the engine emits, any number of host
//! consumers subscribe. Emission is fire-and-forget; with no subscribers
//! events are dropped.

use tokio::sync::broadcast;
use tracing::debug;

use super::types::{ProgressDirection, RequestEvent};
use crate::options::RequestConfig;

/// Default channel capacity (events)
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Central bus for request lifecycle events
pub struct EventBus {
    tx: broadcast::Sender<RequestEvent>,
}

impl EventBus {
    /// Create a new bus with the given capacity
    pub fn new(capacity: usize) -> Self {
        debug!(capacity, "EventBus::new: creating event bus");
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Create a new bus with default capacity
    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Emit an event to all subscribers
    pub fn emit(&self, event: RequestEvent) {
        debug!(
            event_type = event.event_type(),
            element = event.element(),
            "EventBus::emit"
        );
        // No subscribers is fine.
        let _ = self.tx.send(event);
    }

    /// Subscribe to events emitted after this call
    pub fn subscribe(&self) -> broadcast::Receiver<RequestEvent> {
        debug!("EventBus::subscribe: new subscriber");
        self.tx.subscribe()
    }

    /// Create an emitter bound to one element
    pub fn emitter_for(&self, element: impl Into<String>) -> EventEmitter {
        EventEmitter {
            tx: self.tx.clone(),
            element: element.into(),
        }
    }

    /// Number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

/// Cheap-to-clone handle for emitting events for one element
#[derive(Clone)]
pub struct EventEmitter {
    tx: broadcast::Sender<RequestEvent>,
    element: String,
}

impl EventEmitter {
    /// Key of the element this emitter is bound to
    pub fn element(&self) -> &str {
        &self.element
    }

    /// Emit a raw event
    pub fn emit(&self, event: RequestEvent) {
        debug!(event_type = event.event_type(), "EventEmitter::emit");
        let _ = self.tx.send(event);
    }

    pub fn started(&self, config: RequestConfig) {
        self.emit(RequestEvent::Started {
            element: self.element.clone(),
            config,
        });
    }

    pub fn confirmed(&self, confirmed: bool) {
        self.emit(RequestEvent::Confirmed {
            element: self.element.clone(),
            confirmed,
        });
    }

    pub fn done(&self, request_id: &str) {
        self.emit(RequestEvent::Done {
            element: self.element.clone(),
            request_id: request_id.to_string(),
        });
    }

    pub fn failed(&self, request_id: &str, error: &str) {
        self.emit(RequestEvent::Failed {
            element: self.element.clone(),
            request_id: request_id.to_string(),
            error: error.to_string(),
        });
    }

    pub fn always(&self, request_id: &str) {
        self.emit(RequestEvent::Always {
            element: self.element.clone(),
            request_id: request_id.to_string(),
        });
    }

    pub fn aborted(&self) {
        self.emit(RequestEvent::Aborted {
            element: self.element.clone(),
        });
    }

    pub fn progress(&self, direction: ProgressDirection, percent: f64) {
        self.emit(RequestEvent::Progress {
            element: self.element.clone(),
            direction,
            percent,
        });
    }

    pub fn poll(&self, executions: u32, paused: bool) {
        self.emit(RequestEvent::Poll {
            element: self.element.clone(),
            executions,
            paused,
        });
    }

    pub fn poll_paused(&self, paused: bool) {
        self.emit(RequestEvent::PollPaused {
            element: self.element.clone(),
            paused,
        });
    }

    pub fn load_done(&self, response: Option<&str>) {
        self.emit(RequestEvent::LoadDone {
            element: self.element.clone(),
            response: response.map(str::to_string),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bus_creation() {
        let bus = EventBus::new(16);
        assert_eq!(bus.subscriber_count(), 0);
        let _rx = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);
    }

    #[tokio::test]
    async fn test_emit_receive() {
        let bus = EventBus::with_default_capacity();
        let mut rx = bus.subscribe();

        let emitter = bus.emitter_for("el-1");
        emitter.confirmed(true);

        let event = rx.recv().await.unwrap();
        assert_eq!(event.element(), "el-1");
        assert!(matches!(event, RequestEvent::Confirmed { confirmed: true, .. }));
    }

    #[tokio::test]
    async fn test_emit_without_subscribers_is_ok() {
        let bus = EventBus::with_default_capacity();
        bus.emitter_for("el-1").aborted();
    }

    #[tokio::test]
    async fn test_multiple_subscribers_receive() {
        let bus = EventBus::with_default_capacity();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.emitter_for("el-9").poll(3, false);

        for rx in [&mut rx1, &mut rx2] {
            let event = rx.recv().await.unwrap();
            assert!(matches!(
                event,
                RequestEvent::Poll {
                    executions: 3,
                    paused: false,
                    ..
                }
            ));
        }
    }
}
