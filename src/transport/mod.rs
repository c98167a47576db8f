//! Transport collaborator
//!
//! The engine hands a fully resolved [`TransportRequest`] to whatever
//! implements [`Transport`] and awaits the outcome. Cancellation is
//! forward-only: an [`AbortSignal`] travels with the request and a
//! well-behaved transport stops work when it fires. Progress flows back
//! through a [`ProgressSink`] as typed events.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::watch;

use crate::events::{EventEmitter, ProgressDirection};

pub mod http;

pub use http::HttpTransport;

/// Errors from the transport layer
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request aborted")]
    Aborted,

    #[error("HTTP {status}")]
    Status { status: u16, body: String },

    #[error("invalid method: {0:?}")]
    Method(String),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}

/// Fire the paired [`AbortSignal`]
#[derive(Clone)]
pub struct AbortHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl AbortHandle {
    /// Signal the transport to stop; best effort, forward only
    pub fn abort(&self) {
        let _ = self.tx.send(true);
    }
}

/// Observed by the transport while a request is in flight
#[derive(Clone)]
pub struct AbortSignal {
    rx: watch::Receiver<bool>,
}

impl AbortSignal {
    /// Whether abort has been requested
    pub fn is_aborted(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve when abort is requested; pends forever otherwise
    pub async fn aborted(&mut self) {
        loop {
            if *self.rx.borrow() {
                return;
            }
            if self.rx.changed().await.is_err() {
                // Handle dropped without firing: never aborts.
                std::future::pending::<()>().await;
            }
        }
    }
}

/// Create a connected abort handle/signal pair
pub fn abort_pair() -> (AbortHandle, AbortSignal) {
    let (tx, rx) = watch::channel(false);
    (AbortHandle { tx: Arc::new(tx) }, AbortSignal { rx })
}

/// Progress reporting channel handed to the transport
#[derive(Clone)]
pub struct ProgressSink {
    emitter: EventEmitter,
}

impl ProgressSink {
    pub fn new(emitter: EventEmitter) -> Self {
        Self { emitter }
    }

    /// Report upload progress as a percentage
    pub fn upload(&self, percent: f64) {
        self.emitter.progress(ProgressDirection::Upload, percent);
    }

    /// Report download progress as a percentage
    pub fn download(&self, percent: f64) {
        self.emitter.progress(ProgressDirection::Download, percent);
    }
}

/// One outgoing request, fully resolved
pub struct TransportRequest {
    pub url: String,
    pub method: String,
    pub body: Option<String>,
    /// Unrecognized attribute-derived keys, passed through untouched
    pub extra: BTreeMap<String, Value>,
    pub abort: AbortSignal,
    pub progress: ProgressSink,
}

/// Response body and status from the transport
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

/// The HTTP transport seam
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform one request to completion, honoring the abort signal
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError>;
}

/// Fixed-response transport for tests and offline hosts
///
/// Returns the configured body (or failure) after an optional latency,
/// records every request it sees, and tracks how many sends were in
/// flight at once.
pub struct StaticTransport {
    body: String,
    fail_status: Option<u16>,
    latency: std::time::Duration,
    calls: std::sync::Mutex<Vec<(String, String, Option<String>)>>,
    in_flight: std::sync::atomic::AtomicUsize,
    peak_in_flight: std::sync::atomic::AtomicUsize,
}

impl StaticTransport {
    pub fn new(body: &str) -> Self {
        Self {
            body: body.to_string(),
            fail_status: None,
            latency: std::time::Duration::ZERO,
            calls: std::sync::Mutex::new(Vec::new()),
            in_flight: std::sync::atomic::AtomicUsize::new(0),
            peak_in_flight: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    /// Respond only after the given delay
    pub fn with_latency(mut self, latency: std::time::Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Fail every request with the given HTTP status
    pub fn failing(mut self, status: u16) -> Self {
        self.fail_status = Some(status);
        self
    }

    /// Requests seen so far as (method, url, body)
    pub fn calls(&self) -> Vec<(String, String, Option<String>)> {
        self.calls.lock().expect("transport call log poisoned").clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().expect("transport call log poisoned").len()
    }

    /// Highest number of concurrent sends observed
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for StaticTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        use std::sync::atomic::Ordering;

        self.calls
            .lock()
            .expect("transport call log poisoned")
            .push((request.method.clone(), request.url.clone(), request.body.clone()));

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(current, Ordering::SeqCst);

        let mut abort = request.abort.clone();
        let outcome = tokio::select! {
            _ = tokio::time::sleep(self.latency) => match self.fail_status {
                Some(status) => Err(TransportError::Status {
                    status,
                    body: self.body.clone(),
                }),
                None => Ok(TransportResponse {
                    status: 200,
                    body: self.body.clone(),
                }),
            },
            _ = abort.aborted() => Err(TransportError::Aborted),
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        if outcome.is_ok() {
            request.progress.download(100.0);
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventBus;
    use std::time::Duration;

    fn request(abort: AbortSignal) -> TransportRequest {
        let bus = EventBus::with_default_capacity();
        TransportRequest {
            url: "/x".to_string(),
            method: "get".to_string(),
            body: None,
            extra: BTreeMap::new(),
            abort,
            progress: ProgressSink::new(bus.emitter_for("el")),
        }
    }

    #[tokio::test]
    async fn test_static_transport_returns_body() {
        let transport = StaticTransport::new("hello");
        let (_handle, signal) = abort_pair();

        let response = transport.send(request(signal)).await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.body, "hello");
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn test_static_transport_failure() {
        let transport = StaticTransport::new("boom").failing(500);
        let (_handle, signal) = abort_pair();

        let err = transport.send(request(signal)).await.unwrap_err();
        assert!(matches!(err, TransportError::Status { status: 500, .. }));
    }

    #[tokio::test]
    async fn test_abort_interrupts_send() {
        let transport = StaticTransport::new("slow").with_latency(Duration::from_secs(60));
        let (handle, signal) = abort_pair();

        let send = transport.send(request(signal));
        tokio::pin!(send);

        // Let the send start, then abort it.
        tokio::select! {
            _ = &mut send => panic!("send should still be waiting"),
            _ = tokio::time::sleep(Duration::from_millis(20)) => handle.abort(),
        }

        let err = send.await.unwrap_err();
        assert!(matches!(err, TransportError::Aborted));
    }

    #[tokio::test]
    async fn test_abort_signal_state() {
        let (handle, signal) = abort_pair();
        assert!(!signal.is_aborted());
        handle.abort();
        assert!(signal.is_aborted());
    }
}
