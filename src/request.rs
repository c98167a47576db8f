//! Request lifecycle
//!
//! A [`PendingRequest`] is the queued unit of work: it runs once the
//! scheduler grants it the flight slot, drives the transport, renders the
//! outcome, fires the declared post-actions, and settles the caller's
//! [`RequestHandle`]. A request declined at the confirmation gate still
//! travels the whole lifecycle in skip mode so indicators, terminal
//! events, and the queue all behave as if a no-op request had completed.

use thiserror::Error;
use tokio::sync::oneshot;
use tracing::debug;

use crate::events::EventEmitter;
use crate::options::{ConfigError, RequestConfig};
use crate::orchestrator::AsyncHttp;
use crate::render;
use crate::transport::{AbortSignal, ProgressSink, TransportError, TransportRequest};

/// Errors observable through a [`RequestHandle`]
#[derive(Debug, Error)]
pub enum RequestError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("request dropped before completion")]
    Dropped,
}

/// Caller-side handle to a queued request
///
/// Resolves with the response body once the request leaves the queue and
/// completes, or `Ok(None)` when the confirmation gate declined it.
pub struct RequestHandle {
    id: String,
    config: RequestConfig,
    rx: oneshot::Receiver<Result<Option<String>, RequestError>>,
}

impl RequestHandle {
    pub(crate) fn new(
        id: String,
        config: RequestConfig,
        rx: oneshot::Receiver<Result<Option<String>, RequestError>>,
    ) -> Self {
        Self { id, config, rx }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// The resolved configuration this request runs with
    pub fn config(&self) -> &RequestConfig {
        &self.config
    }

    /// Wait for the request to settle
    pub async fn wait(self) -> Result<Option<String>, RequestError> {
        self.rx.await.unwrap_or(Err(RequestError::Dropped))
    }
}

/// Whether the queued entry performs its transport call or no-ops
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RequestMode {
    Perform,
    Skip,
}

/// The queued unit of work behind one request
pub(crate) struct PendingRequest {
    pub id: String,
    pub config: RequestConfig,
    pub mode: RequestMode,
    pub emitter: EventEmitter,
    pub abort: AbortSignal,
    pub tx: oneshot::Sender<Result<Option<String>, RequestError>>,
}

impl PendingRequest {
    /// Run the request to completion inside the scheduler's flight slot
    ///
    /// Always returns `Ok`: transport failures are part of the lifecycle
    /// (rendered, reported, settled into the handle), never a scheduler
    /// error.
    pub(crate) async fn execute(self, engine: std::sync::Arc<AsyncHttp>) -> eyre::Result<()> {
        let Self {
            id,
            config,
            mode,
            emitter,
            abort,
            tx,
        } = self;
        debug!(request_id = %id, ?mode, "PendingRequest::execute: called");

        for indicator in &config.process_indicators {
            indicator.show();
        }

        let outcome = match mode {
            RequestMode::Skip => Ok(None),
            RequestMode::Perform => engine
                .transport
                .send(TransportRequest {
                    url: config.url.clone(),
                    method: config.method.clone(),
                    body: config.body.clone(),
                    extra: config.extra.clone(),
                    abort,
                    progress: ProgressSink::new(emitter.clone()),
                })
                .await
                .map(Some),
        };

        match outcome {
            Ok(response) => {
                render::apply(
                    config.render_method,
                    &config.target,
                    response.as_ref().map(|r| r.body.as_str()),
                );
                if let Some(spec) = &config.action_done {
                    let action_target = config
                        .action_target
                        .clone()
                        .unwrap_or_else(|| config.target.clone());
                    engine.actions.run(&action_target, spec);
                }
                engine.process_autoloads(&config.target);
                emitter.done(&id);
                let _ = tx.send(Ok(response.map(|r| r.body)));
            }
            Err(error) => {
                // Only an HTTP error response carries renderable content;
                // network failures and aborts leave the target untouched.
                let error_body = match &error {
                    TransportError::Status { body, .. } => Some(body.clone()),
                    _ => None,
                };
                render::apply(config.render_method, &config.target, error_body.as_deref());
                emitter.failed(&id, &error.to_string());
                let _ = tx.send(Err(error.into()));
            }
        }

        for indicator in &config.process_indicators {
            if indicator.is_attached() {
                indicator.hide();
            }
        }
        emitter.always(&id);
        Ok(())
    }
}
