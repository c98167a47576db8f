//! Engine facade
//!
//! [`AsyncHttp`] owns the collaborators (transport, confirmation handler)
//! and the engine internals (scheduler, poller, event bus, action
//! registry, seeded defaults). Hosts build one instance per document root
//! and drive everything through it: trigger requests, arm polling, cancel
//! the in-flight request, and subscribe to lifecycle events.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::oneshot;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::actions::ActionRegistry;
use crate::confirm::{self, AutoConfirm, ConfirmHandler};
use crate::defaults::Defaults;
use crate::element::ElementRef;
use crate::events::EventBus;
use crate::options::{self, ConfigError, RequestOverrides};
use crate::poll::{PollStatus, Poller};
use crate::request::{PendingRequest, RequestError, RequestHandle, RequestMode};
use crate::scheduler::{QueueEntry, QueueStats, Scheduler};
use crate::transport::{AbortHandle, Transport, abort_pair};

/// The request orchestration engine
pub struct AsyncHttp {
    pub(crate) root: ElementRef,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) confirm: Arc<dyn ConfirmHandler>,
    pub(crate) defaults: Defaults,
    pub(crate) events: Arc<EventBus>,
    pub(crate) scheduler: Arc<Scheduler>,
    pub(crate) poller: Poller,
    pub(crate) actions: ActionRegistry,
}

/// Builder for [`AsyncHttp`]
pub struct AsyncHttpBuilder {
    root: ElementRef,
    transport: Arc<dyn Transport>,
    confirm: Arc<dyn ConfirmHandler>,
    defaults: Defaults,
}

impl AsyncHttpBuilder {
    /// Replace the confirmation handler (defaults to [`AutoConfirm`])
    pub fn confirm_handler(mut self, handler: Arc<dyn ConfirmHandler>) -> Self {
        self.confirm = handler;
        self
    }

    /// Replace the seeded defaults wholesale
    pub fn defaults(mut self, defaults: Defaults) -> Self {
        self.defaults = defaults;
        self
    }

    /// Seed defaults from host metadata `(name, content)` entries
    pub fn meta_defaults<'a, I>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        self.defaults.seed_from_meta(entries);
        self
    }

    pub fn build(self) -> Arc<AsyncHttp> {
        let events = Arc::new(EventBus::with_default_capacity());
        info!("AsyncHttpBuilder::build: engine ready");
        Arc::new(AsyncHttp {
            root: self.root,
            transport: self.transport,
            confirm: self.confirm,
            defaults: self.defaults,
            scheduler: Arc::new(Scheduler::new(events.clone())),
            events,
            poller: Poller::new(),
            actions: ActionRegistry::new(),
        })
    }
}

impl AsyncHttp {
    pub fn builder(root: ElementRef, transport: Arc<dyn Transport>) -> AsyncHttpBuilder {
        AsyncHttpBuilder {
            root,
            transport,
            confirm: Arc::new(AutoConfirm),
            defaults: Defaults::default(),
        }
    }

    /// Build an engine with default collaborators
    pub fn new(root: ElementRef, transport: Arc<dyn Transport>) -> Arc<Self> {
        Self::builder(root, transport).build()
    }

    /// The lifecycle event bus
    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    /// The seeded defaults this engine resolves against
    pub fn defaults(&self) -> &Defaults {
        &self.defaults
    }

    /// The post-completion action registry
    pub fn actions(&self) -> &ActionRegistry {
        &self.actions
    }

    /// Scheduler counters
    pub fn queue_stats(&self) -> QueueStats {
        self.scheduler.stats()
    }

    /// Trigger a request from an element
    ///
    /// Resolves configuration synchronously (resolution failures are
    /// returned, nothing is queued), then runs the confirmation gate and
    /// hands the request to the FIFO queue. The returned handle settles
    /// when the request does; dropping it detaches from the outcome
    /// without canceling anything. A poll-configured request also arms the
    /// polling machine for its element.
    pub fn request(
        self: &Arc<Self>,
        element: &ElementRef,
        overrides: RequestOverrides,
    ) -> Result<RequestHandle, ConfigError> {
        let config = options::resolve(element, &self.defaults, &overrides, &self.root)?;
        let id = Uuid::now_v7().to_string();
        debug!(request_id = %id, element = %element.key(), "AsyncHttp::request: accepted");

        let emitter = self.events.emitter_for(element.key());
        emitter.started(config.clone());

        if let Some(interval) = config.poll_interval {
            self.poller
                .start(self.clone(), element.clone(), interval, config.poll_max_repeats);
        }

        let (tx, rx) = oneshot::channel();
        let (abort_handle, abort_signal) = abort_pair();
        let pending = PendingRequest {
            id: id.clone(),
            config: config.clone(),
            mode: RequestMode::Perform,
            emitter,
            abort: abort_signal,
            tx,
        };

        let engine = self.clone();
        if pending.config.confirm.is_some() {
            // The gate may await the host, so it runs off the caller's
            // stack; the entry joins the queue only after the gate settles.
            tokio::spawn(async move {
                let mut pending = pending;
                let confirmed =
                    confirm::maybe_confirm(pending.config.confirm.as_deref(), &engine.confirm).await;
                pending.emitter.confirmed(confirmed);
                if !confirmed {
                    debug!(request_id = %pending.id, "AsyncHttp::request: declined, queuing as no-op");
                    pending.mode = RequestMode::Skip;
                }
                let entry = Self::queue_entry(engine.clone(), pending, abort_handle);
                engine.scheduler.enqueue(entry);
            });
        } else {
            // No gate: enqueue before returning, so back-to-back
            // constructions keep their order in the queue.
            let entry = Self::queue_entry(engine.clone(), pending, abort_handle);
            engine.scheduler.enqueue(entry);
        }

        Ok(RequestHandle::new(id, config, rx))
    }

    fn queue_entry(engine: Arc<Self>, pending: PendingRequest, abort: AbortHandle) -> QueueEntry {
        QueueEntry::new(
            pending.id.clone(),
            pending.emitter.element().to_string(),
            abort,
            async move { pending.execute(engine).await },
        )
    }

    /// Fetch a url into an element and resolve with the response body
    ///
    /// Convenience wrapper over [`request`](Self::request): marks the
    /// element as an autoload container for `url`, waits for the request
    /// to settle, and emits a `LoadDone` event alongside the result. The
    /// event fires on every successful settle, with no payload when the
    /// confirmation gate declined the request.
    pub async fn load(
        self: &Arc<Self>,
        element: &ElementRef,
        url: &str,
    ) -> Result<Option<String>, RequestError> {
        element.set_attribute("async-autoload", url);
        let emitter = self.events.emitter_for(element.key());

        let handle = self.request(element, RequestOverrides::default())?;
        let result = handle.wait().await?;
        emitter.load_done(result.as_deref());
        Ok(result)
    }

    /// Trigger a request for every autoload element under `context`
    ///
    /// Returns the number of requests spawned. Elements whose resolution
    /// fails are logged and skipped.
    pub fn process_autoloads(self: &Arc<Self>, context: &ElementRef) -> usize {
        let mut seen = HashSet::new();
        let mut spawned = 0;
        for el in context.find("[async-autoload], [data-async-autoload]") {
            if !seen.insert(el.key()) {
                continue;
            }
            match self.request(&el, RequestOverrides::default()) {
                Ok(_) => spawned += 1,
                Err(e) => {
                    warn!(element = %el.key(), error = %e, "AsyncHttp::process_autoloads: skipping");
                }
            }
        }
        debug!(context = %context.key(), spawned, "AsyncHttp::process_autoloads: done");
        spawned
    }

    /// Abort the in-flight request, if any
    pub fn cancel_current(&self) {
        self.scheduler.cancel_current();
    }

    /// Flip the poll pause flag for an element; returns the new flag
    pub fn toggle_poll_state(&self, element: &ElementRef) -> bool {
        let key = element.key();
        let emitter = self.events.emitter_for(key.clone());
        self.poller.toggle_pause(&key, &emitter)
    }

    /// Poll state for an element, if it has one
    pub fn poll_status(&self, element: &ElementRef) -> Option<PollStatus> {
        self.poller.status(&element.key())
    }

    /// Whether a live request currently occupies the flight slot
    ///
    /// Flips false the moment the in-flight request is canceled, before
    /// its job settles. Hosts gate page exit on this, pairing it with
    /// [`confirm_exit_text`](Self::confirm_exit_text).
    pub fn has_active_request(&self) -> bool {
        self.scheduler.has_current()
    }

    /// The seeded exit-confirmation prompt
    pub fn confirm_exit_text(&self) -> &str {
        &self.defaults.texts.confirm_exit
    }
}
