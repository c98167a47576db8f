//! async-http - declarative HTTP request orchestration
//!
//! Elements declare their request behavior through namespaced attributes
//! (`async-url`, `async-target`, `async-poll`, ...); the engine resolves
//! those declarations into immutable request configurations, serializes
//! execution through a single-flight FIFO queue, renders responses into
//! target elements, and drives per-element polling machines.
//!
//! # Core Concepts
//!
//! - **Declarative Config**: Attributes, seeded defaults, and caller
//!   overrides merge into one [`options::RequestConfig`] per request
//! - **Single Flight**: One process-wide queue, strict FIFO, at most one
//!   request against the transport at a time
//! - **Pluggable Seams**: Transport, element tree, and confirmation
//!   dialogs are host-supplied trait objects
//! - **Typed Events**: Every lifecycle step publishes a
//!   [`events::RequestEvent`] on a broadcast bus
//!
//! # Modules
//!
//! - [`orchestrator`] - the [`AsyncHttp`] engine facade
//! - [`options`] - attribute scanning and config resolution
//! - [`scheduler`] - the single-flight FIFO queue
//! - [`poll`] - per-element polling state machines
//! - [`request`] - the queued request lifecycle
//! - [`render`] - response rendering strategies
//! - [`confirm`] - the pre-request confirmation gate
//! - [`actions`] - declarative post-completion actions
//! - [`transport`] - the HTTP seam and its reqwest implementation
//! - [`element`] - the element tree seam and an in-memory implementation

pub mod actions;
pub mod confirm;
pub mod defaults;
pub mod element;
pub mod events;
pub mod options;
pub mod orchestrator;
pub mod poll;
pub mod render;
pub mod request;
pub mod scheduler;
pub mod transport;

// Re-export commonly used types
pub use actions::{Action, ActionRegistry, parse_actions};
pub use confirm::{AutoConfirm, ConfirmHandler, StaticConfirm};
pub use defaults::{Defaults, Texts};
pub use element::{Element, ElementRef, MemoryElement};
pub use events::{EventBus, EventEmitter, ProgressDirection, RequestEvent};
pub use options::{ConfigError, RequestConfig, RequestOverrides};
pub use orchestrator::{AsyncHttp, AsyncHttpBuilder};
pub use poll::PollStatus;
pub use render::{RenderError, RenderMethod};
pub use request::{RequestError, RequestHandle};
pub use scheduler::{QueueEntry, QueueStats, Scheduler};
pub use transport::{
    AbortHandle, AbortSignal, HttpTransport, ProgressSink, StaticTransport, Transport,
    TransportError, TransportRequest, TransportResponse, abort_pair,
};
