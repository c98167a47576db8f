//! Typed event delivery for request lifecycle observation

mod bus;
mod types;

pub use bus::{DEFAULT_CHANNEL_CAPACITY, EventBus, EventEmitter};
pub use types::{ProgressDirection, RequestEvent};
