//! Polling state machine
//!
//! One timer task per polled element, re-armed with `tokio::time::sleep`.
//! Each fire either skips (paused), stops (repeat limit reached), or
//! spawns a brand-new request against the same element. Configuration is
//! re-resolved on every tick, so attribute edits between ticks take
//! effect; the interval and repeat limit are fixed by the request that
//! armed the machine.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::{debug, warn};

use crate::element::ElementRef;
use crate::events::EventEmitter;
use crate::options::RequestOverrides;
use crate::orchestrator::AsyncHttp;

/// Snapshot of one element's poll state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollStatus {
    pub executions: u32,
    pub paused: bool,
}

#[derive(Default)]
struct PollShared {
    executions: u32,
    paused: bool,
    /// Whether a timer task is live for this element
    active: bool,
}

enum Tick {
    Skip(u32),
    Stop(u32),
    Fire(u32),
}

/// Per-element poll state, keyed by element key
pub struct Poller {
    states: Mutex<HashMap<String, PollShared>>,
}

impl Poller {
    pub(crate) fn new() -> Self {
        Self {
            states: Mutex::new(HashMap::new()),
        }
    }

    /// Arm the polling timer for an element
    ///
    /// A no-op while a timer is already live for this element: poll-spawned
    /// requests re-resolve the same attributes, and only one machine may
    /// exist per element.
    pub(crate) fn start(
        &self,
        engine: Arc<AsyncHttp>,
        element: ElementRef,
        interval: Duration,
        max_repeats: Option<u32>,
    ) {
        let key = element.key();
        {
            let mut states = self.states.lock().expect("poll state poisoned");
            let entry = states.entry(key.clone()).or_default();
            if entry.active {
                debug!(element = %key, "Poller::start: already polling, no-op");
                return;
            }
            entry.active = true;
        }
        debug!(element = %key, ?interval, ?max_repeats, "Poller::start: arming");

        let emitter = engine.events.emitter_for(key.clone());
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;

                let tick = {
                    let mut states = engine.poller.states.lock().expect("poll state poisoned");
                    let entry = states.entry(key.clone()).or_default();
                    let tick = if entry.paused {
                        Tick::Skip(entry.executions)
                    } else if max_repeats.is_some_and(|max| entry.executions >= max) {
                        Tick::Stop(entry.executions)
                    } else {
                        entry.executions += 1;
                        Tick::Fire(entry.executions)
                    };
                    if matches!(tick, Tick::Stop(_)) {
                        states.remove(&key);
                    }
                    tick
                };

                match tick {
                    Tick::Skip(executions) => {
                        debug!(element = %key, executions, "Poller: tick skipped (paused)");
                        emitter.poll(executions, true);
                    }
                    Tick::Stop(executions) => {
                        debug!(element = %key, executions, "Poller: repeat limit reached, stopping");
                        emitter.poll(executions, false);
                        break;
                    }
                    Tick::Fire(executions) => {
                        if let Err(e) = engine.request(&element, RequestOverrides::default()) {
                            warn!(element = %key, error = %e, "Poller: tick request failed");
                        }
                        emitter.poll(executions, false);
                    }
                }
            }
        });
    }

    /// Flip the pause flag for an element
    ///
    /// Does not cancel the timer; it only changes the branch taken on the
    /// next fire. Works before polling starts: the flag is kept for when a
    /// machine is armed.
    pub(crate) fn toggle_pause(&self, key: &str, emitter: &EventEmitter) -> bool {
        let paused = {
            let mut states = self.states.lock().expect("poll state poisoned");
            let entry = states.entry(key.to_string()).or_default();
            entry.paused = !entry.paused;
            entry.paused
        };
        debug!(element = %key, paused, "Poller::toggle_pause");
        emitter.poll_paused(paused);
        paused
    }

    /// Current poll state for an element, if any
    pub(crate) fn status(&self, key: &str) -> Option<PollStatus> {
        self.states
            .lock()
            .expect("poll state poisoned")
            .get(key)
            .map(|s| PollStatus {
                executions: s.executions,
                paused: s.paused,
            })
    }
}
