//! Typed request lifecycle events
//!
//! One closed enum replaces the original's stringly-named side-channel
//! events: every state transition a host might observe is a variant here,
//! delivered through the broadcast bus. Each event carries the key of the
//! trigger element it belongs to.

use crate::options::RequestConfig;

/// Upload or download side of a progress report
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProgressDirection {
    Upload,
    Download,
}

/// The vocabulary of observable engine activity
#[derive(Clone, Debug)]
pub enum RequestEvent {
    /// A request was constructed; carries the resolved configuration
    Started { element: String, config: RequestConfig },

    /// The confirmation gate settled
    Confirmed { element: String, confirmed: bool },

    /// A request completed successfully
    Done { element: String, request_id: String },

    /// A request failed in transport
    Failed {
        element: String,
        request_id: String,
        error: String,
    },

    /// A request finished, regardless of outcome
    Always { element: String, request_id: String },

    /// The in-flight request was aborted
    Aborted { element: String },

    /// Transfer progress reported by the transport
    Progress {
        element: String,
        direction: ProgressDirection,
        percent: f64,
    },

    /// A poll timer fired (whether or not a request was spawned)
    Poll {
        element: String,
        executions: u32,
        paused: bool,
    },

    /// The poll pause flag changed
    PollPaused { element: String, paused: bool },

    /// A load helper call settled; no payload when the request was declined
    LoadDone {
        element: String,
        response: Option<String>,
    },
}

impl RequestEvent {
    /// Variant name, for logging and filtering
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Started { .. } => "Started",
            Self::Confirmed { .. } => "Confirmed",
            Self::Done { .. } => "Done",
            Self::Failed { .. } => "Failed",
            Self::Always { .. } => "Always",
            Self::Aborted { .. } => "Aborted",
            Self::Progress { .. } => "Progress",
            Self::Poll { .. } => "Poll",
            Self::PollPaused { .. } => "PollPaused",
            Self::LoadDone { .. } => "LoadDone",
        }
    }

    /// Key of the element this event belongs to
    pub fn element(&self) -> &str {
        match self {
            Self::Started { element, .. }
            | Self::Confirmed { element, .. }
            | Self::Done { element, .. }
            | Self::Failed { element, .. }
            | Self::Always { element, .. }
            | Self::Aborted { element }
            | Self::Progress { element, .. }
            | Self::Poll { element, .. }
            | Self::PollPaused { element, .. }
            | Self::LoadDone { element, .. } => element,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_accessors() {
        let event = RequestEvent::Confirmed {
            element: "el-1".to_string(),
            confirmed: false,
        };
        assert_eq!(event.event_type(), "Confirmed");
        assert_eq!(event.element(), "el-1");

        let event = RequestEvent::Poll {
            element: "el-2".to_string(),
            executions: 2,
            paused: true,
        };
        assert_eq!(event.event_type(), "Poll");
        assert_eq!(event.element(), "el-2");
    }
}
