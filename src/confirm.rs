//! Confirmation gate
//!
//! Optionally intercepts execution to ask the host for confirmation before
//! a request is allowed to hit the transport. A declined request still
//! flows through the full completion pipeline as a no-op so indicators and
//! events behave uniformly.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

/// Host-supplied confirmation capability
#[async_trait]
pub trait ConfirmHandler: Send + Sync {
    /// Ask the user; arguments come from the `confirm` attribute
    async fn ask(&self, args: Vec<Value>) -> bool;
}

/// Default handler: confirms everything without asking
pub struct AutoConfirm;

#[async_trait]
impl ConfirmHandler for AutoConfirm {
    async fn ask(&self, _args: Vec<Value>) -> bool {
        true
    }
}

/// Fixed-answer handler for tests, with call counting
pub struct StaticConfirm {
    answer: bool,
    calls: AtomicUsize,
}

impl StaticConfirm {
    pub fn new(answer: bool) -> Self {
        Self {
            answer,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConfirmHandler for StaticConfirm {
    async fn ask(&self, _args: Vec<Value>) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.answer
    }
}

/// Parse a `confirm` attribute literal into handler arguments
///
/// Text beginning `{` or `[` is parsed as JSON; an array spreads as
/// positional arguments, any other JSON value is a single argument. Plain
/// text (or JSON that fails to parse) is a single string argument.
pub fn parse_confirm_args(spec: &str) -> Vec<Value> {
    let trimmed = spec.trim();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        match serde_json::from_str::<Value>(trimmed) {
            Ok(Value::Array(items)) => return items,
            Ok(value) => return vec![value],
            Err(e) => {
                warn!(error = %e, "parse_confirm_args: structured confirm spec unparseable, passing as text");
            }
        }
    }
    vec![Value::String(spec.to_string())]
}

/// Run the confirmation gate
///
/// No spec short-circuits to `true` without consulting the handler.
pub async fn maybe_confirm(spec: Option<&str>, handler: &Arc<dyn ConfirmHandler>) -> bool {
    let Some(spec) = spec else {
        return true;
    };
    debug!(%spec, "confirm::maybe_confirm: asking");
    let confirmed = handler.ask(parse_confirm_args(spec)).await;
    debug!(confirmed, "confirm::maybe_confirm: settled");
    confirmed
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_plain_text() {
        assert_eq!(
            parse_confirm_args("Really delete?"),
            vec![json!("Really delete?")]
        );
    }

    #[test]
    fn test_parse_json_array_spreads() {
        let args = parse_confirm_args(r#"["Delete?", "warning"]"#);
        assert_eq!(args, vec![json!("Delete?"), json!("warning")]);
    }

    #[test]
    fn test_parse_json_object_is_single_arg() {
        let args = parse_confirm_args(r#"{"title": "Sure?"}"#);
        assert_eq!(args, vec![json!({"title": "Sure?"})]);
    }

    #[test]
    fn test_parse_broken_json_falls_back_to_text() {
        let args = parse_confirm_args("{not json");
        assert_eq!(args, vec![json!("{not json")]);
    }

    #[tokio::test]
    async fn test_no_spec_short_circuits_without_asking() {
        let handler = Arc::new(StaticConfirm::new(false));
        let gate: Arc<dyn ConfirmHandler> = handler.clone();

        assert!(maybe_confirm(None, &gate).await);
        assert_eq!(handler.calls(), 0);
    }

    #[tokio::test]
    async fn test_spec_consults_handler() {
        let handler = Arc::new(StaticConfirm::new(false));
        let gate: Arc<dyn ConfirmHandler> = handler.clone();

        assert!(!maybe_confirm(Some("Sure?"), &gate).await);
        assert_eq!(handler.calls(), 1);
    }
}
