//! Declarative post-completion actions
//!
//! The `action-done` attribute carries a semicolon-separated list of
//! `method[:args]` entries run against the action target after a request
//! completes. Arguments parse as a JSON array; when that fails the raw
//! text becomes a single string argument (intentional fallback, so
//! unquoted one-word arguments keep working). Dispatch goes through a
//! registered name → handler table; failures are logged and swallowed so
//! they can never stall the queue.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::element::ElementRef;

/// Errors from action dispatch; always logged, never propagated
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("unknown action: {0:?}")]
    Unknown(String),
}

/// One parsed action invocation
#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    pub name: String,
    pub args: Vec<Value>,
}

/// Parse an `action-done` attribute value
pub fn parse_actions(spec: &str) -> Vec<Action> {
    let mut actions = Vec::new();
    for entry in spec.split(';') {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }
        let (name, args) = match entry.split_once(':') {
            Some((name, raw)) => {
                let raw = raw.trim();
                let args = match serde_json::from_str::<Vec<Value>>(&format!("[{raw}]")) {
                    Ok(args) => args,
                    Err(_) => vec![Value::String(raw.to_string())],
                };
                (name.trim(), args)
            }
            None => (entry, Vec::new()),
        };
        actions.push(Action {
            name: name.to_string(),
            args,
        });
    }
    actions
}

type ActionFn = Arc<dyn Fn(&ElementRef, &[Value]) + Send + Sync>;

/// Name → handler table for declared post-actions
pub struct ActionRegistry {
    handlers: RwLock<HashMap<String, ActionFn>>,
}

impl ActionRegistry {
    /// Create a registry with the built-in `show`/`hide` actions
    pub fn new() -> Self {
        let registry = Self {
            handlers: RwLock::new(HashMap::new()),
        };
        registry.register("show", |target, _args| target.show());
        registry.register("hide", |target, _args| target.hide());
        registry
    }

    /// Register a handler under a name, replacing any existing one
    pub fn register<F>(&self, name: &str, handler: F)
    where
        F: Fn(&ElementRef, &[Value]) + Send + Sync + 'static,
    {
        self.handlers
            .write()
            .expect("action registry poisoned")
            .insert(name.to_string(), Arc::new(handler));
    }

    /// Run a declared action list against the target
    ///
    /// Unknown action names are logged and skipped.
    pub fn run(&self, target: &ElementRef, spec: &str) {
        for action in parse_actions(spec) {
            let handler = self
                .handlers
                .read()
                .expect("action registry poisoned")
                .get(&action.name)
                .cloned();
            match handler {
                Some(handler) => {
                    debug!(action = %action.name, args = ?action.args, "ActionRegistry::run: invoking");
                    handler(target, &action.args);
                }
                None => {
                    warn!(error = %ActionError::Unknown(action.name), "ActionRegistry::run: skipping");
                }
            }
        }
    }
}

impl Default for ActionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::MemoryElement;
    use serde_json::json;
    use std::sync::Mutex;

    #[test]
    fn test_parse_single_action_without_args() {
        assert_eq!(
            parse_actions("hide"),
            vec![Action {
                name: "hide".to_string(),
                args: vec![]
            }]
        );
    }

    #[test]
    fn test_parse_action_list_with_args() {
        let actions = parse_actions(r#"highlight: "warn", 3; hide"#);
        assert_eq!(actions.len(), 2);
        assert_eq!(actions[0].name, "highlight");
        assert_eq!(actions[0].args, vec![json!("warn"), json!(3)]);
        assert_eq!(actions[1].name, "hide");
    }

    #[test]
    fn test_parse_unquoted_args_fall_back_to_raw_string() {
        let actions = parse_actions("scrollTo:top of page");
        assert_eq!(actions[0].args, vec![json!("top of page")]);
    }

    #[test]
    fn test_builtin_hide_and_show() {
        let el = MemoryElement::new("div");
        let target = el.as_element();
        let registry = ActionRegistry::new();

        registry.run(&target, "hide");
        assert!(!el.is_visible());
        registry.run(&target, "show");
        assert!(el.is_visible());
    }

    #[test]
    fn test_unknown_action_is_swallowed() {
        let target = MemoryElement::new("div").as_element();
        let registry = ActionRegistry::new();
        // Must not panic or error out.
        registry.run(&target, "explode:now; hide");
    }

    #[test]
    fn test_registered_action_receives_args() {
        let seen: Arc<Mutex<Vec<Value>>> = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();

        let registry = ActionRegistry::new();
        registry.register("record", move |_target, args| {
            seen_clone.lock().unwrap().extend(args.iter().cloned());
        });

        let target = MemoryElement::new("div").as_element();
        registry.run(&target, "record:1, \"two\"");

        assert_eq!(*seen.lock().unwrap(), vec![json!(1), json!("two")]);
    }
}
