//! Option resolver
//!
//! Turns a trigger element's declarative attributes, the process-wide
//! defaults, and explicit caller overrides into one immutable
//! [`RequestConfig`]. Recognized keys go through an explicit key → parser
//! schema; everything else in the namespace lands in a pass-through bag
//! handed to the transport untouched.
//!
//! Merge precedence, lowest to highest: built-in defaults, seeded global
//! defaults, attribute-derived values, explicit overrides.

pub mod parse;

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::defaults::Defaults;
use crate::element::ElementRef;
use crate::render::{RenderError, RenderMethod};

use parse::{camelize, parse_poll_interval, parse_poll_repeats, strip_namespace};

/// Errors raised while resolving request configuration
///
/// These are fatal to the request being constructed and surface
/// synchronously to the caller; a request that fails resolution is never
/// queued.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("element {0:?} is not a valid async trigger (not a form or anchor, no autoload, no explicit url)")]
    InvalidTrigger(String),

    #[error("no request url for element {0:?}")]
    MissingUrl(String),

    #[error(transparent)]
    Render(#[from] RenderError),
}

/// Resolved, immutable request configuration
#[derive(Clone)]
pub struct RequestConfig {
    pub url: String,
    pub method: String,
    pub target: ElementRef,
    pub render_method: RenderMethod,
    pub process_indicators: Vec<ElementRef>,
    pub action_done: Option<String>,
    pub action_target: Option<ElementRef>,
    pub confirm: Option<String>,
    pub poll_interval: Option<Duration>,
    pub poll_max_repeats: Option<u32>,
    pub is_auto_load: bool,
    pub body: Option<String>,
    /// Attribute-derived keys not recognized above, passed through to the
    /// transport as-is
    pub extra: BTreeMap<String, Value>,
}

impl fmt::Debug for RequestConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestConfig")
            .field("url", &self.url)
            .field("method", &self.method)
            .field("target", &self.target.key())
            .field("render_method", &self.render_method)
            .field("process_indicators", &self.process_indicators.len())
            .field("action_done", &self.action_done)
            .field("confirm", &self.confirm)
            .field("poll_interval", &self.poll_interval)
            .field("poll_max_repeats", &self.poll_max_repeats)
            .field("is_auto_load", &self.is_auto_load)
            .field("body", &self.body)
            .field("extra", &self.extra)
            .finish()
    }
}

/// Explicit caller overrides, the highest precedence layer
#[derive(Clone, Default)]
pub struct RequestOverrides {
    pub url: Option<String>,
    pub method: Option<String>,
    pub target: Option<ElementRef>,
    pub render_method: Option<RenderMethod>,
    pub process_indicator: Option<String>,
    pub action_done: Option<String>,
    pub action_target: Option<String>,
    pub confirm: Option<String>,
    pub poll_interval: Option<Duration>,
    pub poll_max_repeats: Option<u32>,
    pub body: Option<String>,
    pub extra: BTreeMap<String, Value>,
}

/// Attribute-derived values before merging
#[derive(Default)]
struct Scanned {
    url: Option<String>,
    target: Option<String>,
    render_method: Option<RenderMethod>,
    process_indicator: Option<String>,
    action_done: Option<String>,
    action_target: Option<String>,
    poll: Option<Duration>,
    poll_repeats: Option<u32>,
    confirm: Option<String>,
    autoload: Option<String>,
    extra: BTreeMap<String, Value>,
}

fn scan(element: &ElementRef) -> Result<Scanned, ConfigError> {
    let mut scanned = Scanned::default();
    for (name, value) in element.attributes() {
        let Some(rest) = strip_namespace(&name) else {
            continue;
        };
        let key = camelize(rest);
        match key.as_str() {
            "url" => scanned.url = Some(value),
            "target" => scanned.target = Some(value),
            "renderMethod" => scanned.render_method = Some(RenderMethod::parse(&value)?),
            "processIndicator" => scanned.process_indicator = Some(value),
            "actionDone" => scanned.action_done = Some(value),
            "actionTarget" => scanned.action_target = Some(value),
            "poll" => scanned.poll = Some(parse_poll_interval(&value)),
            "pollRepeats" => scanned.poll_repeats = parse_poll_repeats(&value),
            "confirm" => scanned.confirm = Some(value),
            "autoload" => scanned.autoload = Some(value),
            _ => {
                scanned.extra.insert(key, Value::String(value));
            }
        }
    }
    Ok(scanned)
}

/// Resolve the busy indicator set
///
/// Order: the seeded default selector (document scope), then the
/// element-scoped selector (attribute value or `.async-indicator:first`),
/// then the first document-wide `.async-indicator` as a last resort.
fn resolve_indicators(
    element: &ElementRef,
    root: &ElementRef,
    selector: Option<&str>,
    default_selector: Option<&str>,
) -> Vec<ElementRef> {
    let mut indicators: Vec<ElementRef> = Vec::new();
    if let Some(sel) = default_selector {
        indicators.extend(root.find(sel));
    }
    let local = selector.unwrap_or(".async-indicator:first");
    for found in element.find(local) {
        if !indicators.iter().any(|i| i.key() == found.key()) {
            indicators.push(found);
        }
    }
    if indicators.is_empty() {
        indicators = root.find(".async-indicator:first");
    }
    indicators
}

/// Resolve one immutable request configuration
///
/// `root` is the document-scope element used for global selector lookups
/// (targets, indicators, action targets).
pub fn resolve(
    element: &ElementRef,
    defaults: &Defaults,
    overrides: &RequestOverrides,
    root: &ElementRef,
) -> Result<RequestConfig, ConfigError> {
    debug!(element = %element.key(), "options::resolve: called");
    let scanned = scan(element)?;
    let is_auto_load = scanned.autoload.is_some();

    // A context that can't trigger anything is rejected up front.
    if !is_auto_load && !element.is_form() && !element.is_anchor() && overrides.url.is_none() {
        return Err(ConfigError::InvalidTrigger(element.key()));
    }

    let url = overrides
        .url
        .clone()
        .or_else(|| element.attribute("href"))
        .or_else(|| element.attribute("action"))
        .or(scanned.url)
        .or(scanned.autoload)
        .ok_or_else(|| ConfigError::MissingUrl(element.key()))?;

    let method = overrides
        .method
        .clone()
        .or_else(|| {
            if element.is_form() {
                Some(element.attribute("method").unwrap_or_else(|| "get".to_string()))
            } else {
                None
            }
        })
        .unwrap_or_else(|| "get".to_string());

    // Verb tunneling: forms carry their method in a hidden field so a POST
    // transport can deliver DELETE/PUT semantics.
    let body = if element.is_form() {
        element.set_hidden_field("_method", &method.to_lowercase());
        element.serialize_form()
    } else {
        overrides.body.clone()
    };

    let target = overrides
        .target
        .clone()
        .or_else(|| {
            scanned
                .target
                .as_deref()
                .and_then(|sel| root.find(sel).into_iter().next())
        })
        .unwrap_or_else(|| element.clone());

    let render_method = overrides
        .render_method
        .or(scanned.render_method)
        .or(defaults.render_method)
        .unwrap_or_default();

    let indicator_selector = overrides
        .process_indicator
        .clone()
        .or(scanned.process_indicator);
    let process_indicators = resolve_indicators(
        element,
        root,
        indicator_selector.as_deref(),
        defaults.process_indicator.as_deref(),
    );

    let action_done = overrides
        .action_done
        .clone()
        .or(scanned.action_done)
        .or_else(|| defaults.action_done.clone());
    let action_target = overrides
        .action_target
        .clone()
        .or(scanned.action_target)
        .or_else(|| defaults.action_target.clone())
        .and_then(|sel| root.find(&sel).into_iter().next());

    let mut extra = scanned.extra;
    for (key, value) in &overrides.extra {
        extra.insert(key.clone(), value.clone());
    }

    let config = RequestConfig {
        url,
        method,
        target,
        render_method,
        process_indicators,
        action_done,
        action_target,
        confirm: overrides.confirm.clone().or(scanned.confirm),
        poll_interval: overrides.poll_interval.or(scanned.poll),
        poll_max_repeats: overrides
            .poll_max_repeats
            .or(scanned.poll_repeats)
            .or(defaults.poll_repeats),
        is_auto_load,
        body,
        extra,
    };
    debug!(?config, "options::resolve: resolved");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::MemoryElement;

    fn root() -> ElementRef {
        MemoryElement::new("body").as_element()
    }

    #[test]
    fn test_autoload_scenario() {
        let el = MemoryElement::new("div")
            .with_attr("async-autoload", "/x")
            .as_element();
        let config = resolve(&el, &Defaults::default(), &RequestOverrides::default(), &root()).unwrap();

        assert!(config.is_auto_load);
        assert_eq!(config.url, "/x");
        assert_eq!(config.render_method, RenderMethod::Replace);
        assert_eq!(config.target.key(), el.key());
    }

    #[test]
    fn test_invalid_trigger_rejected() {
        let el = MemoryElement::new("div").as_element();
        let err = resolve(&el, &Defaults::default(), &RequestOverrides::default(), &root());
        assert!(matches!(err, Err(ConfigError::InvalidTrigger(_))));
    }

    #[test]
    fn test_override_url_makes_plain_element_valid() {
        let el = MemoryElement::new("div").as_element();
        let overrides = RequestOverrides {
            url: Some("/api".to_string()),
            ..Default::default()
        };
        let config = resolve(&el, &Defaults::default(), &overrides, &root()).unwrap();
        assert_eq!(config.url, "/api");
    }

    #[test]
    fn test_precedence_overrides_beat_attributes_beat_defaults() {
        let mut defaults = Defaults::default();
        defaults.render_method = Some(RenderMethod::Prepend);

        let el = MemoryElement::new("a")
            .with_attr("href", "/page")
            .with_attr("async-render-method", "append")
            .as_element();

        // Attribute beats seeded default.
        let config = resolve(&el, &defaults, &RequestOverrides::default(), &root()).unwrap();
        assert_eq!(config.render_method, RenderMethod::Append);

        // Override beats attribute.
        let overrides = RequestOverrides {
            render_method: Some(RenderMethod::Replace),
            ..Default::default()
        };
        let config = resolve(&el, &defaults, &overrides, &root()).unwrap();
        assert_eq!(config.render_method, RenderMethod::Replace);
    }

    #[test]
    fn test_seeded_default_beats_builtin() {
        let mut defaults = Defaults::default();
        defaults.render_method = Some(RenderMethod::Prepend);
        let el = MemoryElement::new("a").with_attr("href", "/page").as_element();

        let config = resolve(&el, &defaults, &RequestOverrides::default(), &root()).unwrap();
        assert_eq!(config.render_method, RenderMethod::Prepend);
    }

    #[test]
    fn test_unknown_render_method_attribute_is_error() {
        let el = MemoryElement::new("a")
            .with_attr("href", "/page")
            .with_attr("async-render-method", "merge")
            .as_element();
        let err = resolve(&el, &Defaults::default(), &RequestOverrides::default(), &root());
        assert!(matches!(err, Err(ConfigError::Render(_))));
    }

    #[test]
    fn test_form_method_tunneling() {
        let form = MemoryElement::new("form")
            .with_attr("method", "delete")
            .with_attr("action", "/items/1")
            .with_field("name", "x");
        let el = form.as_element();

        let config = resolve(&el, &Defaults::default(), &RequestOverrides::default(), &root()).unwrap();
        assert_eq!(config.method, "delete");
        assert_eq!(config.url, "/items/1");
        let body = config.body.unwrap();
        assert!(body.contains("_method=delete"));
        assert!(body.contains("name=x"));
    }

    #[test]
    fn test_target_selector_with_fallback_to_element() {
        let root_el = MemoryElement::new("body");
        let results = MemoryElement::with_key("div", "results");
        root_el.adopt(&results);
        let root: ElementRef = root_el.as_element();

        let el = MemoryElement::new("a")
            .with_attr("href", "/page")
            .with_attr("async-target", "#results")
            .as_element();
        let config = resolve(&el, &Defaults::default(), &RequestOverrides::default(), &root).unwrap();
        assert_eq!(config.target.key(), "results");

        // Selector matching nothing falls back to the element itself.
        let el = MemoryElement::new("a")
            .with_attr("href", "/page")
            .with_attr("async-target", "#missing")
            .as_element();
        let config = resolve(&el, &Defaults::default(), &RequestOverrides::default(), &root).unwrap();
        assert_eq!(config.target.key(), el.key());
    }

    #[test]
    fn test_indicator_fallback_chain() {
        let root_el = MemoryElement::new("body");
        let global = MemoryElement::with_key("div", "global-spinner").with_attr("class", "async-indicator");
        root_el.adopt(&global);
        let root: ElementRef = root_el.as_element();

        // No local indicator: falls back to the document-wide class lookup.
        let el = MemoryElement::new("a").with_attr("href", "/page").as_element();
        let config = resolve(&el, &Defaults::default(), &RequestOverrides::default(), &root).unwrap();
        assert_eq!(config.process_indicators.len(), 1);
        assert_eq!(config.process_indicators[0].key(), "global-spinner");
    }

    #[test]
    fn test_unrecognized_keys_pass_through() {
        let el = MemoryElement::new("a")
            .with_attr("href", "/page")
            .with_attr("async-custom-thing", "42")
            .with_attr("data-async-other", "v")
            .as_element();
        let config = resolve(&el, &Defaults::default(), &RequestOverrides::default(), &root()).unwrap();

        assert_eq!(config.extra.get("customThing"), Some(&Value::String("42".to_string())));
        assert_eq!(config.extra.get("other"), Some(&Value::String("v".to_string())));
    }

    #[test]
    fn test_poll_attributes() {
        let el = MemoryElement::new("div")
            .with_attr("async-autoload", "/tick")
            .with_attr("async-poll", "2s")
            .with_attr("async-poll-repeats", "3")
            .as_element();
        let config = resolve(&el, &Defaults::default(), &RequestOverrides::default(), &root()).unwrap();

        assert_eq!(config.poll_interval, Some(Duration::from_millis(2000)));
        assert_eq!(config.poll_max_repeats, Some(3));
    }
}
