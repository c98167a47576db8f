//! In-memory element tree
//!
//! A reference [`Element`] implementation for headless hosts and tests.
//! It models the small subset of document behavior the engine relies on:
//! attributes, a flat content string, child elements for selector lookup,
//! visibility, and form field serialization.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use uuid::Uuid;

use super::{Element, ElementRef};

struct State {
    attributes: BTreeMap<String, String>,
    content: String,
    children: Vec<MemoryElement>,
    fields: Vec<(String, String)>,
    visible: bool,
    attached: bool,
}

struct Inner {
    key: String,
    tag: String,
    state: Mutex<State>,
}

/// Element backed by in-process state, cloneable and shared
#[derive(Clone)]
pub struct MemoryElement {
    inner: Arc<Inner>,
}

impl MemoryElement {
    /// Create an element with a generated key
    pub fn new(tag: &str) -> Self {
        Self::with_key(tag, &Uuid::now_v7().to_string())
    }

    /// Create an element with an explicit key
    pub fn with_key(tag: &str, key: &str) -> Self {
        Self {
            inner: Arc::new(Inner {
                key: key.to_string(),
                tag: tag.to_lowercase(),
                state: Mutex::new(State {
                    attributes: BTreeMap::new(),
                    content: String::new(),
                    children: Vec::new(),
                    fields: Vec::new(),
                    visible: true,
                    attached: true,
                }),
            }),
        }
    }

    /// Builder: set an attribute
    pub fn with_attr(self, name: &str, value: &str) -> Self {
        self.set_attribute(name, value);
        self
    }

    /// Builder: add a form field
    pub fn with_field(self, name: &str, value: &str) -> Self {
        self.lock().fields.push((name.to_string(), value.to_string()));
        self
    }

    /// Attach a child element
    pub fn adopt(&self, child: &MemoryElement) {
        self.lock().children.push(child.clone());
    }

    /// Detach this element from the document
    pub fn detach(&self) {
        self.lock().attached = false;
    }

    /// Current visibility (driven by `show`/`hide`)
    pub fn is_visible(&self) -> bool {
        self.lock().visible
    }

    /// Wrap as a shared trait object
    pub fn as_element(&self) -> ElementRef {
        Arc::new(self.clone())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.inner.state.lock().expect("element state poisoned")
    }

    fn matches(&self, selector: &str) -> bool {
        let selector = selector.trim();
        if let Some(id) = selector.strip_prefix('#') {
            return self.inner.key == id;
        }
        if let Some(class) = selector.strip_prefix('.') {
            return self
                .attribute("class")
                .map(|c| c.split_whitespace().any(|part| part == class))
                .unwrap_or(false);
        }
        if let Some(body) = selector.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
            return match body.split_once('=') {
                Some((name, value)) => {
                    let value = value.trim().trim_matches(|c| c == '"' || c == '\'');
                    self.attribute(name.trim()).as_deref() == Some(value)
                }
                None => self.attribute(body.trim()).is_some(),
            };
        }
        self.inner.tag == selector
    }

    fn collect_matches(&self, selector: &str, out: &mut Vec<MemoryElement>) {
        let children: Vec<MemoryElement> = self.lock().children.clone();
        for child in children {
            if child.matches(selector) {
                out.push(child.clone());
            }
            child.collect_matches(selector, out);
        }
    }
}

impl Element for MemoryElement {
    fn key(&self) -> String {
        self.inner.key.clone()
    }

    fn tag(&self) -> String {
        self.inner.tag.clone()
    }

    fn attribute(&self, name: &str) -> Option<String> {
        self.lock().attributes.get(name).cloned()
    }

    fn set_attribute(&self, name: &str, value: &str) {
        self.lock().attributes.insert(name.to_string(), value.to_string());
    }

    fn attributes(&self) -> Vec<(String, String)> {
        self.lock()
            .attributes
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    fn find(&self, selector: &str) -> Vec<ElementRef> {
        let mut found: Vec<MemoryElement> = Vec::new();
        for part in selector.split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            let (sel, first_only) = match part.strip_suffix(":first") {
                Some(stripped) => (stripped, true),
                None => (part, false),
            };
            let mut matches = Vec::new();
            self.collect_matches(sel, &mut matches);
            if first_only {
                matches.truncate(1);
            }
            for m in matches {
                if !found.iter().any(|f| f.inner.key == m.inner.key) {
                    found.push(m);
                }
            }
        }
        found.into_iter().map(|e| e.as_element()).collect()
    }

    fn content(&self) -> String {
        self.lock().content.clone()
    }

    fn append(&self, content: &str) {
        self.lock().content.push_str(content);
    }

    fn prepend(&self, content: &str) {
        let mut state = self.lock();
        state.content.insert_str(0, content);
    }

    fn replace(&self, content: &str) {
        self.lock().content = content.to_string();
    }

    fn show(&self) {
        self.lock().visible = true;
    }

    fn hide(&self) {
        self.lock().visible = false;
    }

    fn is_attached(&self) -> bool {
        self.lock().attached
    }

    fn serialize_form(&self) -> Option<String> {
        if !self.is_form() {
            return None;
        }
        let state = self.lock();
        let pairs: Vec<String> = state
            .fields
            .iter()
            .map(|(name, value)| format!("{}={}", form_encode(name), form_encode(value)))
            .collect();
        Some(pairs.join("&"))
    }

    fn set_hidden_field(&self, name: &str, value: &str) {
        let mut state = self.lock();
        match state.fields.iter_mut().find(|(n, _)| n == name) {
            Some((_, v)) => *v = value.to_string(),
            None => state.fields.insert(0, (name.to_string(), value.to_string())),
        }
    }
}

/// Percent-encode a form field component (space becomes `+`)
fn form_encode(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            b' ' => out.push('+'),
            other => out.push_str(&format!("%{:02X}", other)),
        }
    }
    out
}
